use crate::preprocessing::ImagePreprocessing;
use crate::types::Plane;

/// Octaves narrower or shorter than this are not built
pub const MIN_OCTAVE_SIZE: usize = 8;

/// Gaussian and difference-of-Gaussian images of one octave
#[derive(Debug, Clone)]
pub struct Octave {
    pub index: usize,
    /// `layers + 3` progressively blurred images
    pub gaussians: Vec<Plane>,
    /// `layers + 2` differences of adjacent Gaussians
    pub dogs: Vec<Plane>,
}

impl Octave {
    pub fn dimensions(&self) -> (usize, usize) {
        let base = &self.gaussians[0];
        (base.width, base.height)
    }
}

/// Gaussian scale space for multi-scale feature detection
pub struct ImagePyramid;

impl ImagePyramid {
    /// Number of octaves for a base image: `round(log2(min(w, h))) - 2`, at least one
    pub fn octave_count(width: usize, height: usize) -> usize {
        let min_dim = width.min(height).max(1) as f32;
        (min_dim.log2().round() as i32 - 2).max(1) as usize
    }

    /// Incremental blur applied to reach each layer from the previous one
    pub fn layer_sigmas(sigma: f32, layers: usize) -> Vec<f32> {
        let k = 2f32.powf(1.0 / layers as f32);
        let mut sigmas = Vec::with_capacity(layers + 3);
        sigmas.push(sigma);
        for i in 1..layers + 3 {
            let prev = k.powi(i as i32 - 1) * sigma;
            let total = prev * k;
            sigmas.push((total * total - prev * prev).sqrt());
        }
        sigmas
    }

    /// Build the scale space from an already blurred base image
    pub fn build(base: Plane, layers: usize, sigma: f32) -> Vec<Octave> {
        let n_octaves = Self::octave_count(base.width, base.height);
        let sigmas = Self::layer_sigmas(sigma, layers);
        let mut octaves: Vec<Octave> = Vec::with_capacity(n_octaves);

        for index in 0..n_octaves {
            let first = match octaves.last() {
                None => base.clone(),
                Some(prev) => {
                    let next = Self::downsample_2x(&prev.gaussians[layers]);
                    if next.width < MIN_OCTAVE_SIZE || next.height < MIN_OCTAVE_SIZE {
                        break;
                    }
                    next
                }
            };

            let mut gaussians = Vec::with_capacity(layers + 3);
            gaussians.push(first);
            for &s in &sigmas[1..] {
                let blurred = ImagePreprocessing::gaussian_blur(&gaussians[gaussians.len() - 1], s);
                gaussians.push(blurred);
            }

            let dogs = gaussians
                .windows(2)
                .map(|pair| pair[1].difference(&pair[0]))
                .collect();

            octaves.push(Octave { index, gaussians, dogs });
        }

        octaves
    }

    /// Keep every second pixel in both directions
    pub fn downsample_2x(src: &Plane) -> Plane {
        let width = src.width / 2;
        let height = src.height / 2;
        let mut dst = Plane::new(width, height);
        for y in 0..height {
            for x in 0..width {
                dst.data[y * width + x] = src.at(x * 2, y * 2);
            }
        }
        dst
    }

    /// Double both dimensions using bilinear interpolation
    pub fn upsample_2x(src: &Plane) -> Plane {
        let width = src.width * 2;
        let height = src.height * 2;
        let mut dst = Plane::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let value = Self::bilinear_sample(src, x as f32 * 0.5, y as f32 * 0.5);
                dst.data[y * width + x] = value;
            }
        }
        dst
    }

    /// Sample image at fractional coordinates using bilinear interpolation
    fn bilinear_sample(img: &Plane, x: f32, y: f32) -> f32 {
        let x1 = x.floor() as usize;
        let y1 = y.floor() as usize;
        let x2 = (x1 + 1).min(img.width - 1);
        let y2 = (y1 + 1).min(img.height - 1);

        let fx = x - x1 as f32;
        let fy = y - y1 as f32;

        let p11 = img.at(x1, y1);
        let p12 = img.at(x2, y1);
        let p21 = img.at(x1, y2);
        let p22 = img.at(x2, y2);

        let interpolated_top = p11 * (1.0 - fx) + p12 * fx;
        let interpolated_bottom = p21 * (1.0 - fx) + p22 * fx;

        interpolated_top * (1.0 - fy) + interpolated_bottom * fy
    }
}
