use golden_core::Image;
use rayon::prelude::*;

use crate::pyramid::ImagePyramid;
use crate::types::Plane;

/// Blur assumed to be present in the captured image
const INPUT_BLUR: f32 = 0.5;

/// Image preprocessing (normalisation, upscaling, Gaussian smoothing)
pub struct ImagePreprocessing;

impl ImagePreprocessing {
    /// Build the base image of the scale space.
    ///
    /// The input is normalised to `[0, 1]`, optionally doubled in size, then
    /// blurred so that its total blur equals `sigma`.
    pub fn base_image(img: &Image, sigma: f32, upscale: bool) -> Plane {
        let plane = Plane::from_image(img);
        let (plane, present) = if upscale {
            (ImagePyramid::upsample_2x(&plane), INPUT_BLUR * 2.0)
        } else {
            (plane, INPUT_BLUR)
        };

        let sig_diff = (sigma * sigma - present * present).max(0.01).sqrt();
        Self::gaussian_blur(&plane, sig_diff)
    }

    /// Normalised 1-D Gaussian kernel with radius `round(4σ)`
    pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
        let radius = (sigma * 4.0).round().max(1.0) as isize;
        let denom = -0.5 / (sigma * sigma);
        let mut kernel: Vec<f32> = (-radius..=radius)
            .map(|i| ((i * i) as f32 * denom).exp())
            .collect();
        let sum: f32 = kernel.iter().sum();
        for k in kernel.iter_mut() {
            *k /= sum;
        }
        kernel
    }

    /// Separable Gaussian blur with replicated borders
    pub fn gaussian_blur(src: &Plane, sigma: f32) -> Plane {
        if sigma <= 0.0 || src.data.is_empty() {
            return src.clone();
        }

        let kernel = Self::gaussian_kernel(sigma);
        let radius = (kernel.len() / 2) as isize;
        let (w, h) = (src.width, src.height);
        let max_x = w as isize - 1;
        let max_y = h as isize - 1;

        // Horizontal pass
        let mut tmp = Plane::new(w, h);
        tmp.data
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, row)| {
                let src_row = src.row(y);
                for (x, out) in row.iter_mut().enumerate() {
                    let mut acc = 0.0f32;
                    for (k, &weight) in kernel.iter().enumerate() {
                        let sx = (x as isize + k as isize - radius).clamp(0, max_x) as usize;
                        acc += src_row[sx] * weight;
                    }
                    *out = acc;
                }
            });

        // Vertical pass
        let mut dst = Plane::new(w, h);
        dst.data
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, row)| {
                for (k, &weight) in kernel.iter().enumerate() {
                    let sy = (y as isize + k as isize - radius).clamp(0, max_y) as usize;
                    let src_row = tmp.row(sy);
                    for (out, &v) in row.iter_mut().zip(src_row) {
                        *out += v * weight;
                    }
                }
            });

        dst
    }
}
