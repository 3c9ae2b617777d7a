use golden_core::Image;

/// Single-channel `f32` working image, intensities nominally in `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Plane {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Convert an 8-bit image, honouring its stride
    pub fn from_image(img: &Image) -> Self {
        let (width, height) = img.dimensions();
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            data.extend(img.row(y).iter().map(|&v| v as f32 / 255.0));
        }
        Self { width, height, data }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Signed-coordinate access for neighbourhood arithmetic; caller keeps it in bounds
    #[inline]
    pub fn at_i(&self, x: isize, y: isize) -> f32 {
        self.data[y as usize * self.width + x as usize]
    }

    pub fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Pixel-wise `self - other`; planes must share dimensions
    pub fn difference(&self, other: &Plane) -> Plane {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        Plane {
            width: self.width,
            height: self.height,
            data: self.data.iter().zip(&other.data).map(|(a, b)| a - b).collect(),
        }
    }
}

/// Scale-space local extremum before refinement (octave-local coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleSpaceExtremum {
    pub layer: usize,
    pub x: usize,
    pub y: usize,
}

/// Extremum after sub-pixel and sub-scale interpolation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinedPoint {
    pub layer: usize,
    pub x: usize,
    pub y: usize,
    /// Interpolated offset `(dx, dy, dlayer)`, each component below 0.5
    pub offset: [f32; 3],
    /// Interpolated DoG value at the refined location
    pub contrast: f32,
}
