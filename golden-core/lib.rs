//! Shared types for golden-image comparison: grayscale images, keypoints,
//! descriptors, matching configuration and the final match record.

mod config;
mod error;
mod result;

pub use config::{MatchConfig, SearchAlgorithm, SearchParams};
pub use error::{CoreError, CoreResult};
pub use result::{MatchResult, Verdict};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major 8-bit grayscale image with an explicit row stride
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<u8>,
}

impl Image {
    /// Wrap a tightly packed buffer (`stride == width`)
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> CoreResult<Self> {
        Self::from_strided(width, height, width, data)
    }

    /// Wrap a buffer whose rows are `stride` bytes apart.
    ///
    /// Padding bytes at the end of each row are never read. A zero-sized
    /// image is accepted here; extraction rejects it.
    pub fn from_strided(width: usize, height: usize, stride: usize, data: Vec<u8>) -> CoreResult<Self> {
        if stride < width {
            return Err(CoreError::InvalidImage {
                width,
                height,
                stride,
                len: data.len(),
                reason: "stride is smaller than width",
            });
        }

        let required = if width == 0 || height == 0 {
            0
        } else {
            stride * (height - 1) + width
        };
        if data.len() < required {
            return Err(CoreError::InvalidImage {
                width,
                height,
                stride,
                len: data.len(),
                reason: "buffer too short for dimensions",
            });
        }

        Ok(Self { width, height, stride, data })
    }

    /// Uniform image, mostly useful for tests and padding
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            stride: width,
            data: vec![value; width * height],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, stride: width, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Fails with `InvalidImage` when either dimension is zero
    pub fn ensure_non_empty(&self) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::InvalidImage {
                width: self.width,
                height: self.height,
                stride: self.stride,
                len: self.data.len(),
                reason: "image has no pixels",
            });
        }
        Ok(())
    }

    /// Pixel at `(x, y)`; panics when out of bounds
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.stride + x]
    }

    /// Row `y` without stride padding
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    /// Copy into a tightly packed buffer
    pub fn to_packed(&self) -> Vec<u8> {
        if self.stride == self.width {
            return self.data[..self.width * self.height].to_vec();
        }
        (0..self.height).flat_map(|y| self.row(y).iter().copied()).collect()
    }
}

/// Scale-space keypoint with subpixel location
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Diameter of the described neighbourhood in input pixels
    pub size: f32,
    /// Dominant gradient orientation in radians, `[0, 2π)`
    pub angle: f32,
    pub response: f32,
    pub octave: i32,
}

/// Length of a gradient-histogram descriptor (4x4 cells, 8 bins each)
pub const DESCRIPTOR_LEN: usize = 128;

/// Gradient-histogram descriptor, components in `0.0..=255.0`
pub type Descriptor = [f32; DESCRIPTOR_LEN];

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
