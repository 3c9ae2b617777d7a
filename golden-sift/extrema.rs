use rayon::prelude::*;

use crate::pyramid::Octave;
use crate::types::{Plane, ScaleSpaceExtremum};

/// Pixels this close to the octave border are never keypoints
pub const IMAGE_BORDER: usize = 5;

/// Scale-space extremum detection over difference-of-Gaussian images
pub struct ExtremaDetector;

impl ExtremaDetector {
    /// Find local extrema of the DoG stack in one octave.
    ///
    /// Only layers `1..=layers` are searched so that every candidate has a
    /// DoG image above and below it. Candidates must exceed `threshold` in
    /// absolute value. Rows are scanned in parallel; output order is layer,
    /// then row, then column.
    pub fn detect(octave: &Octave, layers: usize, threshold: f32) -> Vec<ScaleSpaceExtremum> {
        let (width, height) = octave.dimensions();
        if width <= 2 * IMAGE_BORDER || height <= 2 * IMAGE_BORDER {
            return Vec::new();
        }

        (1..=layers)
            .flat_map(|layer| {
                let prev = &octave.dogs[layer - 1];
                let cur = &octave.dogs[layer];
                let next = &octave.dogs[layer + 1];

                (IMAGE_BORDER..height - IMAGE_BORDER)
                    .into_par_iter()
                    .flat_map_iter(|y| {
                        let mut row_extrema = Vec::new();
                        for x in IMAGE_BORDER..width - IMAGE_BORDER {
                            let val = cur.at(x, y);
                            if val.abs() > threshold && Self::is_extremum(prev, cur, next, x, y, val) {
                                row_extrema.push(ScaleSpaceExtremum { layer, x, y });
                            }
                        }
                        row_extrema
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// True when `val` is a maximum (positive) or minimum (negative) over its 26 neighbours
    fn is_extremum(prev: &Plane, cur: &Plane, next: &Plane, x: usize, y: usize, val: f32) -> bool {
        for plane in [prev, cur, next] {
            for yy in y - 1..=y + 1 {
                for xx in x - 1..=x + 1 {
                    let other = plane.at(xx, yy);
                    if val > 0.0 {
                        if other > val {
                            return false;
                        }
                    } else if other < val {
                        return false;
                    }
                }
            }
        }
        true
    }
}
