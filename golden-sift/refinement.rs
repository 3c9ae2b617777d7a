use std::cmp::Ordering;

use golden_core::{Descriptor, Keypoint};

use crate::extrema::IMAGE_BORDER;
use crate::pyramid::Octave;
use crate::types::{Plane, RefinedPoint, ScaleSpaceExtremum};

const MAX_INTERP_STEPS: usize = 5;
const ORI_HIST_BINS: usize = 36;
const ORI_SIG_FCTR: f32 = 1.5;
const ORI_RADIUS: f32 = 3.0 * ORI_SIG_FCTR;
const ORI_PEAK_RATIO: f32 = 0.8;

/// Subpixel refinement, orientation assignment and keypoint filtering
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Interpolate an extremum's location in space and scale.
    ///
    /// Fits a quadratic to the DoG stack around the candidate and moves to
    /// the neighbouring sample whenever the offset exceeds half a pixel, for
    /// at most five steps. Low-contrast points and points lying on edges
    /// (principal curvature ratio above `edge_threshold`) are rejected.
    pub fn refine_extremum(
        octave: &Octave,
        extremum: ScaleSpaceExtremum,
        layers: usize,
        contrast_threshold: f32,
        edge_threshold: f32,
    ) -> Option<RefinedPoint> {
        let (width, height) = octave.dimensions();
        let border = IMAGE_BORDER as isize;
        let mut layer = extremum.layer as isize;
        let mut x = extremum.x as isize;
        let mut y = extremum.y as isize;
        let mut offset = [0.0f32; 3];
        let mut converged = false;

        for _ in 0..MAX_INTERP_STEPS {
            let (prev, cur, next) = Self::dog_triplet(octave, layer as usize);
            let gradient = Self::gradient(prev, cur, next, x, y);
            let hessian = Self::hessian(prev, cur, next, x, y);
            let solved = Self::solve_3x3(hessian, gradient)?;
            offset = [-solved[0], -solved[1], -solved[2]];

            if offset.iter().all(|o| o.abs() < 0.5) {
                converged = true;
                break;
            }
            if offset.iter().any(|o| o.abs() > (i32::MAX / 3) as f32) {
                return None;
            }

            x += offset[0].round() as isize;
            y += offset[1].round() as isize;
            layer += offset[2].round() as isize;

            if layer < 1
                || layer > layers as isize
                || x < border
                || x >= width as isize - border
                || y < border
                || y >= height as isize - border
            {
                return None;
            }
        }

        if !converged {
            return None;
        }

        let (prev, cur, next) = Self::dog_triplet(octave, layer as usize);
        let gradient = Self::gradient(prev, cur, next, x, y);
        let dot = gradient[0] * offset[0] + gradient[1] * offset[1] + gradient[2] * offset[2];
        let contrast = cur.at_i(x, y) + 0.5 * dot;
        if contrast.abs() * (layers as f32) < contrast_threshold {
            return None;
        }

        // Edge responses have one large and one small principal curvature
        let hessian = Self::hessian(prev, cur, next, x, y);
        let (dxx, dyy, dxy) = (hessian[0][0], hessian[1][1], hessian[0][1]);
        let trace = dxx + dyy;
        let det = dxx * dyy - dxy * dxy;
        if det <= 0.0 || trace * trace * edge_threshold >= (edge_threshold + 1.0).powi(2) * det {
            return None;
        }

        Some(RefinedPoint {
            layer: layer as usize,
            x: x as usize,
            y: y as usize,
            offset,
            contrast,
        })
    }

    fn dog_triplet(octave: &Octave, layer: usize) -> (&Plane, &Plane, &Plane) {
        (&octave.dogs[layer - 1], &octave.dogs[layer], &octave.dogs[layer + 1])
    }

    /// Central-difference gradient `(dD/dx, dD/dy, dD/dσ)`
    fn gradient(prev: &Plane, cur: &Plane, next: &Plane, x: isize, y: isize) -> [f32; 3] {
        [
            (cur.at_i(x + 1, y) - cur.at_i(x - 1, y)) * 0.5,
            (cur.at_i(x, y + 1) - cur.at_i(x, y - 1)) * 0.5,
            (next.at_i(x, y) - prev.at_i(x, y)) * 0.5,
        ]
    }

    /// 3x3 Hessian of the DoG function in `(x, y, σ)`
    fn hessian(prev: &Plane, cur: &Plane, next: &Plane, x: isize, y: isize) -> [[f32; 3]; 3] {
        let v2 = cur.at_i(x, y) * 2.0;
        let dxx = cur.at_i(x + 1, y) + cur.at_i(x - 1, y) - v2;
        let dyy = cur.at_i(x, y + 1) + cur.at_i(x, y - 1) - v2;
        let dss = next.at_i(x, y) + prev.at_i(x, y) - v2;
        let dxy = (cur.at_i(x + 1, y + 1) - cur.at_i(x - 1, y + 1) - cur.at_i(x + 1, y - 1)
            + cur.at_i(x - 1, y - 1))
            * 0.25;
        let dxs = (next.at_i(x + 1, y) - next.at_i(x - 1, y) - prev.at_i(x + 1, y) + prev.at_i(x - 1, y)) * 0.25;
        let dys = (next.at_i(x, y + 1) - next.at_i(x, y - 1) - prev.at_i(x, y + 1) + prev.at_i(x, y - 1)) * 0.25;

        [[dxx, dxy, dxs], [dxy, dyy, dys], [dxs, dys, dss]]
    }

    /// Solve `m · v = b` by Cramer's rule; `None` for singular systems
    fn solve_3x3(m: [[f32; 3]; 3], b: [f32; 3]) -> Option<[f32; 3]> {
        let m = m.map(|row| row.map(f64::from));
        let b = b.map(f64::from);
        let det3 = |a: &[[f64; 3]; 3]| {
            a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1]) - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
                + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0])
        };

        let det = det3(&m);
        if !det.is_finite() || det.abs() < 1e-18 {
            return None;
        }

        let mut solution = [0.0f32; 3];
        for (col, out) in solution.iter_mut().enumerate() {
            let mut replaced = m;
            for row in 0..3 {
                replaced[row][col] = b[row];
            }
            *out = (det3(&replaced) / det) as f32;
        }

        solution.iter().all(|v| v.is_finite()).then_some(solution)
    }

    /// Dominant gradient orientations around `(x, y)` in degrees, `[0, 360)`.
    ///
    /// Builds a 36-bin histogram weighted by a Gaussian of `1.5 × scale`,
    /// smooths it, and returns one angle per local peak within 80 % of the
    /// highest bin, interpolated with a parabola.
    pub fn orientation_peaks(img: &Plane, x: usize, y: usize, scale: f32) -> Vec<f32> {
        let radius = (ORI_RADIUS * scale).round() as isize;
        let sigma = ORI_SIG_FCTR * scale;
        let exp_factor = -1.0 / (2.0 * sigma * sigma);
        let (w, h) = (img.width as isize, img.height as isize);
        let (cx, cy) = (x as isize, y as isize);

        let mut raw = [0.0f32; ORI_HIST_BINS];
        for i in -radius..=radius {
            let yy = cy + i;
            if yy <= 0 || yy >= h - 1 {
                continue;
            }
            for j in -radius..=radius {
                let xx = cx + j;
                if xx <= 0 || xx >= w - 1 {
                    continue;
                }

                let dx = img.at_i(xx + 1, yy) - img.at_i(xx - 1, yy);
                let dy = img.at_i(xx, yy - 1) - img.at_i(xx, yy + 1);
                let weight = ((i * i + j * j) as f32 * exp_factor).exp();
                let magnitude = (dx * dx + dy * dy).sqrt();
                let mut ori = dy.atan2(dx).to_degrees();
                if ori < 0.0 {
                    ori += 360.0;
                }

                let mut bin = (ori * ORI_HIST_BINS as f32 / 360.0).round() as isize;
                if bin >= ORI_HIST_BINS as isize {
                    bin -= ORI_HIST_BINS as isize;
                }
                if bin < 0 {
                    bin += ORI_HIST_BINS as isize;
                }
                raw[bin as usize] += weight * magnitude;
            }
        }

        let n = ORI_HIST_BINS;
        let mut hist = [0.0f32; ORI_HIST_BINS];
        for i in 0..n {
            hist[i] = (raw[(i + n - 2) % n] + raw[(i + 2) % n]) * (1.0 / 16.0)
                + (raw[(i + n - 1) % n] + raw[(i + 1) % n]) * (4.0 / 16.0)
                + raw[i] * (6.0 / 16.0);
        }

        let max = hist.iter().copied().fold(0.0f32, f32::max);
        let threshold = max * ORI_PEAK_RATIO;
        let mut angles = Vec::new();

        for j in 0..n {
            let l = (j + n - 1) % n;
            let r = (j + 1) % n;
            if hist[j] > hist[l] && hist[j] > hist[r] && hist[j] >= threshold {
                let mut bin = j as f32 + 0.5 * (hist[l] - hist[r]) / (hist[l] - 2.0 * hist[j] + hist[r]);
                if bin < 0.0 {
                    bin += n as f32;
                } else if bin >= n as f32 {
                    bin -= n as f32;
                }
                let mut angle = 360.0 - bin * (360.0 / n as f32);
                if (angle - 360.0).abs() < f32::EPSILON * 360.0 || angle >= 360.0 {
                    angle = 0.0;
                }
                angles.push(angle);
            }
        }

        angles
    }

    /// Drop features whose keypoint exactly repeats an earlier one, keeping first occurrences
    pub fn remove_duplicates(features: Vec<(Keypoint, Descriptor)>) -> Vec<(Keypoint, Descriptor)> {
        if features.len() < 2 {
            return features;
        }

        let key = |kp: &Keypoint| [kp.x, kp.y, kp.size, kp.angle];
        let mut order: Vec<usize> = (0..features.len()).collect();
        order.sort_by(|&a, &b| {
            let (ka, kb) = (key(&features[a].0), key(&features[b].0));
            ka.iter()
                .zip(kb.iter())
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut keep = vec![true; features.len()];
        for pair in order.windows(2) {
            if key(&features[pair[0]].0) == key(&features[pair[1]].0) {
                keep[pair[1]] = false;
            }
        }

        features
            .into_iter()
            .zip(keep)
            .filter_map(|(feature, kept)| kept.then_some(feature))
            .collect()
    }

    /// Keep the `max_features` strongest responses, preserving extraction order
    pub fn retain_best(features: Vec<(Keypoint, Descriptor)>, max_features: usize) -> Vec<(Keypoint, Descriptor)> {
        if max_features == 0 || features.len() <= max_features {
            return features;
        }

        let mut order: Vec<usize> = (0..features.len()).collect();
        order.sort_by(|&a, &b| features[b].0.response.total_cmp(&features[a].0.response));
        let mut keep = vec![false; features.len()];
        for &i in &order[..max_features] {
            keep[i] = true;
        }

        features
            .into_iter()
            .zip(keep)
            .filter_map(|(feature, kept)| kept.then_some(feature))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use golden_core::DESCRIPTOR_LEN;

    fn blob_octave(size: usize, cx: f32, cy: f32) -> Octave {
        // Synthetic DoG stack: isotropic Gaussian peak strongest in layer 2
        let dogs = (0..5)
            .map(|layer| {
                let amp = match layer {
                    2 => 0.1,
                    1 | 3 => 0.06,
                    _ => 0.02,
                };
                let mut plane = Plane::new(size, size);
                for y in 0..size {
                    for x in 0..size {
                        let d2 = (x as f32 - cx).powi(2) + (y as f32 - cy).powi(2);
                        plane.data[y * size + x] = amp * (-d2 / 8.0).exp();
                    }
                }
                plane
            })
            .collect();
        Octave {
            index: 0,
            gaussians: vec![Plane::new(size, size); 6],
            dogs,
        }
    }

    fn feature(x: f32, y: f32, response: f32) -> (Keypoint, Descriptor) {
        (
            Keypoint { x, y, size: 2.0, angle: 0.0, response, octave: 0 },
            [0.0; DESCRIPTOR_LEN],
        )
    }

    #[test]
    fn test_refine_moves_towards_subpixel_peak() {
        let octave = blob_octave(32, 16.3, 15.8);
        let ext = ScaleSpaceExtremum { layer: 2, x: 16, y: 16 };
        let refined = KeypointRefinement::refine_extremum(&octave, ext, 3, 0.04, 10.0).unwrap();

        assert_eq!((refined.x, refined.y, refined.layer), (16, 16, 2));
        assert!(refined.offset[0] > 0.1 && refined.offset[0] < 0.5, "dx {}", refined.offset[0]);
        assert!(refined.offset[1] < -0.05 && refined.offset[1] > -0.5, "dy {}", refined.offset[1]);
        assert!(refined.contrast > 0.09);
    }

    #[test]
    fn test_refine_rejects_low_contrast() {
        let octave = blob_octave(32, 16.0, 16.0);
        let ext = ScaleSpaceExtremum { layer: 2, x: 16, y: 16 };
        assert!(KeypointRefinement::refine_extremum(&octave, ext, 3, 1.0, 10.0).is_none());
    }

    #[test]
    fn test_refine_rejects_edges() {
        // Ridge along y: no curvature in one direction
        let size = 32;
        let dogs = (0..5)
            .map(|layer| {
                let amp = if layer == 2 { 0.1 } else { 0.05 };
                let mut plane = Plane::new(size, size);
                for y in 0..size {
                    for x in 0..size {
                        let d2 = (x as f32 - 16.0).powi(2);
                        plane.data[y * size + x] = amp * (-d2 / 8.0).exp() * (1.0 - 0.001 * (y as f32 - 16.0).powi(2));
                    }
                }
                plane
            })
            .collect();
        let octave = Octave { index: 0, gaussians: vec![Plane::new(size, size); 6], dogs };
        let ext = ScaleSpaceExtremum { layer: 2, x: 16, y: 16 };
        assert!(KeypointRefinement::refine_extremum(&octave, ext, 3, 0.04, 10.0).is_none());
    }

    #[test]
    fn test_singular_system_rejected() {
        let octave = Octave {
            index: 0,
            gaussians: vec![Plane::new(32, 32); 6],
            dogs: vec![Plane::new(32, 32); 5],
        };
        let ext = ScaleSpaceExtremum { layer: 2, x: 16, y: 16 };
        assert!(KeypointRefinement::refine_extremum(&octave, ext, 3, 0.04, 10.0).is_none());
    }

    #[test]
    fn test_orientation_of_horizontal_ramp() {
        // Intensity grows with x: gradients point along +x, angle 0
        let mut img = Plane::new(41, 41);
        for y in 0..41 {
            for x in 0..41 {
                img.data[y * 41 + x] = x as f32 / 40.0;
            }
        }
        let angles = KeypointRefinement::orientation_peaks(&img, 20, 20, 2.0);
        assert_eq!(angles.len(), 1);
        let a = angles[0];
        assert!(a < 1.0 || a > 359.0, "angle {}", a);
    }

    #[test]
    fn test_orientation_of_vertical_ramp() {
        // Intensity grows downwards: dy (up minus down) is negative, histogram peak at 270
        let mut img = Plane::new(41, 41);
        for y in 0..41 {
            for x in 0..41 {
                img.data[y * 41 + x] = y as f32 / 40.0;
            }
        }
        let angles = KeypointRefinement::orientation_peaks(&img, 20, 20, 2.0);
        assert_eq!(angles.len(), 1);
        assert!((angles[0] - 90.0).abs() < 1.0, "angle {}", angles[0]);
    }

    #[test]
    fn test_flat_patch_has_no_orientation() {
        let img = Plane::new(21, 21);
        assert!(KeypointRefinement::orientation_peaks(&img, 10, 10, 1.6).is_empty());
    }

    #[test]
    fn test_remove_duplicates_keeps_first() {
        let features = vec![feature(1.0, 1.0, 0.1), feature(2.0, 2.0, 0.2), feature(1.0, 1.0, 0.3)];
        let kept = KeypointRefinement::remove_duplicates(features);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].0.response, 0.1);
        assert_eq!(kept[1].0.x, 2.0);
    }

    #[test]
    fn test_retain_best_preserves_order() {
        let features = vec![
            feature(0.0, 0.0, 0.1),
            feature(1.0, 0.0, 0.5),
            feature(2.0, 0.0, 0.3),
            feature(3.0, 0.0, 0.4),
        ];
        let kept = KeypointRefinement::retain_best(features, 2);
        let xs: Vec<f32> = kept.iter().map(|(kp, _)| kp.x).collect();
        assert_eq!(xs, vec![1.0, 3.0]);
    }
}
