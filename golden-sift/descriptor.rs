use golden_core::{Descriptor, DESCRIPTOR_LEN};

use crate::types::Plane;

/// Spatial cells per side
const DESCR_WIDTH: usize = 4;
/// Orientation bins per cell
const DESCR_HIST_BINS: usize = 8;
/// Cell width in units of keypoint scale
const DESCR_SCL_FCTR: f32 = 3.0;
/// Clip level applied to the normalised vector
const DESCR_MAG_THR: f32 = 0.2;
const INT_DESCR_FCTR: f32 = 512.0;

/// Gradient-orientation histogram descriptor (4x4 cells, 8 bins)
pub struct DescriptorGenerator;

impl DescriptorGenerator {
    /// Describe the patch around `(x, y)` in octave coordinates.
    ///
    /// `angle` is the keypoint orientation in degrees and `scale` the blur of
    /// the layer the keypoint was found in. Samples are rotated into the
    /// keypoint frame and spread over neighbouring cells and bins by
    /// trilinear interpolation.
    pub fn compute(img: &Plane, x: f32, y: f32, angle: f32, scale: f32) -> Descriptor {
        let d = DESCR_WIDTH as isize;
        let n = DESCR_HIST_BINS;
        let (cx, cy) = (x.round() as isize, y.round() as isize);
        let (w, h) = (img.width as isize, img.height as isize);

        let mut ori = 360.0 - angle;
        if (ori - 360.0).abs() < f32::EPSILON * 360.0 {
            ori = 0.0;
        }
        let bins_per_deg = n as f32 / 360.0;
        let hist_width = DESCR_SCL_FCTR * scale;
        let (sin_t, cos_t) = ori.to_radians().sin_cos();
        let (sin_t, cos_t) = (sin_t / hist_width, cos_t / hist_width);
        let exp_scale = -1.0 / (d as f32 * d as f32 * 0.5);

        let diagonal = ((img.width * img.width + img.height * img.height) as f32).sqrt();
        let radius = (hist_width * std::f32::consts::SQRT_2 * (d as f32 + 1.0) * 0.5)
            .round()
            .min(diagonal) as isize;

        let side = DESCR_WIDTH + 2;
        let plane_stride = n + 2;
        let mut hist = vec![0.0f32; side * side * plane_stride];

        for i in -radius..=radius {
            for j in -radius..=radius {
                let c_rot = j as f32 * cos_t - i as f32 * sin_t;
                let r_rot = j as f32 * sin_t + i as f32 * cos_t;
                let rbin = r_rot + (d / 2) as f32 - 0.5;
                let cbin = c_rot + (d / 2) as f32 - 0.5;
                let r = cy + i;
                let c = cx + j;

                if rbin <= -1.0 || rbin >= d as f32 || cbin <= -1.0 || cbin >= d as f32 {
                    continue;
                }
                if r <= 0 || r >= h - 1 || c <= 0 || c >= w - 1 {
                    continue;
                }

                let dx = img.at_i(c + 1, r) - img.at_i(c - 1, r);
                let dy = img.at_i(c, r - 1) - img.at_i(c, r + 1);
                let weight = ((c_rot * c_rot + r_rot * r_rot) * exp_scale).exp();
                let mag = (dx * dx + dy * dy).sqrt() * weight;
                let mut grad_ori = dy.atan2(dx).to_degrees();
                if grad_ori < 0.0 {
                    grad_ori += 360.0;
                }
                let obin = (grad_ori - ori) * bins_per_deg;

                Self::accumulate(&mut hist, rbin, cbin, obin, mag);
            }
        }

        // Fold the wrap-around orientation bins and flatten
        let mut raw = [0.0f32; DESCRIPTOR_LEN];
        for i in 0..DESCR_WIDTH {
            for j in 0..DESCR_WIDTH {
                let idx = ((i + 1) * side + (j + 1)) * plane_stride;
                hist[idx] += hist[idx + n];
                hist[idx + 1] += hist[idx + n + 1];
                for k in 0..n {
                    raw[(i * DESCR_WIDTH + j) * n + k] = hist[idx + k];
                }
            }
        }

        Self::normalize(raw)
    }

    /// Trilinear interpolation of one weighted sample into the histogram
    fn accumulate(hist: &mut [f32], rbin: f32, cbin: f32, obin: f32, mag: f32) {
        let n = DESCR_HIST_BINS as isize;
        let side = (DESCR_WIDTH + 2) as isize;
        let plane_stride = n + 2;

        let r0 = rbin.floor();
        let c0 = cbin.floor();
        let o0 = obin.floor();
        let (rbin, cbin, obin) = (rbin - r0, cbin - c0, obin - o0);
        let (r0, c0) = (r0 as isize, c0 as isize);
        let mut o0 = o0 as isize;
        if o0 < 0 {
            o0 += n;
        }
        if o0 >= n {
            o0 -= n;
        }

        let v_r1 = mag * rbin;
        let v_r0 = mag - v_r1;
        let v_rc11 = v_r1 * cbin;
        let v_rc10 = v_r1 - v_rc11;
        let v_rc01 = v_r0 * cbin;
        let v_rc00 = v_r0 - v_rc01;
        let v_rco111 = v_rc11 * obin;
        let v_rco110 = v_rc11 - v_rco111;
        let v_rco101 = v_rc10 * obin;
        let v_rco100 = v_rc10 - v_rco101;
        let v_rco011 = v_rc01 * obin;
        let v_rco010 = v_rc01 - v_rco011;
        let v_rco001 = v_rc00 * obin;
        let v_rco000 = v_rc00 - v_rco001;

        let idx = (((r0 + 1) * side + c0 + 1) * plane_stride + o0) as usize;
        let row = (side * plane_stride) as usize;
        let col = plane_stride as usize;

        hist[idx] += v_rco000;
        hist[idx + 1] += v_rco001;
        hist[idx + col] += v_rco010;
        hist[idx + col + 1] += v_rco011;
        hist[idx + row] += v_rco100;
        hist[idx + row + 1] += v_rco101;
        hist[idx + row + col] += v_rco110;
        hist[idx + row + col + 1] += v_rco111;
    }

    /// Unit-normalise, clip large components, renormalise and scale to `0..=255`
    fn normalize(mut raw: [f32; DESCRIPTOR_LEN]) -> Descriptor {
        let norm: f32 = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
        let clip = norm * DESCR_MAG_THR;
        for v in raw.iter_mut() {
            *v = v.min(clip);
        }

        let norm: f32 = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
        let scale = INT_DESCR_FCTR / norm.max(f32::EPSILON);
        for v in raw.iter_mut() {
            *v = (*v * scale).round().clamp(0.0, 255.0);
        }
        raw
    }
}
