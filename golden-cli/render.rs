use golden_core::{Image, Keypoint};
use golden_match::CandidatePair;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

/// Colour of every detected keypoint
pub const KEYPOINT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
/// Colour of accepted correspondences
pub const MATCH_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const KEYPOINT_RADIUS: i32 = 3;

/// Copy a grayscale image into an RGB canvas at horizontal offset `x0`
fn blit_gray(canvas: &mut RgbImage, img: &Image, x0: u32) {
    for y in 0..img.height() {
        for (x, &v) in img.row(y).iter().enumerate() {
            canvas.put_pixel(x0 + x as u32, y as u32, Rgb([v, v, v]));
        }
    }
}

/// Grayscale image as RGB
pub fn to_rgb(img: &Image) -> RgbImage {
    let mut canvas = RgbImage::new(img.width() as u32, img.height() as u32);
    blit_gray(&mut canvas, img, 0);
    canvas
}

fn mark_keypoint(canvas: &mut RgbImage, kp: &Keypoint, x_offset: f32, color: Rgb<u8>) {
    let center = ((kp.x + x_offset).round() as i32, kp.y.round() as i32);
    draw_hollow_circle_mut(canvas, center, KEYPOINT_RADIUS, color);
}

/// Draw reference and query side by side with their correspondences.
///
/// Every keypoint gets a small blue circle; each pair whose mask entry is
/// set gets a green line from its reference keypoint to its best query
/// keypoint. Returns the canvas and the number of lines drawn.
pub fn render_matches(
    reference: &Image,
    reference_kps: &[Keypoint],
    query: &Image,
    query_kps: &[Keypoint],
    candidates: &[CandidatePair],
    mask: &[bool],
) -> (RgbImage, usize) {
    let width = (reference.width() + query.width()) as u32;
    let height = reference.height().max(query.height()) as u32;
    let offset = reference.width() as f32;

    let mut canvas = RgbImage::new(width, height);
    blit_gray(&mut canvas, reference, 0);
    blit_gray(&mut canvas, query, reference.width() as u32);

    for kp in reference_kps {
        mark_keypoint(&mut canvas, kp, 0.0, KEYPOINT_COLOR);
    }
    for kp in query_kps {
        mark_keypoint(&mut canvas, kp, offset, KEYPOINT_COLOR);
    }

    debug_assert_eq!(mask.len(), candidates.len(), "one mask entry per candidate pair");

    let mut lines = 0;
    for (pair, _) in candidates.iter().zip(mask).filter(|(_, accepted)| **accepted) {
        let (from, to) = (
            reference_kps.get(pair.best.reference_idx),
            query_kps.get(pair.best.query_idx),
        );
        debug_assert!(
            from.is_some() && to.is_some(),
            "match {} -> {} outside {} reference / {} query keypoints",
            pair.best.reference_idx,
            pair.best.query_idx,
            reference_kps.len(),
            query_kps.len()
        );
        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };

        mark_keypoint(&mut canvas, from, 0.0, MATCH_COLOR);
        mark_keypoint(&mut canvas, to, offset, MATCH_COLOR);
        draw_line_segment_mut(&mut canvas, (from.x, from.y), (to.x + offset, to.y), MATCH_COLOR);
        lines += 1;
    }

    (canvas, lines)
}

/// Draw keypoints with their scale and orientation
pub fn render_keypoints(img: &Image, keypoints: &[Keypoint]) -> RgbImage {
    let mut canvas = to_rgb(img);
    for kp in keypoints {
        let radius = (kp.size * 0.5).max(KEYPOINT_RADIUS as f32);
        draw_hollow_circle_mut(
            &mut canvas,
            (kp.x.round() as i32, kp.y.round() as i32),
            radius.round() as i32,
            MATCH_COLOR,
        );
        // Angles grow counter-clockwise while image rows grow downwards
        let (sin, cos) = kp.angle.sin_cos();
        draw_line_segment_mut(
            &mut canvas,
            (kp.x, kp.y),
            (kp.x + radius * cos, kp.y - radius * sin),
            KEYPOINT_COLOR,
        );
    }
    canvas
}
