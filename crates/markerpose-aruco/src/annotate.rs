use markerpose_3d::projection::{project_points, transform_points};
use markerpose_image::Image;
use markerpose_imgproc::{
    calibration::{distortion::PolynomialDistortion, CameraIntrinsic},
    draw::{draw_line, draw_number, draw_polygon},
};

use crate::{candidates::Quad, detector::Detection};

const GREEN: [u8; 3] = [0, 255, 0];
const RED: [u8; 3] = [255, 0, 0];
const BLUE: [u8; 3] = [0, 0, 255];
const REJECTED: [u8; 3] = [255, 0, 100];

fn to_pixel(p: &[f64; 2]) -> (i64, i64) {
    (p[0].round() as i64, p[1].round() as i64)
}

/// Draw the outline, first corner and id of each marker.
pub fn draw_detected_markers(img: &mut Image<u8, 3>, detections: &[Detection]) {
    for detection in detections {
        let outline = detection.corners.map(|c| to_pixel(&c));
        draw_polygon(img, &outline, GREEN, 1);

        let (x, y) = outline[0];
        draw_polygon(
            img,
            &[(x - 3, y - 3), (x + 3, y - 3), (x + 3, y + 3), (x - 3, y + 3)],
            RED,
            1,
        );

        draw_number(img, (x + 5, y + 5), detection.id, 2, BLUE);
    }
}

/// Draw the outline of the candidates that were not decoded.
pub fn draw_rejected_candidates(img: &mut Image<u8, 3>, rejected: &[Quad]) {
    for quad in rejected {
        draw_polygon(img, &quad.map(|c| to_pixel(&c)), REJECTED, 1);
    }
}

/// Draw the x (red), y (green) and z (blue) axes of a pose.
///
/// Nothing is drawn if the origin lies behind the camera, and an axis whose
/// end lies behind the camera is skipped.
pub fn draw_axes(
    img: &mut Image<u8, 3>,
    rvec: &[f64; 3],
    tvec: &[f64; 3],
    intrinsic: &CameraIntrinsic,
    distortion: &PolynomialDistortion,
    length: f64,
) {
    let points = [
        [0.0, 0.0, 0.0],
        [length, 0.0, 0.0],
        [0.0, length, 0.0],
        [0.0, 0.0, length],
    ];
    let min_depth = length.abs() * 1e-6;
    let in_front: Vec<bool> = transform_points(&points, rvec, tvec)
        .iter()
        .map(|p| p[2] > min_depth)
        .collect();
    if !in_front[0] {
        return;
    }

    let projected = project_points(&points, rvec, tvec, intrinsic, distortion);
    if projected[0].iter().any(|v| !v.is_finite()) {
        return;
    }

    let origin = to_pixel(&projected[0]);
    for ((end, visible), color) in projected[1..]
        .iter()
        .zip(&in_front[1..])
        .zip([RED, GREEN, BLUE])
    {
        if *visible && end.iter().all(|v| v.is_finite()) {
            draw_line(img, origin, to_pixel(end), color, 2);
        }
    }
}
