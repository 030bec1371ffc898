use markerpose_image::{Image, ImageError};
use markerpose_imgproc::{
    contours::{approx_poly_dp, convex_hull, find_components, polygon_perimeter},
    threshold::adaptive_threshold_mean_inverse,
};

use crate::params::DetectorParameters;

/// Four image corners, clockwise in image coordinates.
pub type Quad = [[f64; 2]; 4];

/// A quadrilateral that may hold a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The corners, clockwise in image coordinates.
    pub corners: Quad,
    /// The perimeter of the quadrilateral in pixels.
    pub perimeter: f64,
}

/// Find the marker candidates of a grayscale image.
///
/// The image is thresholded once per adaptive window size. Every connected
/// dark region whose convex outline reduces to a large enough quadrilateral
/// away from the image border is kept. Near duplicates found at different
/// window sizes are merged, keeping the larger one.
///
/// # Arguments
///
/// * `gray` - The grayscale image.
/// * `params` - The detector parameters.
///
/// # Returns
///
/// The candidates sorted by decreasing perimeter.
pub fn detect_candidates(
    gray: &Image<u8, 1>,
    params: &DetectorParameters,
) -> Result<Vec<Candidate>, ImageError> {
    let max_dim = gray.width().max(gray.height()) as f64;
    let min_perimeter = params.min_marker_perimeter_rate * max_dim;
    let max_perimeter = params.max_marker_perimeter_rate * max_dim;

    let mut binary = Image::<u8, 1>::from_size_val(gray.size(), 0)?;
    let mut candidates = Vec::new();

    for window in params.window_sizes() {
        adaptive_threshold_mean_inverse(
            gray,
            &mut binary,
            window,
            params.adaptive_thresh_constant,
            255,
        )?;

        for component in find_components(&binary) {
            // the boundary is at least as long as the outline
            if (component.len() as f64) < min_perimeter {
                continue;
            }
            let points = component
                .iter()
                .map(|&(x, y)| (x as f64, y as f64))
                .collect::<Vec<_>>();

            let hull = convex_hull(&points);
            if hull.len() < 4 {
                continue;
            }
            let hull_perimeter = polygon_perimeter(&hull);
            if hull_perimeter < min_perimeter || hull_perimeter > max_perimeter {
                continue;
            }

            let poly = approx_poly_dp(&hull, hull_perimeter * params.polygonal_approx_accuracy_rate);
            if poly.len() != 4 {
                continue;
            }

            let mut corners = [[0.0; 2]; 4];
            for (dst, p) in corners.iter_mut().zip(poly.iter()) {
                *dst = [p.0, p.1];
            }
            let perimeter = polygon_perimeter(&poly);

            let min_corner_distance = perimeter * params.min_corner_distance_rate;
            if min_side_sq(&corners) < min_corner_distance * min_corner_distance {
                continue;
            }

            if !is_inside_border(&corners, gray.width(), gray.height(), params.min_distance_to_border)
            {
                continue;
            }

            order_clockwise(&mut corners);
            candidates.push(Candidate { corners, perimeter });
        }
    }

    let merged = merge_close_candidates(candidates, params.min_marker_distance_rate);
    log::trace!("{} marker candidates", merged.len());

    Ok(merged)
}

fn min_side_sq(corners: &Quad) -> f64 {
    (0..4)
        .map(|i| distance_sq(&corners[i], &corners[(i + 1) % 4]))
        .fold(f64::INFINITY, f64::min)
}

fn distance_sq(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

fn is_inside_border(corners: &Quad, width: usize, height: usize, min_distance: usize) -> bool {
    let d = min_distance as f64;
    let (max_x, max_y) = (width as f64 - 1.0 - d, height as f64 - 1.0 - d);
    corners
        .iter()
        .all(|c| c[0] >= d && c[1] >= d && c[0] <= max_x && c[1] <= max_y)
}

/// Reorder the corners so that they run clockwise in image coordinates (y down).
pub fn order_clockwise(corners: &mut Quad) {
    let (d1x, d1y) = (corners[1][0] - corners[0][0], corners[1][1] - corners[0][1]);
    let (d2x, d2y) = (corners[2][0] - corners[0][0], corners[2][1] - corners[0][1]);
    if d1x * d2y - d1y * d2x < 0.0 {
        corners.swap(1, 3);
    }
}

// mean squared corner distance over the four cyclic correspondences
fn mean_corner_distance_sq(a: &Quad, b: &Quad) -> f64 {
    (0..4)
        .map(|shift| {
            (0..4)
                .map(|i| distance_sq(&a[i], &b[(i + shift) % 4]))
                .sum::<f64>()
                / 4.0
        })
        .fold(f64::INFINITY, f64::min)
}

fn merge_close_candidates(mut candidates: Vec<Candidate>, rate: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.perimeter.total_cmp(&a.perimeter));

    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let duplicate = kept.iter().any(|k| {
            let threshold = rate * k.perimeter.min(candidate.perimeter);
            mean_corner_distance_sq(&k.corners, &candidate.corners) < threshold * threshold
        });
        if !duplicate {
            kept.push(candidate);
        }
    }
    kept
}
