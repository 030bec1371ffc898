use markerpose_3d::pose::homography_4pt2d;
use markerpose_image::Image;
use markerpose_imgproc::{
    interpolation::{interpolate_pixel, InterpolationMode},
    threshold::otsu_threshold_value,
};

use crate::{candidates::Quad, dictionary::Dictionary, params::DetectorParameters};

/// A decoded marker before pose estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMarker {
    /// The marker id in the dictionary.
    pub id: u32,
    /// The corners, the first one being the top-left corner of the marker.
    pub corners: Quad,
}

/// Remove the perspective of a candidate and read its cells.
///
/// # Arguments
///
/// * `gray` - The grayscale image as floats.
/// * `corners` - The candidate corners, clockwise.
/// * `cells` - The number of cells per side, border included.
/// * `params` - The detector parameters.
///
/// # Returns
///
/// One value per cell in row-major order, 1 for white and 0 for black, or
/// `None` if the candidate is degenerate.
pub fn extract_bits(
    gray: &Image<f32, 1>,
    corners: &Quad,
    cells: usize,
    params: &DetectorParameters,
) -> Option<Vec<u8>> {
    let cell_px = params.perspective_remove_pixel_per_cell;
    let side = cells * cell_px;
    let last = (side - 1) as f64;
    let canonical = [[0.0, 0.0], [last, 0.0], [last, last], [0.0, last]];
    let h = homography_4pt2d(&canonical, corners).ok()?;

    let mut warped = Vec::with_capacity(side * side);
    for y in 0..side {
        for x in 0..side {
            let (xf, yf) = (x as f64, y as f64);
            let w = h[2][0] * xf + h[2][1] * yf + h[2][2];
            if w.abs() < f64::EPSILON {
                return None;
            }
            let u = (h[0][0] * xf + h[0][1] * yf + h[0][2]) / w;
            let v = (h[1][0] * xf + h[1][1] * yf + h[1][2]) / w;
            let value = interpolate_pixel(gray, u as f32, v as f32, 0, InterpolationMode::Bilinear);
            warped.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }

    let n = warped.len() as f64;
    let mean = warped.iter().map(|&v| v as f64).sum::<f64>() / n;
    let std_dev = (warped
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    // too uniform to split with Otsu
    if std_dev < params.min_otsu_std_dev {
        let bit = u8::from(mean > 127.0);
        return Some(vec![bit; cells * cells]);
    }

    let threshold = otsu_threshold_value(&warped);

    let margin = (cell_px as f64 * params.perspective_remove_ignored_margin_per_cell) as usize;
    let inner = cell_px - 2 * margin;
    let area = inner * inner;

    let mut bits = vec![0u8; cells * cells];
    for cy in 0..cells {
        for cx in 0..cells {
            let (x0, y0) = (cx * cell_px + margin, cy * cell_px + margin);
            let white = (y0..y0 + inner)
                .flat_map(|y| (x0..x0 + inner).map(move |x| y * side + x))
                .filter(|&i| warped[i] > threshold)
                .count();
            if white > area / 2 {
                bits[cy * cells + cx] = 1;
            }
        }
    }

    Some(bits)
}

/// Count the white cells of the marker border.
pub fn border_errors(bits: &[u8], marker_size: usize, border_bits: usize) -> usize {
    let cells = marker_size + 2 * border_bits;
    (0..cells)
        .flat_map(|y| (0..cells).map(move |x| (x, y)))
        .filter(|&(x, y)| {
            x < border_bits || y < border_bits || x >= cells - border_bits || y >= cells - border_bits
        })
        .filter(|&(x, y)| bits[y * cells + x] != 0)
        .count()
}

/// Pack the inner cells into a dictionary code, row-major, first cell in the lowest bit.
pub fn payload_code(bits: &[u8], marker_size: usize, border_bits: usize) -> u64 {
    let cells = marker_size + 2 * border_bits;
    let mut code = 0u64;
    for y in 0..marker_size {
        for x in 0..marker_size {
            if bits[(y + border_bits) * cells + (x + border_bits)] != 0 {
                code |= 1u64 << (y * marker_size + x);
            }
        }
    }
    code
}

/// Decode a candidate against a dictionary.
///
/// The returned corners are rotated so that the first one is the top-left
/// corner of the canonical marker.
pub fn decode_candidate(
    gray: &Image<f32, 1>,
    corners: &Quad,
    dictionary: &Dictionary,
    params: &DetectorParameters,
) -> Option<DecodedMarker> {
    let marker_size = dictionary.marker_size();
    let border_bits = params.marker_border_bits;
    let cells = marker_size + 2 * border_bits;

    let bits = extract_bits(gray, corners, cells, params)?;

    let max_border_errors =
        ((marker_size * marker_size) as f64 * params.max_erroneous_bits_in_border_rate) as usize;
    if border_errors(&bits, marker_size, border_bits) > max_border_errors {
        return None;
    }

    let code = payload_code(&bits, marker_size, border_bits);
    let max_distance =
        (dictionary.max_correction_bits() as f64 * params.error_correction_rate) as u32;
    let (id, turns) = dictionary.identify(code, max_distance)?;

    // the canonical top-left corner was observed `turns` positions further clockwise
    let corners = std::array::from_fn(|i| corners[(i + turns) % 4]);

    Some(DecodedMarker { id, corners })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::PredefinedDictionary;
    use markerpose_image::{ImageError, ImageSize};

    // paste a marker rendered at `side` pixels at (x0, x0) on a white canvas
    fn marker_scene(
        dict: &Dictionary,
        id: u32,
        size: usize,
        x0: usize,
        side: usize,
    ) -> Result<Image<f32, 1>, Box<dyn std::error::Error>> {
        let marker = dict.render_marker(id, side)?;
        let mut canvas = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: size,
                height: size,
            },
            255,
        )?;
        for y in 0..side {
            for x in 0..side {
                canvas.set_pixel(x0 + x, x0 + y, [marker.get_pixel(x, y, 0)?])?;
            }
        }
        Ok(canvas.cast::<f32>()?)
    }

    #[test]
    fn border_and_payload() {
        #[rustfmt::skip]
        let bits = vec![
            0, 0, 0, 0,
            0, 1, 0, 0,
            0, 1, 1, 1,
            0, 0, 0, 0,
        ];
        assert_eq!(border_errors(&bits, 2, 1), 1);
        assert_eq!(payload_code(&bits, 2, 1), 0b1101);
    }

    #[test]
    fn decodes_axis_aligned_marker() -> Result<(), Box<dyn std::error::Error>> {
        let dict = Dictionary::new(PredefinedDictionary::Dict4x4_50);
        let gray = marker_scene(&dict, 7, 100, 20, 60)?;
        let corners = [[20.0, 20.0], [79.0, 20.0], [79.0, 79.0], [20.0, 79.0]];

        let decoded = decode_candidate(&gray, &corners, &dict, &DetectorParameters::default())
            .ok_or("marker not decoded")?;
        assert_eq!(decoded.id, 7);
        assert_eq!(decoded.corners, corners);
        Ok(())
    }

    #[test]
    fn decodes_rotated_corner_order() -> Result<(), Box<dyn std::error::Error>> {
        let dict = Dictionary::new(PredefinedDictionary::Dict4x4_50);
        let gray = marker_scene(&dict, 3, 100, 20, 60)?;

        // same quad, starting from the bottom-left corner
        let corners = [[20.0, 79.0], [20.0, 20.0], [79.0, 20.0], [79.0, 79.0]];
        let decoded = decode_candidate(&gray, &corners, &dict, &DetectorParameters::default())
            .ok_or("marker not decoded")?;
        assert_eq!(decoded.id, 3);
        assert_eq!(decoded.corners[0], [20.0, 20.0]);
        assert_eq!(decoded.corners[1], [79.0, 20.0]);
        Ok(())
    }

    #[test]
    fn rejects_plain_square() -> Result<(), ImageError> {
        let mut canvas = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 100,
                height: 100,
            },
            255.0,
        )?;
        for y in 20..80 {
            for x in 20..80 {
                canvas.set_pixel(x, y, [0.0])?;
            }
        }
        let corners = [[20.0, 20.0], [79.0, 20.0], [79.0, 79.0], [20.0, 79.0]];
        let dict = Dictionary::new(PredefinedDictionary::Dict4x4_50);
        assert!(decode_candidate(&canvas, &corners, &dict, &DetectorParameters::default()).is_none());

        // a black payload is never a valid code
        assert_eq!(dict.identify(0, 0), None);
        Ok(())
    }
}
