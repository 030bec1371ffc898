use markerpose_image::Image;
use markerpose_imgproc::interpolation::{interpolate_pixel, InterpolationMode};

/// Refine corner locations to sub-pixel accuracy.
///
/// Each corner is moved to the point that best agrees with the image
/// gradients of its neighbourhood: for a corner `q` and a pixel `p` near
/// it, the gradient at `p` is orthogonal to `p - q`. Corners that drift
/// further than the window are restored.
///
/// # Arguments
///
/// * `gray` - The grayscale image as floats.
/// * `corners` - The corners to refine in place.
/// * `win_size` - Half side of the search window in pixels.
/// * `max_iterations` - Maximum number of iterations per corner.
/// * `min_accuracy` - Stop once a step is shorter than this, in pixels.
pub fn refine_corners_subpix(
    gray: &Image<f32, 1>,
    corners: &mut [[f64; 2]],
    win_size: usize,
    max_iterations: usize,
    min_accuracy: f64,
) {
    let win = win_size as i64;
    let sigma2 = (win_size * win_size).max(1) as f64;
    let sample = |x: f64, y: f64| {
        interpolate_pixel(gray, x as f32, y as f32, 0, InterpolationMode::Bilinear) as f64
    };

    for corner in corners.iter_mut() {
        let initial = *corner;
        let mut current = initial;

        for _ in 0..max_iterations {
            let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
            let (mut bb1, mut bb2) = (0.0, 0.0);

            for dy in -win..=win {
                for dx in -win..=win {
                    let (px, py) = (current[0] + dx as f64, current[1] + dy as f64);
                    let gx = (sample(px + 1.0, py) - sample(px - 1.0, py)) * 0.5;
                    let gy = (sample(px, py + 1.0) - sample(px, py - 1.0)) * 0.5;
                    let w = (-((dx * dx + dy * dy) as f64) / sigma2).exp();

                    let (gxx, gxy, gyy) = (gx * gx * w, gx * gy * w, gy * gy * w);
                    a += gxx;
                    b += gxy;
                    c += gyy;
                    bb1 += gxx * px + gxy * py;
                    bb2 += gxy * px + gyy * py;
                }
            }

            let det = a * c - b * b;
            if det.abs() <= f64::EPSILON * (a * c).abs().max(1.0) {
                break;
            }

            let next = [(c * bb1 - b * bb2) / det, (a * bb2 - b * bb1) / det];
            let step = (next[0] - current[0]).powi(2) + (next[1] - current[1]).powi(2);
            current = next;
            if step <= min_accuracy * min_accuracy {
                break;
            }
        }

        let limit = win_size as f64;
        if (current[0] - initial[0]).abs() > limit || (current[1] - initial[1]).abs() > limit {
            log::trace!("subpixel refinement diverged at {initial:?}");
            continue;
        }
        *corner = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use markerpose_image::{ImageError, ImageSize};

    #[test]
    fn moves_to_square_corner() -> Result<(), ImageError> {
        // a black square covering pixels 20..=59, its edges lie at 19.5 and 59.5
        let mut img = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 80,
                height: 80,
            },
            255.0,
        )?;
        for y in 20..60 {
            for x in 20..60 {
                img.set_pixel(x, y, [0.0])?;
            }
        }

        let mut corners = [[21.0, 21.0], [58.0, 21.5]];
        refine_corners_subpix(&img, &mut corners, 5, 30, 0.01);

        assert_abs_diff_eq!(corners[0][0], 19.5, epsilon = 0.2);
        assert_abs_diff_eq!(corners[0][1], 19.5, epsilon = 0.2);
        assert_abs_diff_eq!(corners[1][0], 59.5, epsilon = 0.2);
        assert_abs_diff_eq!(corners[1][1], 19.5, epsilon = 0.2);
        Ok(())
    }

    #[test]
    fn flat_region_is_untouched() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val(
            ImageSize {
                width: 40,
                height: 40,
            },
            128.0,
        )?;
        let mut corners = [[20.0, 20.0]];
        refine_corners_subpix(&img, &mut corners, 3, 10, 0.01);
        assert_eq!(corners[0], [20.0, 20.0]);
        Ok(())
    }
}
