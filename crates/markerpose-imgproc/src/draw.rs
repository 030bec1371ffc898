use markerpose_image::Image;

/// 3x5 bitmaps for the digits 0-9, one row per entry, most significant bit left.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

#[inline]
fn set_pixel<const C: usize>(img: &mut Image<u8, C>, x: i64, y: i64, color: [u8; C]) {
    if x >= 0 && y >= 0 && x < img.width() as i64 && y < img.height() as i64 {
        let start = (y as usize * img.width() + x as usize) * C;
        img.as_slice_mut()[start..start + C].copy_from_slice(&color);
    }
}

/// Clip the segment p0-p1 to a rectangle with the Liang-Barsky algorithm.
fn clip_segment(
    p0: (f64, f64),
    p1: (f64, f64),
    min: (f64, f64),
    max: (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);

    for (p, q) in [
        (-dx, p0.0 - min.0),
        (dx, max.0 - p0.0),
        (-dy, p0.1 - min.1),
        (dy, max.1 - p0.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }

    Some((
        (p0.0 + t0 * dx, p0.1 + t0 * dy),
        (p0.0 + t1 * dx, p0.1 + t1 * dy),
    ))
}

/// Draws a line on an image inplace using Bresenham's line algorithm.
///
/// The line is clipped to the image first, so endpoints far outside the
/// image do not cost extra steps.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `p0` - The start point of the line as a tuple of (x, y).
/// * `p1` - The end point of the line as a tuple of (x, y).
/// * `color` - The color of the line as an array of `C` elements.
/// * `thickness` - The thickness of the line.
pub fn draw_line<const C: usize>(
    img: &mut Image<u8, C>,
    p0: (i64, i64),
    p1: (i64, i64),
    color: [u8; C],
    thickness: usize,
) {
    let half = (thickness.max(1) as i64 - 1) / 2;
    if img.width() == 0 || img.height() == 0 {
        return;
    }

    let min = (-half as f64, -half as f64);
    let max = (
        (img.width() as i64 - 1 + half) as f64,
        (img.height() as i64 - 1 + half) as f64,
    );
    let Some((q0, q1)) = clip_segment(
        (p0.0 as f64, p0.1 as f64),
        (p1.0 as f64, p1.1 as f64),
        min,
        max,
    ) else {
        return;
    };

    let (mut x0, mut y0) = (q0.0.round() as i64, q0.1.round() as i64);
    let (x1, y1) = (q1.0.round() as i64, q1.1.round() as i64);

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut err = dx - dy;

    loop {
        for i in -half..=half {
            for j in -half..=half {
                set_pixel(img, x0 + i, y0 + j, color);
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Draws a closed polygon outline on an image inplace.
pub fn draw_polygon<const C: usize>(
    img: &mut Image<u8, C>,
    points: &[(i64, i64)],
    color: [u8; C],
    thickness: usize,
) {
    for (i, &p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        draw_line(img, p, q, color, thickness);
    }
}

/// Draws a filled rectangle on an image inplace.
///
/// Both corners are inclusive.
pub fn draw_filled_rect<const C: usize>(
    img: &mut Image<u8, C>,
    top_left: (i64, i64),
    bottom_right: (i64, i64),
    color: [u8; C],
) {
    let (x0, x1) = (top_left.0.min(bottom_right.0), top_left.0.max(bottom_right.0));
    let (y0, y1) = (top_left.1.min(bottom_right.1), top_left.1.max(bottom_right.1));
    for y in y0..=y1 {
        for x in x0..=x1 {
            set_pixel(img, x, y, color);
        }
    }
}

/// Draws a non-negative integer with a built-in 3x5 digit font.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `origin` - The top-left corner of the text.
/// * `value` - The number to render.
/// * `scale` - The size in pixels of one font cell.
/// * `color` - The text color.
pub fn draw_number<const C: usize>(
    img: &mut Image<u8, C>,
    origin: (i64, i64),
    value: u32,
    scale: usize,
    color: [u8; C],
) {
    let scale = scale.max(1) as i64;
    for (k, ch) in value.to_string().bytes().enumerate() {
        let glyph = &DIGITS[(ch - b'0') as usize];
        let x_offset = origin.0 + k as i64 * 4 * scale;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..3 {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                let x = x_offset + col * scale;
                let y = origin.1 + row as i64 * scale;
                draw_filled_rect(img, (x, y), (x + scale - 1, y + scale - 1), color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markerpose_image::{Image, ImageError, ImageSize};

    #[test]
    fn test_draw_line() -> Result<(), ImageError> {
        let mut img = Image::new(
            ImageSize {
                width: 5,
                height: 5,
            },
            vec![0u8; 25],
        )?;
        draw_line(&mut img, (0, 0), (4, 4), [255], 1);

        #[rustfmt::skip]
        assert_eq!(
            img.as_slice(),
            vec![
                255, 0, 0, 0, 0,
                0, 255, 0, 0, 0,
                0, 0, 255, 0, 0,
                0, 0, 0, 255, 0,
                0, 0, 0, 0, 255,
            ]
        );

        Ok(())
    }

    #[test]
    fn test_draw_line_clipped() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([4, 1].into(), 0)?;
        draw_line(&mut img, (-3, 0), (10, 0), [9], 1);
        assert_eq!(img.as_slice(), &[9, 9, 9, 9]);

        Ok(())
    }

    #[test]
    fn test_draw_line_far_endpoint() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([10, 3].into(), 0)?;
        draw_line(&mut img, (2, 1), (1_000_000_000_000, 1), [1], 1);
        draw_line(&mut img, (i64::MIN, -5), (i64::MAX, -5), [2], 1);

        #[rustfmt::skip]
        assert_eq!(
            img.as_slice(),
            vec![
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 1, 1, 1, 1, 1, 1, 1, 1,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            ]
        );

        Ok(())
    }

    #[test]
    fn test_draw_polygon() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([5, 5].into(), 0)?;
        draw_polygon(&mut img, &[(1, 1), (3, 1), (3, 3), (1, 3)], [1], 1);

        #[rustfmt::skip]
        assert_eq!(
            img.as_slice(),
            vec![
                0, 0, 0, 0, 0,
                0, 1, 1, 1, 0,
                0, 1, 0, 1, 0,
                0, 1, 1, 1, 0,
                0, 0, 0, 0, 0,
            ]
        );

        Ok(())
    }

    #[test]
    fn test_draw_number() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([7, 5].into(), 0)?;
        draw_number(&mut img, (0, 0), 17, 1, [1]);

        #[rustfmt::skip]
        assert_eq!(
            img.as_slice(),
            vec![
                0, 1, 0, 0, 1, 1, 1,
                1, 1, 0, 0, 0, 0, 1,
                0, 1, 0, 0, 0, 1, 0,
                0, 1, 0, 0, 0, 1, 0,
                1, 1, 1, 0, 0, 1, 0,
            ]
        );

        Ok(())
    }
}
