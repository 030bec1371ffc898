use markerpose_image::{Image, ImageError};

use crate::parallel;

/// Compute the summed-area table of a grayscale image.
///
/// The table has one extra row and column of zeros so that the sum over the
/// half-open window `[x0, x1) x [y0, y1)` is
/// `t[y1][x1] - t[y0][x1] - t[y1][x0] + t[y0][x0]`.
pub fn integral_image(src: &Image<u8, 1>) -> Vec<u64> {
    let (rows, cols) = (src.height(), src.width());
    let stride = cols + 1;
    let mut table = vec![0u64; (rows + 1) * stride];
    let data = src.as_slice();

    for y in 0..rows {
        let mut row_sum = 0u64;
        for x in 0..cols {
            row_sum += data[y * cols + x] as u64;
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
        }
    }

    table
}

/// Apply an inverse adaptive threshold using the local mean.
///
/// A pixel is set to `max_value` when it is darker than the mean of the
/// `block_size` x `block_size` window centred on it minus `c`, and to zero
/// otherwise. Windows are clipped at the image border.
///
/// # Arguments
///
/// * `src` - The input grayscale image.
/// * `dst` - The output binary image.
/// * `block_size` - The odd side length of the averaging window (>= 3).
/// * `c` - The constant subtracted from the local mean.
/// * `max_value` - The value assigned to foreground pixels.
///
/// # Examples
///
/// ```
/// use markerpose_image::{Image, ImageSize};
/// use markerpose_imgproc::threshold::adaptive_threshold_mean_inverse;
///
/// let mut data = vec![255u8; 25];
/// data[12] = 0;
/// let image = Image::<u8, 1>::new(ImageSize { width: 5, height: 5 }, data).unwrap();
/// let mut binary = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// adaptive_threshold_mean_inverse(&image, &mut binary, 3, 7.0, 255).unwrap();
/// assert_eq!(binary.as_slice()[12], 255);
/// assert_eq!(binary.as_slice()[0], 0);
/// ```
pub fn adaptive_threshold_mean_inverse(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    block_size: usize,
    c: f64,
    max_value: u8,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        ));
    }

    let (rows, cols) = (src.height(), src.width());
    let stride = cols + 1;
    let half = block_size / 2;
    let table = integral_image(src);
    let data = src.as_slice();

    parallel::par_iter_rows_indexed(dst, |x, y, dst_pixel| {
        let (x0, x1) = (x.saturating_sub(half), (x + half + 1).min(cols));
        let (y0, y1) = (y.saturating_sub(half), (y + half + 1).min(rows));
        let sum = table[y1 * stride + x1] + table[y0 * stride + x0]
            - table[y0 * stride + x1]
            - table[y1 * stride + x0];
        let area = ((x1 - x0) * (y1 - y0)) as f64;
        let mean = (sum as f64 / area).round();

        dst_pixel[0] = if (data[y * cols + x] as f64) <= mean - c {
            max_value
        } else {
            0
        };
    });

    Ok(())
}

/// Compute the Otsu threshold of a set of intensity samples.
///
/// Returns the intensity that maximizes the between-class variance; samples
/// strictly above it belong to the bright class.
pub fn otsu_threshold_value(samples: &[u8]) -> u8 {
    const BINS: usize = 256;
    let mut histogram = [0u32; BINS];
    for &pixel in samples {
        histogram[pixel as usize] += 1;
    }

    let total = samples.len() as f64;
    let sum_total = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum::<f64>();

    let mut best_variance = 0.0;
    let mut best_threshold = 0u8;
    let mut weight_back = 0.0;
    let mut sum_back = 0.0;

    for (current, &count) in histogram.iter().enumerate() {
        weight_back += count as f64;
        sum_back += current as f64 * count as f64;

        if weight_back == 0.0 || weight_back == total {
            continue;
        }

        let weight_fore = total - weight_back;
        let mean_back = sum_back / weight_back;
        let mean_fore = (sum_total - sum_back) / weight_fore;

        let variance = weight_back * weight_fore * (mean_back - mean_fore).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_threshold = current as u8;
        }
    }

    best_threshold
}
