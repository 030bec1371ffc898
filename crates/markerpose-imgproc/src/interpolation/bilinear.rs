use super::interpolate::fetch;
use markerpose_image::Image;

/// Kernel for bilinear interpolation
///
/// # Arguments
///
/// * `image` - The input image container.
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `c` - The channel of the pixel to interpolate.
///
/// # Returns
///
/// The interpolated pixel value.
pub(crate) fn bilinear_interpolation<const C: usize>(
    image: &Image<f32, C>,
    u: f32,
    v: f32,
    c: usize,
) -> f32 {
    let iu = u.floor();
    let iv = v.floor();

    let frac_u = u - iu;
    let frac_v = v - iv;

    let (x0, y0) = (iu as i64, iv as i64);

    let p00 = fetch(image, x0, y0, c);
    let p01 = fetch(image, x0 + 1, y0, c);
    let p10 = fetch(image, x0, y0 + 1, c);
    let p11 = fetch(image, x0 + 1, y0 + 1, c);

    p00 * (1.0 - frac_u) * (1.0 - frac_v)
        + p01 * frac_u * (1.0 - frac_v)
        + p10 * (1.0 - frac_u) * frac_v
        + p11 * frac_u * frac_v
}
