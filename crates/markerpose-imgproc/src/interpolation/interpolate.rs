use super::bicubic::bicubic_interpolation;
use super::bilinear::bilinear_interpolation;
use markerpose_image::Image;

/// Interpolation mode for the resampling operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpolationMode {
    /// Bilinear interpolation
    Bilinear,
    /// Bicubic interpolation (Keys kernel, a = -0.75)
    Bicubic,
}

/// Kernel for interpolating a pixel value
///
/// # Arguments
///
/// * `image` - The input image container with shape (height, width, C).
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `c` - The channel of the pixel to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// # Returns
///
/// The interpolated pixel value.
pub fn interpolate_pixel<const C: usize>(
    image: &Image<f32, C>,
    u: f32,
    v: f32,
    c: usize,
    interpolation: InterpolationMode,
) -> f32 {
    match interpolation {
        InterpolationMode::Bilinear => bilinear_interpolation(image, u, v, c),
        InterpolationMode::Bicubic => bicubic_interpolation(image, u, v, c),
    }
}

/// Read a pixel channel, returning zero outside the image.
#[inline]
pub(crate) fn fetch<const C: usize>(image: &Image<f32, C>, x: i64, y: i64, c: usize) -> f32 {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return 0.0;
    }
    image.as_slice()[(y as usize * image.width() + x as usize) * C + c]
}
