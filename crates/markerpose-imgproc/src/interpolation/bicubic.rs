use super::interpolate::fetch;
use markerpose_image::Image;

const A: f32 = -0.75;

/// Cubic convolution weights for the four taps around a fractional offset.
fn cubic_weights(t: f32) -> [f32; 4] {
    let w0 = ((A * (t + 1.0) - 5.0 * A) * (t + 1.0) + 8.0 * A) * (t + 1.0) - 4.0 * A;
    let w1 = ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0;
    let w2 = ((A + 2.0) * (1.0 - t) - (A + 3.0)) * (1.0 - t) * (1.0 - t) + 1.0;
    let w3 = 1.0 - w0 - w1 - w2;
    [w0, w1, w2, w3]
}

/// Kernel for bicubic interpolation over a 4x4 neighbourhood.
pub(crate) fn bicubic_interpolation<const C: usize>(
    image: &Image<f32, C>,
    u: f32,
    v: f32,
    c: usize,
) -> f32 {
    let iu = u.floor();
    let iv = v.floor();
    let wx = cubic_weights(u - iu);
    let wy = cubic_weights(v - iv);
    let (x0, y0) = (iu as i64 - 1, iv as i64 - 1);

    let mut acc = 0.0;
    for (j, wyj) in wy.iter().enumerate() {
        let mut row = 0.0;
        for (i, wxi) in wx.iter().enumerate() {
            row += wxi * fetch(image, x0 + i as i64, y0 + j as i64, c);
        }
        acc += wyj * row;
    }
    acc
}
