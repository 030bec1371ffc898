use rayon::prelude::*;

use markerpose_image::{Image, ImageError, ImageSize};

/// Create a pair of coordinate maps by evaluating a function at every pixel.
///
/// # Arguments
///
/// * `cols` - The number of columns indicating the width of the grid
/// * `rows` - The number of rows indicating the height of the grid
/// * `f` - Maps a destination pixel (x, y) to its source coordinates.
///
/// # Returns
///
/// A tuple of single channel maps of shape (rows, cols) holding the x and y
/// source coordinates.
pub fn meshgrid_from_fn(
    cols: usize,
    rows: usize,
    f: impl Fn(usize, usize) -> (f32, f32) + Send + Sync,
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    let size = ImageSize {
        width: cols,
        height: rows,
    };
    let mut map_x = Image::<f32, 1>::from_size_val(size, 0.0)?;
    let mut map_y = Image::<f32, 1>::from_size_val(size, 0.0)?;

    map_x
        .as_slice_mut()
        .par_chunks_exact_mut(cols)
        .zip(map_y.as_slice_mut().par_chunks_exact_mut(cols))
        .enumerate()
        .for_each(|(y, (xarr, yarr))| {
            xarr.iter_mut()
                .zip(yarr.iter_mut())
                .enumerate()
                .for_each(|(x, (mx, my))| {
                    let (sx, sy) = f(x, y);
                    *mx = sx;
                    *my = sy;
                });
        });

    Ok((map_x, map_y))
}
