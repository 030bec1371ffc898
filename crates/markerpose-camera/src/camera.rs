use markerpose_image::{Image, ImageSize};
use markerpose_imgproc::{
    calibration::{
        distortion::PolynomialDistortion,
        fisheye::{
            estimate_new_camera_matrix_fisheye, generate_correction_map_fisheye,
            FisheyeDistortion,
        },
        CameraIntrinsic,
    },
    interpolation::{remap, InterpolationMode},
};

use crate::error::CameraError;

/// Balance between keeping all source pixels and cropping invalid ones.
const FISHEYE_BALANCE: f64 = 1.0;

/// A dense matrix as stored in calibration files.
///
/// The data is stored row-major.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawMatrix {
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
    /// The matrix values in row-major order.
    pub data: Vec<f64>,
}

impl RawMatrix {
    /// Convert into a 3x3 row-major array.
    ///
    /// # Errors
    ///
    /// Fails with [`CameraError::InvalidCalibration`] if the matrix is not 3x3.
    pub fn to_mat33(&self) -> Result<[[f64; 3]; 3], CameraError> {
        if self.rows != 3 || self.cols != 3 {
            return Err(CameraError::InvalidCalibration(format!(
                "camera matrix must be 3x3, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.data.len() != 9 {
            return Err(CameraError::InvalidCalibration(format!(
                "camera matrix holds {} values, expected 9",
                self.data.len()
            )));
        }
        let d = &self.data;
        Ok([[d[0], d[1], d[2]], [d[3], d[4], d[5]], [d[6], d[7], d[8]]])
    }
}

/// A calibrated camera.
///
/// For fisheye lenses the rectified camera matrix and the undistortion maps
/// are computed once at construction. Pinhole cameras keep their raw
/// intrinsics and the distortion is handled during pose estimation.
#[derive(Debug, Clone)]
pub struct CameraModel {
    intrinsic: CameraIntrinsic,
    coefficients: [f64; 4],
    size: ImageSize,
    fisheye: bool,
    effective_intrinsic: CameraIntrinsic,
    effective_distortion: PolynomialDistortion,
    correction_map: Option<(Image<f32, 1>, Image<f32, 1>)>,
}

impl CameraModel {
    /// Create a camera model from calibration data.
    ///
    /// # Arguments
    ///
    /// * `camera_matrix` - The 3x3 intrinsic matrix.
    /// * `distortion` - The 4 distortion coefficients, `(k1, k2, p1, p2)` for
    ///   pinhole cameras or `(k1, k2, k3, k4)` for fisheye cameras.
    /// * `size` - The size of the calibrated images.
    /// * `fisheye` - Whether the lens follows the fisheye model.
    ///
    /// # Errors
    ///
    /// Fails with [`CameraError::InvalidCalibration`] when the matrix is not
    /// 3x3, the coefficients are not exactly 4 or the size is empty.
    pub fn new(
        camera_matrix: &RawMatrix,
        distortion: &[f64],
        size: ImageSize,
        fisheye: bool,
    ) -> Result<Self, CameraError> {
        let k = camera_matrix.to_mat33()?;

        let coefficients: [f64; 4] = distortion.try_into().map_err(|_| {
            CameraError::InvalidCalibration(format!(
                "expected 4 distortion coefficients, got {}",
                distortion.len()
            ))
        })?;

        if size.width == 0 || size.height == 0 {
            return Err(CameraError::InvalidCalibration(format!(
                "image size must be positive, got {size}"
            )));
        }

        if k.iter().flatten().chain(coefficients.iter()).any(|v| !v.is_finite()) {
            return Err(CameraError::InvalidCalibration(
                "calibration values must be finite".to_string(),
            ));
        }

        let intrinsic = CameraIntrinsic::from_matrix(&k);
        if intrinsic.fx <= 0.0 || intrinsic.fy <= 0.0 {
            return Err(CameraError::InvalidCalibration(format!(
                "focal lengths must be positive, got fx={} fy={}",
                intrinsic.fx, intrinsic.fy
            )));
        }

        if !fisheye {
            return Ok(Self {
                intrinsic,
                coefficients,
                size,
                fisheye,
                effective_intrinsic: intrinsic,
                effective_distortion: PolynomialDistortion::from_coefficients(coefficients),
                correction_map: None,
            });
        }

        let fisheye_distortion = FisheyeDistortion::from_coefficients(coefficients);
        let new_intrinsic = estimate_new_camera_matrix_fisheye(
            &intrinsic,
            &fisheye_distortion,
            &size,
            FISHEYE_BALANCE,
        );

        let new_k = new_intrinsic.to_matrix();
        if new_k.iter().flatten().any(|v| !v.is_finite()) || new_intrinsic.fx <= 0.0 {
            return Err(CameraError::InvalidCalibration(format!(
                "fisheye rectification is degenerate: {new_intrinsic:?}"
            )));
        }

        let (map_x, map_y) =
            generate_correction_map_fisheye(&intrinsic, &new_intrinsic, &fisheye_distortion, &size)?;

        log::debug!(
            "fisheye camera {size}: rectified fx={:.3} fy={:.3} cx={:.3} cy={:.3}",
            new_intrinsic.fx,
            new_intrinsic.fy,
            new_intrinsic.cx,
            new_intrinsic.cy
        );

        Ok(Self {
            intrinsic,
            coefficients,
            size,
            fisheye,
            effective_intrinsic: new_intrinsic,
            effective_distortion: PolynomialDistortion::default(),
            correction_map: Some((map_x, map_y)),
        })
    }

    /// The calibrated intrinsics.
    pub fn intrinsic(&self) -> &CameraIntrinsic {
        &self.intrinsic
    }

    /// The calibrated distortion coefficients.
    pub fn coefficients(&self) -> [f64; 4] {
        self.coefficients
    }

    /// The calibrated image size.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Whether the camera uses the fisheye model.
    pub fn is_fisheye(&self) -> bool {
        self.fisheye
    }

    /// Rebuild the model from the same calibration with the given lens model.
    pub fn with_fisheye(&self, fisheye: bool) -> Result<Self, CameraError> {
        let k = self.intrinsic.to_matrix();
        let camera_matrix = RawMatrix {
            rows: 3,
            cols: 3,
            data: k.iter().flatten().copied().collect(),
        };
        Self::new(&camera_matrix, &self.coefficients, self.size, fisheye)
    }

    /// The intrinsics to use for pose estimation on images returned by [`CameraModel::undistort`].
    ///
    /// This is the rectified camera matrix for fisheye cameras and the raw
    /// one otherwise.
    pub fn effective_intrinsic(&self) -> &CameraIntrinsic {
        &self.effective_intrinsic
    }

    /// The distortion to use for pose estimation, zero for fisheye cameras.
    pub fn effective_distortion(&self) -> &PolynomialDistortion {
        &self.effective_distortion
    }

    /// The x and y undistortion maps, only available for fisheye cameras.
    pub fn correction_map(&self) -> Option<(&Image<f32, 1>, &Image<f32, 1>)> {
        self.correction_map.as_ref().map(|(x, y)| (x, y))
    }

    /// Undistort an RGB image with the precomputed maps.
    ///
    /// Pixels mapping outside the source image are filled with zeros.
    ///
    /// # Errors
    ///
    /// * [`CameraError::SizeMismatch`] if the image size differs from the calibrated one.
    /// * [`CameraError::UnsupportedUndistortion`] for pinhole cameras.
    pub fn undistort(&self, image: &Image<u8, 3>) -> Result<Image<u8, 3>, CameraError> {
        if image.size() != self.size {
            return Err(CameraError::SizeMismatch {
                expected: self.size,
                actual: image.size(),
            });
        }

        let (map_x, map_y) = self
            .correction_map
            .as_ref()
            .ok_or(CameraError::UnsupportedUndistortion)?;

        let src = image.cast::<f32>()?;
        let mut dst = Image::<f32, 3>::from_size_val(self.size, 0.0)?;
        remap(&src, &mut dst, map_x, map_y, InterpolationMode::Bicubic)?;

        // saturate like an 8-bit remap
        let data = dst
            .as_slice()
            .iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect();

        Ok(Image::new(self.size, data)?)
    }
}
