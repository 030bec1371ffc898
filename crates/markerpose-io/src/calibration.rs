use std::path::Path;

use markerpose_camera::{CameraError, CameraModel, RawMatrix};
use markerpose_image::ImageSize;
use serde::Deserialize;

use crate::error::IoError;

// `fisheye_model` is written either as a boolean or as an integer flag
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
}

impl FlagValue {
    fn is_set(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Int(i) => *i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalibrationFile {
    camera_matrix: Option<RawMatrix>,
    distortion_coefficients: Option<RawMatrix>,
    image_width: Option<i64>,
    image_height: Option<i64>,
    fisheye_model: Option<FlagValue>,
}

/// Remove the OpenCV specific parts of a `FileStorage` YAML document.
///
/// The `%YAML:1.0` directive and the `!!opencv-matrix` tags are not
/// understood by YAML parsers and are dropped.
pub fn strip_opencv_yaml(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim_start().starts_with('%'))
        .map(|line| line.replace("!!opencv-matrix", ""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn missing(field: &str) -> CameraError {
    CameraError::InvalidCalibration(format!("missing field {field}"))
}

fn dimension(field: &str, value: Option<i64>) -> Result<usize, CameraError> {
    let value = value.ok_or_else(|| missing(field))?;
    usize::try_from(value).map_err(|_| {
        CameraError::InvalidCalibration(format!("{field} must not be negative, got {value}"))
    })
}

/// Parse a camera calibration document.
///
/// The document holds `camera_matrix` (3x3), `distortion_coefficients` (four
/// values), `image_width`, `image_height` and an optional `fisheye_model` flag.
/// Other keys are ignored.
///
/// # Errors
///
/// Fails with [`CameraError::InvalidCalibration`] if a field is missing or malformed.
pub fn parse_calibration(contents: &str) -> Result<CameraModel, IoError> {
    let cleaned = strip_opencv_yaml(contents);
    let file: CalibrationFile = serde_yaml::from_str(&cleaned)
        .map_err(|e| CameraError::InvalidCalibration(e.to_string()))?;

    let camera_matrix = file
        .camera_matrix
        .ok_or_else(|| missing("camera_matrix"))?;
    let distortion = file
        .distortion_coefficients
        .ok_or_else(|| missing("distortion_coefficients"))?;
    if distortion.rows * distortion.cols != distortion.data.len() {
        return Err(CameraError::InvalidCalibration(format!(
            "distortion_coefficients holds {} values for a {}x{} matrix",
            distortion.data.len(),
            distortion.rows,
            distortion.cols
        ))
        .into());
    }

    let size = ImageSize {
        width: dimension("image_width", file.image_width)?,
        height: dimension("image_height", file.image_height)?,
    };
    let fisheye = file.fisheye_model.is_some_and(|f| f.is_set());

    log::debug!(
        "calibration {}x{}, fisheye: {fisheye}",
        size.width,
        size.height
    );

    Ok(CameraModel::new(
        &camera_matrix,
        &distortion.data,
        size,
        fisheye,
    )?)
}

/// Read a camera calibration file.
///
/// See [`parse_calibration`] for the expected content.
///
/// # Arguments
///
/// * `file_path` - The path to the calibration file.
pub fn read_calibration(file_path: impl AsRef<Path>) -> Result<CameraModel, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(file_path)?;
    parse_calibration(&contents)
}
