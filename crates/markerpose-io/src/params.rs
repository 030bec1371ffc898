use std::path::Path;

use markerpose_aruco::{DetectorParameters, DetectorParametersFile};

use crate::{calibration::strip_opencv_yaml, error::IoError};

/// Parse a detector parameters document.
///
/// Keys are the OpenCV parameter names (`adaptiveThreshWinSizeMin`, ...).
/// Absent keys keep their default value and an empty document yields the
/// defaults.
///
/// # Errors
///
/// Fails on unknown keys, values of the wrong type or out of range values.
pub fn parse_detector_params(contents: &str) -> Result<DetectorParameters, IoError> {
    let cleaned = strip_opencv_yaml(contents);
    if cleaned
        .lines()
        .all(|l| l.trim().is_empty() || l.trim() == "---" || l.trim_start().starts_with('#'))
    {
        return Ok(DetectorParameters::default());
    }

    let file: DetectorParametersFile = serde_yaml::from_str(&cleaned)?;
    Ok(DetectorParameters::try_from(&file)?)
}

/// Read a detector parameters file.
///
/// See [`parse_detector_params`].
pub fn read_detector_params(file_path: impl AsRef<Path>) -> Result<DetectorParameters, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(file_path)?;
    parse_detector_params(&contents)
}
