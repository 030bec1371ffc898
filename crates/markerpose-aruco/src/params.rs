use serde::{Deserialize, Serialize};

use crate::error::ArucoError;

/// How the marker corners are refined after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CornerRefinementMethod {
    /// Keep the polygon corners.
    #[default]
    None,
    /// Gradient based sub-pixel refinement.
    Subpix,
}

impl TryFrom<i32> for CornerRefinementMethod {
    type Error = ArucoError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Subpix),
            _ => Err(ArucoError::InvalidConfig(format!(
                "cornerRefinementMethod {value} is not supported, use 0 (none) or 1 (subpix)"
            ))),
        }
    }
}

impl From<CornerRefinementMethod> for i32 {
    fn from(value: CornerRefinementMethod) -> Self {
        match value {
            CornerRefinementMethod::None => 0,
            CornerRefinementMethod::Subpix => 1,
        }
    }
}

/// Tuning parameters of the marker detector.
///
/// The defaults match the OpenCV `DetectorParameters`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorParameters {
    /// Smallest adaptive threshold window, in pixels.
    pub adaptive_thresh_win_size_min: usize,
    /// Largest adaptive threshold window, in pixels.
    pub adaptive_thresh_win_size_max: usize,
    /// Increment between two adaptive threshold windows.
    pub adaptive_thresh_win_size_step: usize,
    /// Constant subtracted from the window mean.
    pub adaptive_thresh_constant: f64,
    /// Minimum marker perimeter relative to the largest image dimension.
    pub min_marker_perimeter_rate: f64,
    /// Maximum marker perimeter relative to the largest image dimension.
    pub max_marker_perimeter_rate: f64,
    /// Polygon approximation tolerance relative to the contour perimeter.
    pub polygonal_approx_accuracy_rate: f64,
    /// Minimum distance between two corners relative to the perimeter.
    pub min_corner_distance_rate: f64,
    /// Minimum distance of any corner to the image border, in pixels.
    pub min_distance_to_border: usize,
    /// Minimum mean corner distance between two markers relative to the perimeter.
    pub min_marker_distance_rate: f64,
    /// Corner refinement applied to decoded markers.
    pub corner_refinement_method: CornerRefinementMethod,
    /// Half size of the corner refinement window.
    pub corner_refinement_win_size: usize,
    /// Maximum number of corner refinement iterations.
    pub corner_refinement_max_iterations: usize,
    /// Corner refinement stops once a step is shorter than this, in pixels.
    pub corner_refinement_min_accuracy: f64,
    /// Width of the marker border, in cells.
    pub marker_border_bits: usize,
    /// Number of pixels per cell when removing the perspective.
    pub perspective_remove_pixel_per_cell: usize,
    /// Ratio of each cell side ignored on both sides when reading a bit.
    pub perspective_remove_ignored_margin_per_cell: f64,
    /// Maximum ratio of white border cells to the payload size.
    pub max_erroneous_bits_in_border_rate: f64,
    /// Below this standard deviation the cells are binarised with the mean.
    pub min_otsu_std_dev: f64,
    /// Ratio of the dictionary correction capacity that is used.
    pub error_correction_rate: f64,
}

impl Default for DetectorParameters {
    fn default() -> Self {
        Self {
            adaptive_thresh_win_size_min: 3,
            adaptive_thresh_win_size_max: 23,
            adaptive_thresh_win_size_step: 10,
            adaptive_thresh_constant: 7.0,
            min_marker_perimeter_rate: 0.03,
            max_marker_perimeter_rate: 4.0,
            polygonal_approx_accuracy_rate: 0.03,
            min_corner_distance_rate: 0.05,
            min_distance_to_border: 3,
            min_marker_distance_rate: 0.05,
            corner_refinement_method: CornerRefinementMethod::None,
            corner_refinement_win_size: 5,
            corner_refinement_max_iterations: 30,
            corner_refinement_min_accuracy: 0.1,
            marker_border_bits: 1,
            perspective_remove_pixel_per_cell: 4,
            perspective_remove_ignored_margin_per_cell: 0.13,
            max_erroneous_bits_in_border_rate: 0.35,
            min_otsu_std_dev: 5.0,
            error_correction_rate: 0.6,
        }
    }
}

impl DetectorParameters {
    /// The adaptive threshold window sizes, forced to odd values.
    pub fn window_sizes(&self) -> Vec<usize> {
        (self.adaptive_thresh_win_size_min..=self.adaptive_thresh_win_size_max)
            .step_by(self.adaptive_thresh_win_size_step.max(1))
            .map(|w| w | 1)
            .collect()
    }

    /// Check that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Fails with [`ArucoError::InvalidConfig`] naming the first offending parameter.
    pub fn validate(&self) -> Result<(), ArucoError> {
        fn check(ok: bool, message: &str) -> Result<(), ArucoError> {
            if ok {
                Ok(())
            } else {
                Err(ArucoError::InvalidConfig(message.to_string()))
            }
        }

        check(
            self.adaptive_thresh_win_size_min >= 3,
            "adaptiveThreshWinSizeMin must be at least 3",
        )?;
        check(
            self.adaptive_thresh_win_size_max >= self.adaptive_thresh_win_size_min,
            "adaptiveThreshWinSizeMax must not be smaller than adaptiveThreshWinSizeMin",
        )?;
        check(
            self.adaptive_thresh_win_size_step > 0,
            "adaptiveThreshWinSizeStep must be positive",
        )?;
        check(
            self.adaptive_thresh_constant.is_finite(),
            "adaptiveThreshConstant must be finite",
        )?;
        check(
            self.min_marker_perimeter_rate > 0.0
                && self.max_marker_perimeter_rate > self.min_marker_perimeter_rate,
            "marker perimeter rates must satisfy 0 < min < max",
        )?;
        check(
            self.polygonal_approx_accuracy_rate > 0.0,
            "polygonalApproxAccuracyRate must be positive",
        )?;
        check(
            self.min_corner_distance_rate >= 0.0,
            "minCornerDistanceRate must not be negative",
        )?;
        check(
            self.min_marker_distance_rate >= 0.0,
            "minMarkerDistanceRate must not be negative",
        )?;
        check(
            self.corner_refinement_win_size > 0,
            "cornerRefinementWinSize must be positive",
        )?;
        check(
            self.corner_refinement_max_iterations > 0,
            "cornerRefinementMaxIterations must be positive",
        )?;
        check(
            self.corner_refinement_min_accuracy > 0.0,
            "cornerRefinementMinAccuracy must be positive",
        )?;
        check(
            self.marker_border_bits > 0,
            "markerBorderBits must be positive",
        )?;
        check(
            self.perspective_remove_pixel_per_cell > 0,
            "perspectiveRemovePixelPerCell must be positive",
        )?;
        check(
            (0.0..0.5).contains(&self.perspective_remove_ignored_margin_per_cell),
            "perspectiveRemoveIgnoredMarginPerCell must be in [0, 0.5)",
        )?;
        check(
            self.max_erroneous_bits_in_border_rate >= 0.0,
            "maxErroneousBitsInBorderRate must not be negative",
        )?;
        check(
            self.min_otsu_std_dev >= 0.0,
            "minOtsuStdDev must not be negative",
        )?;
        check(
            (0.0..=1.0).contains(&self.error_correction_rate),
            "errorCorrectionRate must be in [0, 1]",
        )?;

        Ok(())
    }

    /// Apply the values present in a parameters file onto these parameters.
    ///
    /// # Errors
    ///
    /// Fails with [`ArucoError::InvalidConfig`] on negative counts or an
    /// unsupported corner refinement method.
    pub fn apply(&mut self, overrides: &DetectorParametersFile) -> Result<(), ArucoError> {
        fn count(name: &str, value: i64) -> Result<usize, ArucoError> {
            usize::try_from(value)
                .map_err(|_| ArucoError::InvalidConfig(format!("{name} must not be negative")))
        }

        let o = overrides;
        if let Some(v) = o.adaptive_thresh_win_size_min {
            self.adaptive_thresh_win_size_min = count("adaptiveThreshWinSizeMin", v)?;
        }
        if let Some(v) = o.adaptive_thresh_win_size_max {
            self.adaptive_thresh_win_size_max = count("adaptiveThreshWinSizeMax", v)?;
        }
        if let Some(v) = o.adaptive_thresh_win_size_step {
            self.adaptive_thresh_win_size_step = count("adaptiveThreshWinSizeStep", v)?;
        }
        if let Some(v) = o.adaptive_thresh_constant {
            self.adaptive_thresh_constant = v;
        }
        if let Some(v) = o.min_marker_perimeter_rate {
            self.min_marker_perimeter_rate = v;
        }
        if let Some(v) = o.max_marker_perimeter_rate {
            self.max_marker_perimeter_rate = v;
        }
        if let Some(v) = o.polygonal_approx_accuracy_rate {
            self.polygonal_approx_accuracy_rate = v;
        }
        if let Some(v) = o.min_corner_distance_rate {
            self.min_corner_distance_rate = v;
        }
        if let Some(v) = o.min_distance_to_border {
            self.min_distance_to_border = count("minDistanceToBorder", v)?;
        }
        if let Some(v) = o.min_marker_distance_rate {
            self.min_marker_distance_rate = v;
        }
        if let Some(v) = o.corner_refinement_method {
            self.corner_refinement_method = CornerRefinementMethod::try_from(v)?;
        }
        if let Some(v) = o.corner_refinement_win_size {
            self.corner_refinement_win_size = count("cornerRefinementWinSize", v)?;
        }
        if let Some(v) = o.corner_refinement_max_iterations {
            self.corner_refinement_max_iterations = count("cornerRefinementMaxIterations", v)?;
        }
        if let Some(v) = o.corner_refinement_min_accuracy {
            self.corner_refinement_min_accuracy = v;
        }
        if let Some(v) = o.marker_border_bits {
            self.marker_border_bits = count("markerBorderBits", v)?;
        }
        if let Some(v) = o.perspective_remove_pixel_per_cell {
            self.perspective_remove_pixel_per_cell = count("perspectiveRemovePixelPerCell", v)?;
        }
        if let Some(v) = o.perspective_remove_ignored_margin_per_cell {
            self.perspective_remove_ignored_margin_per_cell = v;
        }
        if let Some(v) = o.max_erroneous_bits_in_border_rate {
            self.max_erroneous_bits_in_border_rate = v;
        }
        if let Some(v) = o.min_otsu_std_dev {
            self.min_otsu_std_dev = v;
        }
        if let Some(v) = o.error_correction_rate {
            self.error_correction_rate = v;
        }

        Ok(())
    }
}

/// The detector parameters as written in a configuration file.
///
/// Keys use the OpenCV camelCase names, absent keys keep their default and
/// unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(missing_docs)]
pub struct DetectorParametersFile {
    pub adaptive_thresh_win_size_min: Option<i64>,
    pub adaptive_thresh_win_size_max: Option<i64>,
    pub adaptive_thresh_win_size_step: Option<i64>,
    pub adaptive_thresh_constant: Option<f64>,
    pub min_marker_perimeter_rate: Option<f64>,
    pub max_marker_perimeter_rate: Option<f64>,
    pub polygonal_approx_accuracy_rate: Option<f64>,
    pub min_corner_distance_rate: Option<f64>,
    pub min_distance_to_border: Option<i64>,
    pub min_marker_distance_rate: Option<f64>,
    pub corner_refinement_method: Option<i32>,
    pub corner_refinement_win_size: Option<i64>,
    pub corner_refinement_max_iterations: Option<i64>,
    pub corner_refinement_min_accuracy: Option<f64>,
    pub marker_border_bits: Option<i64>,
    pub perspective_remove_pixel_per_cell: Option<i64>,
    pub perspective_remove_ignored_margin_per_cell: Option<f64>,
    pub max_erroneous_bits_in_border_rate: Option<f64>,
    pub min_otsu_std_dev: Option<f64>,
    pub error_correction_rate: Option<f64>,
}

impl TryFrom<&DetectorParametersFile> for DetectorParameters {
    type Error = ArucoError;

    fn try_from(file: &DetectorParametersFile) -> Result<Self, Self::Error> {
        let mut params = DetectorParameters::default();
        params.apply(file)?;
        params.validate()?;
        Ok(params)
    }
}
