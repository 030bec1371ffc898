use markerpose_3d::{
    pose::{solve_square_marker, MarkerPose},
    PoseError,
};
use markerpose_camera::{CameraError, CameraModel};
use markerpose_image::Image;
use markerpose_imgproc::color::gray_from_rgb_u8;

use crate::{
    annotate::{draw_axes, draw_detected_markers},
    candidates::{detect_candidates, Quad},
    decode::{decode_candidate, DecodedMarker},
    dictionary::Dictionary,
    error::ArucoError,
    params::{CornerRefinementMethod, DetectorParameters},
    refine::refine_corners_subpix,
};

/// A marker found in an image with its pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// The marker id.
    pub id: u32,
    /// The image corners, starting at the top-left corner of the marker, clockwise.
    pub corners: Quad,
    /// The rotation vector from the marker to the camera frame.
    pub rvec: [f64; 3],
    /// The translation of the marker center in the camera frame, in the unit of the marker length.
    pub tvec: [f64; 3],
}

/// The decoded markers and the rejected candidates of an image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerDetections {
    /// The decoded markers.
    pub markers: Vec<DecodedMarker>,
    /// The quadrilaterals that could not be decoded.
    pub rejected: Vec<Quad>,
}

/// The full output of [`MarkerDetector::detect_report`].
#[derive(Debug, Clone)]
pub struct DetectionReport {
    /// The markers with a valid pose.
    pub detections: Vec<Detection>,
    /// The quadrilaterals that could not be decoded.
    pub rejected: Vec<Quad>,
    /// The (undistorted) image with the detections drawn on it.
    pub annotated: Image<u8, 3>,
}

/// Detects markers of a dictionary and estimates their pose.
///
/// The detector borrows the camera model, which is never modified and can
/// be shared by several detectors.
#[derive(Debug, Clone)]
pub struct MarkerDetector<'a> {
    camera: &'a CameraModel,
    dictionary: Dictionary,
    params: DetectorParameters,
    marker_length: f64,
}

impl<'a> MarkerDetector<'a> {
    /// Create a new detector.
    ///
    /// # Arguments
    ///
    /// * `camera` - The calibrated camera.
    /// * `dictionary` - The dictionary of the markers to find.
    /// * `params` - The detector parameters.
    /// * `marker_length` - The side of the markers, in the unit of the output translations.
    ///
    /// # Errors
    ///
    /// Fails with [`ArucoError::InvalidConfig`] if the marker length is not
    /// positive or a parameter is out of range.
    pub fn new(
        camera: &'a CameraModel,
        dictionary: Dictionary,
        params: DetectorParameters,
        marker_length: f64,
    ) -> Result<Self, ArucoError> {
        if !(marker_length.is_finite() && marker_length > 0.0) {
            return Err(ArucoError::InvalidConfig(format!(
                "marker length must be positive, got {marker_length}"
            )));
        }
        params.validate()?;

        Ok(Self {
            camera,
            dictionary,
            params,
            marker_length,
        })
    }

    /// The camera model.
    pub fn camera(&self) -> &CameraModel {
        self.camera
    }

    /// The marker dictionary.
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// The detector parameters.
    pub fn params(&self) -> &DetectorParameters {
        &self.params
    }

    /// The marker side length.
    pub fn marker_length(&self) -> f64 {
        self.marker_length
    }

    /// Find and decode the markers of a grayscale image.
    pub fn detect_markers(&self, gray: &Image<u8, 1>) -> Result<MarkerDetections, ArucoError> {
        let candidates = detect_candidates(gray, &self.params)?;
        let gray_f32 = gray.cast::<f32>()?;

        let mut detections = MarkerDetections::default();
        for candidate in candidates {
            match decode_candidate(&gray_f32, &candidate.corners, &self.dictionary, &self.params) {
                Some(marker) => detections.markers.push(marker),
                None => detections.rejected.push(candidate.corners),
            }
        }

        if self.params.corner_refinement_method == CornerRefinementMethod::Subpix {
            for marker in detections.markers.iter_mut() {
                refine_corners_subpix(
                    &gray_f32,
                    &mut marker.corners,
                    self.params.corner_refinement_win_size,
                    self.params.corner_refinement_max_iterations,
                    self.params.corner_refinement_min_accuracy,
                );
            }
        }

        Ok(detections)
    }

    /// Estimate the pose of a decoded marker with the effective camera intrinsics.
    pub fn estimate_pose(&self, marker: &DecodedMarker) -> Result<MarkerPose, PoseError> {
        solve_square_marker(
            &marker.corners,
            self.marker_length,
            self.camera.effective_intrinsic(),
            self.camera.effective_distortion(),
        )
    }

    // markers whose pose fails are dropped, the others are kept
    fn estimate_poses(&self, markers: Vec<DecodedMarker>) -> Vec<Detection> {
        let mut detections = Vec::with_capacity(markers.len());
        for marker in markers {
            match self.estimate_pose(&marker) {
                Ok(pose) => detections.push(Detection {
                    id: marker.id,
                    corners: marker.corners,
                    rvec: pose.rvec,
                    tvec: pose.tvec,
                }),
                Err(err) => log::debug!("skipping marker {}: {err}", marker.id),
            }
        }
        detections
    }

    /// Detect the markers of an RGB image and estimate their poses.
    ///
    /// Images of fisheye cameras are undistorted first unless
    /// `already_undistorted` is set. Images of pinhole cameras are used as they
    /// are and their distortion is accounted for during pose estimation.
    /// Markers whose pose cannot be estimated are skipped.
    ///
    /// # Errors
    ///
    /// Fails with [`CameraError::SizeMismatch`] if the image does not have the
    /// calibrated size.
    pub fn detect_report(
        &self,
        image: &Image<u8, 3>,
        already_undistorted: bool,
    ) -> Result<DetectionReport, ArucoError> {
        let frame = if already_undistorted {
            image.clone()
        } else if self.camera.is_fisheye() {
            self.camera.undistort(image)?
        } else {
            if image.size() != self.camera.size() {
                return Err(CameraError::SizeMismatch {
                    expected: self.camera.size(),
                    actual: image.size(),
                }
                .into());
            }
            image.clone()
        };

        let mut gray = Image::<u8, 1>::from_size_val(frame.size(), 0)?;
        gray_from_rgb_u8(&frame, &mut gray)?;

        let MarkerDetections { markers, rejected } = self.detect_markers(&gray)?;
        let detections = self.estimate_poses(markers);

        log::debug!(
            "{} markers detected, {} candidates rejected",
            detections.len(),
            rejected.len()
        );

        let mut annotated = frame;
        if !detections.is_empty() {
            draw_detected_markers(&mut annotated, &detections);
            for detection in detections.iter() {
                draw_axes(
                    &mut annotated,
                    &detection.rvec,
                    &detection.tvec,
                    self.camera.effective_intrinsic(),
                    self.camera.effective_distortion(),
                    self.marker_length * 0.5,
                );
            }
        }

        Ok(DetectionReport {
            detections,
            rejected,
            annotated,
        })
    }

    /// Detect the markers of an RGB image and return them with an annotated copy of the image.
    ///
    /// See [`MarkerDetector::detect_report`].
    pub fn detect(
        &self,
        image: &Image<u8, 3>,
        already_undistorted: bool,
    ) -> Result<(Vec<Detection>, Image<u8, 3>), ArucoError> {
        let report = self.detect_report(image, already_undistorted)?;
        Ok((report.detections, report.annotated))
    }
}
