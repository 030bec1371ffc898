use markerpose_aruco::{ArucoError, Dictionary, DetectorParameters, MarkerDetector};
use markerpose_camera::{CameraError, CameraModel, RawMatrix};
use markerpose_image::{Image, ImageSize};

const SIZE: usize = 100;

fn camera(fisheye: bool) -> Result<CameraModel, CameraError> {
    CameraModel::new(
        &RawMatrix {
            rows: 3,
            cols: 3,
            data: vec![100.0, 0.0, 50.0, 0.0, 100.0, 50.0, 0.0, 0.0, 1.0],
        },
        &[0.0; 4],
        ImageSize {
            width: SIZE,
            height: SIZE,
        },
        fisheye,
    )
}

fn white_image() -> Result<Image<u8, 3>, Box<dyn std::error::Error>> {
    Ok(Image::from_size_val(
        ImageSize {
            width: SIZE,
            height: SIZE,
        },
        255,
    )?)
}

// paste a 60 pixels marker at (20, 20), turned clockwise `turns` times
fn marker_image(
    dict: &Dictionary,
    id: u32,
    turns: usize,
) -> Result<Image<u8, 3>, Box<dyn std::error::Error>> {
    let side = 60;
    let marker = dict.render_marker(id, side)?;
    let mut img = white_image()?;
    for y in 0..side {
        for x in 0..side {
            let (mut sx, mut sy) = (x, y);
            for _ in 0..turns {
                (sx, sy) = (sy, side - 1 - sx);
            }
            let v = marker.get_pixel(sx, sy, 0)?;
            img.set_pixel(20 + x, 20 + y, [v, v, v])?;
        }
    }
    Ok(img)
}

// a fronto-parallel marker of side 0.1 at depth 0.2 seen through an
// equidistant fisheye lens, where the distorted radius is the ray angle
fn fisheye_marker_image(
    dict: &Dictionary,
    id: u32,
) -> Result<Image<u8, 3>, Box<dyn std::error::Error>> {
    let (length, depth, res) = (0.1, 0.2, 120);
    let marker = dict.render_marker(id, res)?;
    let mut img = white_image()?;
    for v in 0..SIZE {
        for u in 0..SIZE {
            let (xd, yd) = ((u as f64 - 50.0) / 100.0, (v as f64 - 50.0) / 100.0);
            let theta = (xd * xd + yd * yd).sqrt();
            let scale = if theta > 1e-12 { theta.tan() / theta } else { 1.0 };
            let mx = (xd * scale * depth + length / 2.0) / length;
            let my = (yd * scale * depth + length / 2.0) / length;
            if (0.0..1.0).contains(&mx) && (0.0..1.0).contains(&my) {
                let (sx, sy) = ((mx * res as f64) as usize, (my * res as f64) as usize);
                let p = marker.get_pixel(sx, sy, 0)?;
                img.set_pixel(u, v, [p, p, p])?;
            }
        }
    }
    Ok(img)
}

#[test]
fn detects_single_marker() -> Result<(), Box<dyn std::error::Error>> {
    let camera = camera(false)?;
    let dict = Dictionary::from_id(0)?;
    let image = marker_image(&dict, 23, 0)?;

    let detector = MarkerDetector::new(&camera, dict, DetectorParameters::default(), 0.1)?;
    let (detections, annotated) = detector.detect(&image, false)?;

    assert_eq!(detections.len(), 1);
    let detection = &detections[0];
    assert_eq!(detection.id, 23);
    assert!(detection.tvec[2] > 0.0);
    assert!((detection.tvec[2] - 0.17).abs() < 0.02);

    // facing the camera: the normal of the marker points back at it
    let normal = markerpose_3d::normal_from_rotation(detection.rvec);
    assert!(normal[2] < -0.99);

    assert_eq!(annotated.size(), image.size());
    assert_ne!(annotated.as_slice(), image.as_slice());
    Ok(())
}

#[test]
fn rotated_marker_keeps_its_corner_order() -> Result<(), Box<dyn std::error::Error>> {
    let camera = camera(false)?;
    let dict = Dictionary::from_id(0)?;
    let image = marker_image(&dict, 5, 1)?;

    let detector = MarkerDetector::new(&camera, dict, DetectorParameters::default(), 0.1)?;
    let (detections, _) = detector.detect(&image, false)?;

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].id, 5);
    // the top-left corner of the marker is now the top-right corner of the square
    let first = detections[0].corners[0];
    assert!((first[0] - 79.0).abs() < 1.0);
    assert!((first[1] - 20.0).abs() < 1.0);
    Ok(())
}

#[test]
fn empty_image_has_no_detections() -> Result<(), Box<dyn std::error::Error>> {
    let camera = camera(false)?;
    let detector = MarkerDetector::new(
        &camera,
        Dictionary::from_id(1)?,
        DetectorParameters::default(),
        0.1,
    )?;
    let image = white_image()?;

    let report = detector.detect_report(&image, false)?;
    assert!(report.detections.is_empty());
    assert!(report.rejected.is_empty());
    assert_eq!(report.annotated.as_slice(), image.as_slice());
    Ok(())
}

#[test]
fn detects_marker_through_fisheye() -> Result<(), Box<dyn std::error::Error>> {
    let camera = camera(true)?;
    let dict = Dictionary::from_id(0)?;
    let image = fisheye_marker_image(&dict, 42)?;

    let detector = MarkerDetector::new(&camera, dict, DetectorParameters::default(), 0.1)?;
    let (detections, annotated) = detector.detect(&image, false)?;

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].id, 42);
    let tz = detections[0].tvec[2];
    assert!(tz > 0.0);
    assert!((tz - 0.2).abs() < 0.03, "tz = {tz}");
    assert_eq!(annotated.size(), image.size());
    Ok(())
}

#[test]
fn fisheye_rejects_wrong_size() -> Result<(), Box<dyn std::error::Error>> {
    let camera = camera(true)?;
    let detector = MarkerDetector::new(
        &camera,
        Dictionary::from_id(0)?,
        DetectorParameters::default(),
        0.1,
    )?;
    let image = Image::<u8, 3>::from_size_val(
        ImageSize {
            width: 64,
            height: 48,
        },
        255,
    )?;

    assert!(matches!(
        detector.detect(&image, false),
        Err(ArucoError::Camera(CameraError::SizeMismatch { .. }))
    ));
    // already undistorted frames are used as they are
    let (detections, _) = detector.detect(&image, true)?;
    assert!(detections.is_empty());
    Ok(())
}
