use markerpose_3d::{aggregate, twist_tilt_decompose, REFERENCE_NORMAL, TARGET_NORMAL};
use markerpose_aruco::{Dictionary, MarkerDetector};
use markerpose_image::{Image, ImageSize};
use markerpose_io::{
    calibration::read_calibration,
    functional::{read_image_any_rgb8, write_image_rgb8},
    params::read_detector_params,
    table::{write_pose_table, write_twist_rows, PoseRow, Table, ROTATION_COLUMNS},
    IoError,
};

const CALIBRATION: &str = "%YAML:1.0
---
image_width: 120
image_height: 120
camera_matrix: !!opencv-matrix
   rows: 3
   cols: 3
   dt: d
   data: [ 120., 0., 60., 0., 120., 60., 0., 0., 1. ]
distortion_coefficients: !!opencv-matrix
   rows: 4
   cols: 1
   dt: d
   data: [ 0., 0., 0., 0. ]
fisheye_model: 0
";

fn marker_frame(id: u32) -> Result<Image<u8, 3>, Box<dyn std::error::Error>> {
    let dict = Dictionary::from_id(0)?;
    let marker = dict.render_marker(id, 60)?;
    let mut img = Image::<u8, 3>::from_size_val(
        ImageSize {
            width: 120,
            height: 120,
        },
        255,
    )?;
    for y in 0..60 {
        for x in 0..60 {
            let v = marker.get_pixel(x, y, 0)?;
            img.set_pixel(30 + x, 30 + y, [v, v, v])?;
        }
    }
    Ok(img)
}

#[test]
fn detect_files_and_aggregate() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let dir = tmp_dir.path();

    std::fs::write(dir.join("calib.yml"), CALIBRATION)?;
    std::fs::write(dir.join("params.yml"), "cornerRefinementMethod: 0\n")?;
    for (i, id) in [4, 9].iter().enumerate() {
        write_image_rgb8(dir.join(format!("img{i}.png")), &marker_frame(*id)?)?;
    }

    let camera = read_calibration(dir.join("calib.yml"))?;
    let params = read_detector_params(dir.join("params.yml"))?;
    let detector = MarkerDetector::new(&camera, Dictionary::from_id(0)?, params, 0.05)?;

    let mut rows = Vec::new();
    for i in 0..2 {
        let image = read_image_any_rgb8(dir.join(format!("img{i}.png")))?;
        let (detections, _) = detector.detect(&image, false)?;
        rows.extend(detections.iter().map(PoseRow::from));
    }
    assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), [4, 9]);

    let table_path = dir.join("poses.csv");
    write_pose_table(&table_path, &rows)?;

    let table = Table::read(&table_path)?;
    let rvecs = table.vectors(ROTATION_COLUMNS)?;
    let estimate = aggregate(&rvecs)?;
    // both markers face the camera
    assert!(estimate.mean_normal[2] < -0.99);
    assert!(estimate.variance.iter().all(|v| *v < 1e-3));

    let angles = rvecs
        .iter()
        .map(|r| twist_tilt_decompose(*r, TARGET_NORMAL, REFERENCE_NORMAL))
        .collect::<Vec<_>>();
    let mut buf = Vec::new();
    write_twist_rows(&mut buf, &table, &angles)?;
    let twist = Table::from_reader(buf.as_slice())?;
    for tilt in twist.column_f64("rotation_to_normal")? {
        assert!(tilt < 0.1);
    }
    Ok(())
}

#[test]
fn missing_calibration_file() {
    assert!(matches!(
        read_calibration("no/such/calib.yml"),
        Err(IoError::FileDoesNotExist(_))
    ));
}
