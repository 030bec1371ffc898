#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use markerpose_image as image;

#[doc(inline)]
pub use markerpose_imgproc as imgproc;

#[doc(inline)]
pub use markerpose_3d as k3d;

#[doc(inline)]
pub use markerpose_camera as camera;

#[doc(inline)]
pub use markerpose_aruco as aruco;

#[doc(inline)]
pub use markerpose_io as io;
