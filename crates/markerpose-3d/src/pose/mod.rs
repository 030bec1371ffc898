mod homography;
pub use homography::homography_4pt2d;

mod refine;
pub use refine::{refine_pose_lm, LMParams};

mod square;
pub use square::{solve_square_marker, square_object_points, MarkerPose};
