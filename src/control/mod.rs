/*
    Control Algorithms
*/

pub mod gear_ratio;
pub mod pid_control;
pub mod motion_profile;
pub mod stall_detector;

pub use gear_ratio::*;
pub use pid_control::*;
pub use motion_profile::*;
pub use stall_detector::*;
