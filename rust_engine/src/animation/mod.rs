//! 动画系统
//!
//! 提供帧时钟、逐帧关节数据和姿态重定向。

mod clock;
mod frames;
mod retargeter;
mod rotation;

pub use clock::AnimationClock;
pub use frames::AnimationFrames;
pub use retargeter::{Playback, PoseRetargeter, PoseState, RetargetConfig, Smoothing};
pub use rotation::{derive_rotation, signed_angle, RotationMode, RotationPolicy};
