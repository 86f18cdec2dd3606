//! 逐帧关节位置数据

use glam::Vec2;

use crate::{RigError, Result};

/// 动画帧序列：每帧是一组关节目标位置
///
/// 构建时不校验每帧的关节数量，错误的帧在播放时跳过。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationFrames {
    frames: Vec<Vec<Vec2>>,
}

impl AnimationFrames {
    pub fn new(frames: Vec<Vec<Vec2>>) -> Result<Self> {
        if frames.is_empty() {
            return Err(RigError::Config("animation has no frames".to_string()));
        }
        Ok(Self { frames })
    }

    /// 只有一帧的静态动画
    pub fn still(pose: Vec<Vec2>) -> Self {
        Self { frames: vec![pose] }
    }

    /// 获取帧数
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 获取某一帧的关节位置
    pub fn frame(&self, index: usize) -> Option<&[Vec2]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    /// 关节数量与 joint_count 不一致的帧索引
    pub fn mismatched_frames(&self, joint_count: usize) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.len() != joint_count)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Vec2]> {
        self.frames.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_access() {
        let frames = AnimationFrames::new(vec![vec![Vec2::ZERO, Vec2::X], vec![Vec2::Y]]).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames.frame(0).map(<[Vec2]>::len), Some(2));
        assert!(frames.frame(2).is_none());
        assert_eq!(frames.mismatched_frames(2), vec![1]);
        assert_eq!(frames.iter().count(), 2);
    }

    #[test]
    fn test_empty_is_config_error() {
        assert!(matches!(AnimationFrames::new(Vec::new()), Err(RigError::Config(_))));
        assert_eq!(AnimationFrames::still(vec![Vec2::ZERO]).len(), 1);
    }
}
