//! 关节节点

use glam::{Mat4, Vec2};

/// 关节（骨骼）
#[derive(Clone, Debug)]
pub struct Joint {
    /// 名称（仅用于显示）
    pub name: String,
    /// 父关节索引，根关节为 None
    pub parent: Option<usize>,
    /// 初始位置（A-pose，世界空间）
    pub rest_position: Vec2,
    /// 相对于父关节的初始偏移（在 SkeletonBuilder::build 中计算）
    pub rest_offset: Vec2,
}

impl Joint {
    pub fn new(name: impl Into<String>, rest_position: Vec2) -> Self {
        Self {
            name: name.into(),
            parent: None,
            rest_position,
            rest_offset: rest_position,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// 数据集中的父索引表示（根为 -1）
    pub fn parent_index(&self) -> i32 {
        self.parent.map_or(-1, |p| p as i32)
    }

    /// 初始全局变换：A-pose 下关节没有旋转，只有平移
    pub fn rest_world_transform(&self) -> Mat4 {
        Mat4::from_translation(self.rest_position.extend(0.0))
    }
}
