//! 骨架层级与绑定姿态

mod builder;
mod joint;

pub use builder::{compute_bind_pose, SkeletonBuilder, SkeletonError};
pub use joint::Joint;

use glam::Vec2;

/// 已校验的骨架：父索引数组 + 预计算的子节点索引
///
/// 不变量：关节 0 是唯一的根，其余关节的父索引小于自身索引。
#[derive(Clone, Debug)]
pub struct Skeleton {
    joints: Vec<Joint>,
    children: Vec<Vec<usize>>,
}

impl Skeleton {
    /// 只由 SkeletonBuilder 在校验后调用
    pub(crate) fn from_joints(joints: Vec<Joint>) -> Self {
        let mut children = vec![Vec::new(); joints.len()];
        for (i, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent {
                children[parent].push(i);
            }
        }
        Self { joints, children }
    }

    /// 获取关节数量
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// 获取关节
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.joints.get(index).and_then(|j| j.parent)
    }

    /// 直接子关节（按索引递增）
    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 通过名称查找关节
    pub fn find_joint_by_name(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// 所有关节的 A-pose 位置
    pub fn rest_positions(&self) -> Vec<Vec2> {
        self.joints.iter().map(|j| j.rest_position).collect()
    }

    /// 关节深度（根为 0）
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.parent(index);
        while let Some(p) = current {
            depth += 1;
            current = self.parent(p);
        }
        depth
    }

    pub fn max_depth(&self) -> usize {
        // 父索引小于子索引，一次正序遍历即可
        let mut depths = vec![0usize; self.joints.len()];
        for (i, joint) in self.joints.iter().enumerate() {
            if let Some(p) = joint.parent {
                depths[i] = depths[p] + 1;
            }
        }
        depths.into_iter().max().unwrap_or(0)
    }
}
