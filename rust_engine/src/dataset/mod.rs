//! 动画数据集导入
//!
//! 数据集是逐帧采样的 2D 关节动画，JSON 字段：
//! - `vertices_uv`：每个顶点至少 2 个浮点数（位置），第 3、4 个为 UV（可选）
//! - `triangles`：三角形顶点索引
//! - `joints_names` / `joints_parents` / `a_pose_joints`：骨架
//! - `joints`：每帧每个关节的位置
//! - `joints_order`：每帧的关节绘制顺序（可选，核心不使用）

mod correction;
mod loader;

pub use correction::{CoordinateCorrection, DatasetCorrections};
pub use loader::{load_dataset, parse_dataset};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationFrames;
use crate::mesh::Mesh;
use crate::skeleton::{Skeleton, SkeletonBuilder, SkeletonError};
use crate::{RigError, Result};

/// 原始数据集
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimDataset {
    pub vertices_uv: Vec<Vec<f32>>,
    pub triangles: Vec<[u32; 3]>,
    pub joints_names: Vec<String>,
    pub joints_parents: Vec<i32>,
    pub a_pose_joints: Vec<Vec<f32>>,
    /// 逐帧关节位置
    pub joints: Vec<Vec<Vec<f32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joints_order: Option<Vec<Vec<i32>>>,
}

/// 读取前两个分量
fn point(values: &[f32], what: &str, index: usize) -> Result<Vec2> {
    match values {
        [x, y, ..] => Ok(Vec2::new(*x, *y)),
        _ => Err(RigError::DatasetParse(format!(
            "{what} {index} has {} components, expected at least 2",
            values.len()
        ))),
    }
}

fn points(entries: &[Vec<f32>], what: &str, correction: &CoordinateCorrection) -> Result<Vec<Vec2>> {
    let mut out = entries
        .iter()
        .enumerate()
        .map(|(i, v)| point(v, what, i))
        .collect::<Result<Vec<_>>>()?;
    correction.apply_all(&mut out);
    Ok(out)
}

impl AnimDataset {
    /// 获取顶点数量
    pub fn vertex_count(&self) -> usize {
        self.vertices_uv.len()
    }

    /// 获取关节数量
    pub fn joint_count(&self) -> usize {
        self.joints_names.len()
    }

    /// 获取帧数
    pub fn frame_count(&self) -> usize {
        self.joints.len()
    }

    /// 构建网格，顶点和 UV 各自按修正处理
    pub fn mesh(&self, corrections: &DatasetCorrections) -> Result<Mesh> {
        let vertices = points(&self.vertices_uv, "vertex", &corrections.vertices)?;
        Ok(Mesh::new(vertices, self.triangles.clone())?.with_uvs(self.uvs(&corrections.uvs)))
    }

    /// 纹理坐标：有第 3、4 个分量时取之，否则取原始位置，再应用修正
    pub fn uvs(&self, correction: &CoordinateCorrection) -> Vec<Vec2> {
        let mut uvs: Vec<Vec2> = self
            .vertices_uv
            .iter()
            .map(|v| match v.as_slice() {
                [_, _, u, w, ..] => Vec2::new(*u, *w),
                [x, y, ..] => Vec2::new(*x, *y),
                _ => Vec2::ZERO,
            })
            .collect();
        correction.apply_all(&mut uvs);
        uvs
    }

    /// A-pose 关节位置
    pub fn rest_pose(&self, correction: &CoordinateCorrection) -> Result<Vec<Vec2>> {
        points(&self.a_pose_joints, "rest joint", correction)
    }

    /// 构建骨架
    pub fn skeleton(&self, correction: &CoordinateCorrection) -> Result<Skeleton> {
        let rest = self.rest_pose(correction)?;
        let skeleton = SkeletonBuilder::build(&self.joints_names, &self.joints_parents, &rest)
            .inspect_err(|e| {
                if let SkeletonError::ParentAfterChild { joint, parent } = e {
                    log::warn!(
                        "关节 {} ({}) 的父关节 {} 排在其后",
                        joint,
                        self.joints_names.get(*joint).map_or("?", String::as_str),
                        parent
                    );
                }
            })?;
        Ok(skeleton)
    }

    /// 逐帧关节位置
    ///
    /// 关节数量不对的帧原样保留，由重定向器在播放时跳过。
    pub fn frames(&self, correction: &CoordinateCorrection) -> Result<AnimationFrames> {
        let frames = self
            .joints
            .iter()
            .enumerate()
            .map(|(i, frame)| points(frame, &format!("frame {i} joint"), correction))
            .collect::<Result<Vec<_>>>()?;
        AnimationFrames::new(frames)
    }
}
