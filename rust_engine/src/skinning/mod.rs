//! 蒙皮权重与顶点蒙皮计算

mod geodesic;
mod skinning;
mod weights;

pub use geodesic::GeodesicTable;
pub use skinning::compute_skinning;
pub(crate) use skinning::skin_vertex;
pub use weights::{compute_weights, SkinningConfig, SkinningEngine, WeightStrategy};

use glam::{Mat4, Vec2};

/// 每个顶点最多受影响的骨骼数
pub const MAX_INFLUENCES: usize = 4;

/// 排名衰减：下限（先取 max）
const RANK_FLOORS: [f32; MAX_INFLUENCES] = [0.01, 0.01, 0.0, 0.0];
/// 排名衰减：缩放
const RANK_SCALES: [f32; MAX_INFLUENCES] = [1.0, 0.5, 0.25, 0.075];

/// 顶点骨骼权重（最多 4 个影响）
///
/// 前 count 个槽位有效，按原始权重降序排列，骨骼索引互不相同。
/// 排名衰减后总和不超过 1：第 2 名的下限可能触发整体缩放，
/// 此时第 1 名最多比原值小 0.005（单骨骼时为 0.995 而不是 1）。
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoneWeight {
    pub bones: [u32; MAX_INFLUENCES],
    pub weights: [f32; MAX_INFLUENCES],
    pub count: usize,
}

impl BoneWeight {
    /// 有效的 (骨骼, 权重) 对
    pub fn influences(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.bones
            .iter()
            .copied()
            .zip(self.weights.iter().copied())
            .take(self.count)
    }

    /// 权重和
    pub fn total(&self) -> f32 {
        self.weights[..self.count].iter().sum()
    }

    /// 排名第一的骨骼
    pub fn dominant(&self) -> Option<(u32, f32)> {
        self.influences().next()
    }

    /// 应用固定的排名衰减曲线
    ///
    /// 第 1 名下限 0.01，第 2 名下限 0.01 后乘 0.5，第 3、4 名分别乘 0.25 和 0.075。
    /// 下限可能让总和略超过 1，此时整体缩放回 1。
    pub(crate) fn apply_rank_dampening(&mut self) {
        for rank in 0..self.count {
            self.weights[rank] = self.weights[rank].max(RANK_FLOORS[rank]) * RANK_SCALES[rank];
        }

        let total = self.total();
        if total > 1.0 {
            for w in &mut self.weights[..self.count] {
                *w /= total;
            }
        }
    }
}

/// 蒙皮输入数据
pub struct SkinningInput<'a> {
    /// 网格空间中的原始顶点位置
    pub positions: &'a [Vec2],
    /// 顶点权重
    pub weights: &'a [BoneWeight],
    /// 骨骼变换矩阵（已乘以绑定矩阵）
    pub bone_matrices: &'a [Mat4],
}
