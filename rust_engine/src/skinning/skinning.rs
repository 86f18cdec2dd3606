//! 顶点蒙皮计算（线性混合蒙皮）

use glam::{Mat4, Vec2};

use super::{BoneWeight, SkinningInput};

/// 计算蒙皮
///
/// 权重按原样使用，不再归一化。
pub fn compute_skinning(input: &SkinningInput) -> Vec<Vec2> {
    input
        .positions
        .iter()
        .zip(input.weights)
        .map(|(&position, weight)| skin_vertex(position, weight, input.bone_matrices))
        .collect()
}

/// 计算单个顶点的蒙皮
pub(crate) fn skin_vertex(position: Vec2, weight: &BoneWeight, matrices: &[Mat4]) -> Vec2 {
    let p = position.extend(0.0);
    let mut out = Vec2::ZERO;
    for (bone, w) in weight.influences() {
        let m = get_matrix(matrices, bone);
        out += m.transform_point3(p).truncate() * w;
    }
    out
}

fn get_matrix(matrices: &[Mat4], index: u32) -> Mat4 {
    matrices.get(index as usize).copied().unwrap_or(Mat4::IDENTITY)
}
