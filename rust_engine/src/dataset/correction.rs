//! 坐标修正

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// 单组坐标修正，按顺序执行：交换 XY -> 缩放 -> 翻转 Y (y' = 1 - y) -> 偏移
///
/// 默认值是恒等变换。具体数值与数据集有关，由调用方提供。
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateCorrection {
    pub swap_axes: bool,
    pub scale: Vec2,
    pub flip_y: bool,
    pub offset: Vec2,
}

impl Default for CoordinateCorrection {
    fn default() -> Self {
        Self {
            swap_axes: false,
            scale: Vec2::ONE,
            flip_y: false,
            offset: Vec2::ZERO,
        }
    }
}

impl CoordinateCorrection {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, point: Vec2) -> Vec2 {
        let mut p = if self.swap_axes {
            Vec2::new(point.y, point.x)
        } else {
            point
        };
        p *= self.scale;
        if self.flip_y {
            p.y = 1.0 - p.y;
        }
        p + self.offset
    }

    pub fn apply_all(&self, points: &mut [Vec2]) {
        if self.is_identity() {
            return;
        }
        for p in points {
            *p = self.apply(*p);
        }
    }
}

/// 数据集三类坐标各自的修正
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetCorrections {
    /// 网格顶点
    pub vertices: CoordinateCorrection,
    /// A-pose 关节位置
    pub rest_pose: CoordinateCorrection,
    /// 逐帧关节位置
    pub frames: CoordinateCorrection,
    /// 纹理坐标（只有两个分量的数据集，UV 取自原始位置，通常需要交换和缩放）
    pub uvs: CoordinateCorrection,
}
