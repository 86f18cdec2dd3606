//! 关节旋转推导与阻尼/限幅策略
//!
//! 所有旋转都在 XY 平面内，即绕 Z 轴。

use glam::{Quat, Vec2};
use serde::{Deserialize, Serialize};

/// 旋转推导方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationMode {
    /// 与 A-pose 中父→子方向比较，结果不随时间漂移
    #[default]
    RestRelative,
    /// 与上一步的方向比较并累加增量，长序列会漂移
    Incremental,
}

/// 从 from 转到 to 的有符号角度（逆时针为正）
///
/// 任一向量长度为 0 时返回 None。
pub fn signed_angle(from: Vec2, to: Vec2) -> Option<f32> {
    let a = from.normalize_or_zero();
    let b = to.normalize_or_zero();
    if a == Vec2::ZERO || b == Vec2::ZERO {
        return None;
    }
    Some(a.perp_dot(b).atan2(a.dot(b)))
}

/// 把 rest 方向转到 current 方向的最短弧旋转
pub fn derive_rotation(rest: Vec2, current: Vec2) -> Option<Quat> {
    signed_angle(rest, current).map(Quat::from_rotation_z)
}

/// 每个关节的阻尼和限幅设置
#[derive(Clone, Debug, PartialEq)]
pub struct RotationPolicy {
    /// 按关节索引标记是否阻尼
    damped: Vec<bool>,
    /// 阻尼关节向“无旋转”方向混合后保留的比例
    damped_scale: f32,
    /// 每步旋转变化的上限（弧度）
    max_step: Option<f32>,
}

impl RotationPolicy {
    /// 越界的关节索引会被忽略
    pub fn new(joint_count: usize, damped_joints: &[usize], damped_scale: f32, max_step: Option<f32>) -> Self {
        let mut damped = vec![false; joint_count];
        for &joint in damped_joints {
            if let Some(flag) = damped.get_mut(joint) {
                *flag = true;
            }
        }
        Self {
            damped,
            damped_scale,
            max_step,
        }
    }

    /// 不做阻尼和限幅
    pub fn passthrough(joint_count: usize) -> Self {
        Self::new(joint_count, &[], 1.0, None)
    }

    pub fn is_damped(&self, joint: usize) -> bool {
        self.damped.get(joint).copied().unwrap_or(false)
    }

    pub fn max_step(&self) -> Option<f32> {
        self.max_step
    }

    /// 阻尼：向单位旋转方向混合
    pub fn damp(&self, joint: usize, rotation: Quat) -> Quat {
        if self.is_damped(joint) {
            Quat::IDENTITY.slerp(rotation, self.damped_scale)
        } else {
            rotation
        }
    }

    /// 限幅：与上一帧旋转的夹角超过上限时，只沿最短弧转到上限
    pub fn clamp(&self, previous: Quat, desired: Quat) -> Quat {
        let Some(max) = self.max_step else {
            return desired;
        };
        let angle = previous.angle_between(desired);
        if angle <= max {
            return desired;
        }
        previous.slerp(desired, max / angle)
    }

    /// 增量模式下的角度阻尼
    pub fn damp_angle(&self, joint: usize, angle: f32) -> f32 {
        if self.is_damped(joint) {
            angle * self.damped_scale
        } else {
            angle
        }
    }

    /// 增量模式下的角度限幅
    pub fn clamp_angle(&self, angle: f32) -> f32 {
        match self.max_step {
            Some(max) => angle.clamp(-max, max),
            None => angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_same_direction_is_identity() {
        let q = derive_rotation(Vec2::new(0.0, 2.0), Vec2::new(0.0, 5.0)).unwrap();
        assert!(q.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn test_signed_angle_direction() {
        let ccw = signed_angle(Vec2::X, Vec2::Y).unwrap();
        assert!((ccw - FRAC_PI_2).abs() < 1e-6);
        let cw = signed_angle(Vec2::X, -Vec2::Y).unwrap();
        assert!((cw + FRAC_PI_2).abs() < 1e-6);
        let back = signed_angle(Vec2::X, -Vec2::X).unwrap();
        assert!((back.abs() - PI).abs() < 1e-6);
    }

    #[test]
    fn test_derived_rotation_maps_rest_onto_current() {
        let rest = Vec2::new(1.0, 1.0);
        let current = Vec2::new(-2.0, 0.5);
        let q = derive_rotation(rest, current).unwrap();
        let rotated = (q * rest.extend(0.0)).truncate().normalize();
        assert!((rotated - current.normalize()).length() < 1e-5);
    }

    #[test]
    fn test_degenerate_direction() {
        assert!(signed_angle(Vec2::ZERO, Vec2::X).is_none());
        assert!(derive_rotation(Vec2::X, Vec2::ZERO).is_none());
    }

    #[test]
    fn test_clamp_limits_step_exactly() {
        let policy = RotationPolicy::new(2, &[], 1.0, Some(0.25));
        let previous = Quat::from_rotation_z(0.1);
        let desired = Quat::from_rotation_z(1.3);

        let applied = policy.clamp(previous, desired);
        assert!((previous.angle_between(applied) - 0.25).abs() < 1e-4);
        assert!(applied.abs_diff_eq(Quat::from_rotation_z(0.35), 1e-4));

        // 未超过上限时原样返回
        let near = Quat::from_rotation_z(0.2);
        assert_eq!(policy.clamp(previous, near), near);
    }

    #[test]
    fn test_clamp_takes_shortest_arc() {
        let policy = RotationPolicy::new(1, &[], 1.0, Some(0.5));
        let previous = Quat::from_rotation_z(3.0);
        let desired = Quat::from_rotation_z(-3.0);

        // 跨过 ±π 的最短弧长度约 0.283，不触发限幅
        let applied = policy.clamp(previous, desired);
        assert!(applied.abs_diff_eq(desired, 1e-5) || applied.abs_diff_eq(-desired, 1e-5));
    }

    #[test]
    fn test_damping_halves_rotation() {
        let policy = RotationPolicy::new(3, &[1, 9], 0.5, None);
        let desired = Quat::from_rotation_z(1.0);

        let damped = policy.damp(1, desired);
        assert!((damped.angle_between(Quat::IDENTITY) - 0.5).abs() < 1e-5);
        assert_eq!(policy.damp(0, desired), desired);
        assert!(!policy.is_damped(9));
        assert!((policy.damp_angle(1, 0.8) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_angle() {
        let policy = RotationPolicy::new(1, &[], 1.0, Some(0.2));
        assert!((policy.clamp_angle(0.5) - 0.2).abs() < 1e-6);
        assert!((policy.clamp_angle(-0.5) + 0.2).abs() < 1e-6);
        assert_eq!(RotationPolicy::passthrough(1).clamp_angle(2.0), 2.0);
    }
}
