//! 绑定运行时配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。
//! 配置只属于创建它的角色实例，没有全局状态。

use serde::{Deserialize, Serialize};

use crate::animation::{Playback, RetargetConfig, RotationMode, Smoothing};
use crate::skinning::{SkinningConfig, WeightStrategy};
use crate::Result;

/// 绑定配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    // ========== 蒙皮权重 ==========
    /// 骨骼影响半径（网格坐标单位），默认 1.15
    pub influence_radius: f32,
    /// 权重计算策略，默认 CachedGeodesicRadial
    pub weight_strategy: WeightStrategy,
    /// NaiveRadial 是否也应用排名衰减，默认 false
    pub dampen_naive: bool,
    /// 距离表是否用 rayon 按骨骼并行构建，默认 true
    pub parallel_cache: bool,

    // ========== 播放 ==========
    /// 帧间隔（秒），默认 1/15
    pub frame_interval: f32,
    /// 播放模式，默认 Advance
    pub playback: Playback,
    /// 位置平滑，默认 Lerp
    /// Lerp 的步长是 elapsed / frame_interval，帧率越低走得越远
    pub smoothing: Smoothing,
    /// 旋转推导方式，默认 RestRelative
    pub rotation_mode: RotationMode,
    /// 是否推导旋转，默认 true（关闭后只移动关节）
    pub apply_rotations: bool,

    // ========== 旋转策略 ==========
    /// 需要减弱旋转的关节索引，默认空
    pub damped_joints: Vec<usize>,
    /// 减弱关节保留的旋转比例，默认 0.5
    pub damped_rotation_scale: f32,
    /// 每步旋转变化上限（弧度），默认 None（不限制）
    /// 用于抑制单帧采样噪声
    pub max_rotation_step: Option<f32>,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            influence_radius: 1.15,
            weight_strategy: WeightStrategy::CachedGeodesicRadial,
            dampen_naive: false,
            parallel_cache: true,

            frame_interval: 1.0 / 15.0,
            playback: Playback::Advance,
            smoothing: Smoothing::Lerp,
            rotation_mode: RotationMode::RestRelative,
            apply_rotations: true,

            damped_joints: Vec::new(),
            damped_rotation_scale: 0.5,
            max_rotation_step: None,
        }
    }
}

impl RigConfig {
    /// 校验所有数值参数（与关节数量有关的检查在创建重定向器时进行）
    pub fn validate(&self) -> Result<()> {
        self.skinning().validate()?;
        self.retarget().validate()
    }

    /// 蒙皮权重部分
    pub fn skinning(&self) -> SkinningConfig {
        SkinningConfig {
            influence_radius: self.influence_radius,
            strategy: self.weight_strategy,
            dampen_naive: self.dampen_naive,
            parallel_cache: self.parallel_cache,
        }
    }

    /// 姿态重定向部分
    pub fn retarget(&self) -> RetargetConfig {
        RetargetConfig {
            frame_interval: self.frame_interval,
            playback: self.playback,
            smoothing: self.smoothing,
            rotation_mode: self.rotation_mode,
            apply_rotations: self.apply_rotations,
            damped_joints: self.damped_joints.clone(),
            damped_rotation_scale: self.damped_rotation_scale,
            max_rotation_step: self.max_rotation_step,
        }
    }
}
