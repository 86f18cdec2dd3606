//! 姿态重定向：把逐帧关节位置转换为关节局部旋转
//!
//! 每一步依次执行：推进时钟 -> 读取目标位置 -> 平滑 -> 推导旋转。
//! 关节按索引递增处理，父关节总是先于子关节。

use std::collections::HashSet;

use glam::{Mat4, Quat, Vec2};
use serde::{Deserialize, Serialize};

use super::clock::AnimationClock;
use super::frames::AnimationFrames;
use super::rotation::{derive_rotation, signed_angle, RotationMode, RotationPolicy};
use crate::skeleton::Skeleton;
use crate::{RigError, Result};

/// 播放模式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Playback {
    /// 按帧间隔循环推进
    #[default]
    Advance,
    /// 固定在某一帧（调试）
    Locked(usize),
    /// 停止推进，继续基于当前帧推导旋转
    Frozen,
    /// 保持 A-pose，不做任何计算（调试）
    RestPose,
}

/// 关节位置向目标靠近的方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Smoothing {
    /// 直接跳到目标
    Snap,
    /// 按 elapsed / frame_interval 线性插值（与帧率相关）
    #[default]
    Lerp,
}

/// 重定向配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetargetConfig {
    /// 帧间隔（秒）
    pub frame_interval: f32,
    pub playback: Playback,
    pub smoothing: Smoothing,
    pub rotation_mode: RotationMode,
    /// 关闭后位置照常更新，旋转保持单位旋转（调试）
    pub apply_rotations: bool,
    /// 需要减弱旋转的关节
    pub damped_joints: Vec<usize>,
    /// 减弱后保留的旋转比例
    pub damped_rotation_scale: f32,
    /// 每步旋转变化上限（弧度），None 表示不限
    pub max_rotation_step: Option<f32>,
}

impl Default for RetargetConfig {
    fn default() -> Self {
        Self {
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

impl RetargetConfig {
    pub fn validate(&self) -> Result<()> {
        let interval = self.frame_interval;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(RigError::Config(format!(
                "frame interval must be positive and finite, got {interval}"
            )));
        }
        let scale = self.damped_rotation_scale;
        if !(0.0..=1.0).contains(&scale) {
            return Err(RigError::Config(format!(
                "damped rotation scale must be within [0, 1], got {scale}"
            )));
        }
        if let Some(max) = self.max_rotation_step {
            if max.is_nan() || max < 0.0 {
                return Err(RigError::Config(format!(
                    "max rotation step must be non-negative, got {max}"
                )));
            }
        }
        Ok(())
    }
}

/// 重定向器的可变状态（每步更新一次）
#[derive(Clone, Debug)]
pub struct PoseState {
    clock: AnimationClock,
    targets: Vec<Vec2>,
    positions: Vec<Vec2>,
    rotations: Vec<Quat>,
    /// 增量模式：每个关节上一步的父→子方向
    previous_directions: Vec<Vec2>,
}

impl PoseState {
    fn at_rest(clock: AnimationClock, rest_positions: &[Vec2], rest_directions: &[Vec2]) -> Self {
        Self {
            clock,
            targets: rest_positions.to_vec(),
            positions: rest_positions.to_vec(),
            rotations: vec![Quat::IDENTITY; rest_positions.len()],
            previous_directions: rest_directions.to_vec(),
        }
    }

    /// 当前帧索引
    pub fn frame(&self) -> usize {
        self.clock.frame()
    }

    /// 距下一帧的剩余时间
    pub fn countdown(&self) -> f32 {
        self.clock.countdown()
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn targets(&self) -> &[Vec2] {
        &self.targets
    }

    /// 当前（插值后的）关节位置
    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn rotations(&self) -> &[Quat] {
        &self.rotations
    }

    pub fn previous_directions(&self) -> &[Vec2] {
        &self.previous_directions
    }
}

/// 姿态重定向器
#[derive(Clone, Debug)]
pub struct PoseRetargeter {
    parents: Vec<Option<usize>>,
    rest_positions: Vec<Vec2>,
    /// A-pose 下父→子方向，根关节为 0
    rest_directions: Vec<Vec2>,
    frames: AnimationFrames,
    config: RetargetConfig,
    policy: RotationPolicy,
    state: PoseState,
    /// 已报告过的错误帧，每帧只警告一次
    reported_frames: HashSet<usize>,
}

impl PoseRetargeter {
    pub fn new(skeleton: &Skeleton, frames: AnimationFrames, config: RetargetConfig) -> Result<Self> {
        config.validate()?;
        let joint_count = skeleton.joint_count();

        if let Some(&joint) = config.damped_joints.iter().find(|&&j| j >= joint_count) {
            return Err(RigError::Config(format!(
                "damped joint {joint} is out of range for {joint_count} joints"
            )));
        }
        Self::check_playback(config.playback, &frames)?;

        let mut clock = AnimationClock::new(config.frame_interval, frames.len())?;
        if let Playback::Locked(frame) = config.playback {
            clock.set_frame(frame);
        }

        let parents: Vec<Option<usize>> = skeleton.joints().iter().map(|j| j.parent).collect();
        let rest_positions = skeleton.rest_positions();
        // 父→子的 A-pose 方向即构建时算好的初始偏移
        let rest_directions: Vec<Vec2> = skeleton
            .joints()
            .iter()
            .map(|j| if j.is_root() { Vec2::ZERO } else { j.rest_offset })
            .collect();

        let policy = RotationPolicy::new(
            joint_count,
            &config.damped_joints,
            config.damped_rotation_scale,
            config.max_rotation_step,
        );
        let state = PoseState::at_rest(clock, &rest_positions, &rest_directions);

        Ok(Self {
            parents,
            rest_positions,
            rest_directions,
            frames,
            config,
            policy,
            state,
            reported_frames: HashSet::new(),
        })
    }

    fn check_playback(playback: Playback, frames: &AnimationFrames) -> Result<()> {
        if let Playback::Locked(frame) = playback {
            if frame >= frames.len() {
                return Err(RigError::Config(format!(
                    "locked frame {frame} is out of range for {} frames",
                    frames.len()
                )));
            }
        }
        Ok(())
    }

    /// 推进一步
    pub fn step(&mut self, elapsed: f32) {
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };

        match self.config.playback {
            Playback::RestPose => {
                self.hold_rest_pose();
                return;
            }
            Playback::Advance => {
                if self.state.clock.step(elapsed) {
                    log::debug!("切换到第 {} 帧", self.state.clock.frame());
                }
            }
            Playback::Locked(frame) => self.state.clock.set_frame(frame),
            Playback::Frozen => {}
        }

        if !self.load_targets() {
            return;
        }
        self.smooth(elapsed);

        if self.config.apply_rotations {
            match self.config.rotation_mode {
                RotationMode::RestRelative => self.derive_rest_relative(),
                RotationMode::Incremental => self.derive_incremental(),
            }
        }
    }

    /// 读取当前帧的目标位置，关节数量不符时跳过本步
    fn load_targets(&mut self) -> bool {
        let frame = self.state.clock.frame();
        let joint_count = self.state.targets.len();
        match self.frames.frame(frame) {
            Some(joints) if joints.len() == joint_count => {
                self.state.targets.copy_from_slice(joints);
                true
            }
            other => {
                if self.reported_frames.insert(frame) {
                    log::warn!(
                        "第 {} 帧有 {} 个关节位置，骨架有 {} 个关节，跳过",
                        frame,
                        other.map_or(0, <[Vec2]>::len),
                        joint_count
                    );
                }
                false
            }
        }
    }

    fn smooth(&mut self, elapsed: f32) {
        let PoseState {
            targets, positions, ..
        } = &mut self.state;

        match self.config.smoothing {
            Smoothing::Snap => positions.copy_from_slice(targets),
            Smoothing::Lerp => {
                let t = (elapsed / self.config.frame_interval).clamp(0.0, 1.0);
                for (pos, &target) in positions.iter_mut().zip(targets.iter()) {
                    *pos = pos.lerp(target, t);
                }
            }
        }
    }

    fn derive_rest_relative(&mut self) {
        let PoseState {
            positions,
            rotations,
            ..
        } = &mut self.state;

        for joint in 0..self.parents.len() {
            let Some(parent) = self.parents[joint] else {
                continue;
            };
            let current = positions[joint] - positions[parent];
            match derive_rotation(self.rest_directions[joint], current) {
                Some(desired) => {
                    let desired = self.policy.damp(joint, desired);
                    rotations[joint] = self.policy.clamp(rotations[joint], desired);
                }
                None => log::debug!("关节 {} 方向退化，保留上一步旋转", joint),
            }
        }
    }

    fn derive_incremental(&mut self) {
        let PoseState {
            positions,
            rotations,
            previous_directions,
            ..
        } = &mut self.state;

        for joint in 0..self.parents.len() {
            let Some(parent) = self.parents[joint] else {
                continue;
            };
            let current = positions[joint] - positions[parent];
            if current == Vec2::ZERO {
                log::debug!("关节 {} 方向退化，保留上一步旋转", joint);
                continue;
            }
            if let Some(delta) = signed_angle(previous_directions[joint], current) {
                let delta = self.policy.clamp_angle(self.policy.damp_angle(joint, delta));
                rotations[joint] = (Quat::from_rotation_z(delta) * rotations[joint]).normalize();
            }
            previous_directions[joint] = current;
        }
    }

    fn hold_rest_pose(&mut self) {
        let state = &mut self.state;
        state.targets.copy_from_slice(&self.rest_positions);
        state.positions.copy_from_slice(&self.rest_positions);
        state.rotations.fill(Quat::IDENTITY);
        state.previous_directions.copy_from_slice(&self.rest_directions);
    }

    /// 回到第 0 帧（或锁定帧）和 A-pose
    pub fn reset(&mut self) {
        self.state.clock.reset();
        if let Playback::Locked(frame) = self.config.playback {
            self.state.clock.set_frame(frame);
        }
        self.hold_rest_pose();
    }

    /// 切换播放模式
    pub fn set_playback(&mut self, playback: Playback) -> Result<()> {
        Self::check_playback(playback, &self.frames)?;
        self.config.playback = playback;
        Ok(())
    }

    pub fn playback(&self) -> Playback {
        self.config.playback
    }

    pub fn config(&self) -> &RetargetConfig {
        &self.config
    }

    pub fn state(&self) -> &PoseState {
        &self.state
    }

    pub fn frames(&self) -> &AnimationFrames {
        &self.frames
    }

    /// 获取关节数量
    pub fn joint_count(&self) -> usize {
        self.parents.len()
    }

    /// 当前帧索引
    pub fn frame(&self) -> usize {
        self.state.frame()
    }

    /// 出现过关节数量错误的帧数
    pub fn skipped_frames(&self) -> usize {
        self.reported_frames.len()
    }

    /// 每个关节的局部旋转（根关节始终为单位旋转）
    pub fn local_rotations(&self) -> &[Quat] {
        &self.state.rotations
    }

    /// 每个关节当前的世界位置
    pub fn positions(&self) -> &[Vec2] {
        &self.state.positions
    }

    /// 正向运动学：world = parent_world * local
    ///
    /// 世界平移等于当前关节位置，世界旋转沿父链累乘局部旋转。
    pub fn world_transforms(&self) -> Vec<Mat4> {
        let count = self.parents.len();
        let mut world_rotations: Vec<Quat> = Vec::with_capacity(count);
        let mut world = Vec::with_capacity(count);

        for joint in 0..count {
            let local = self.state.rotations[joint];
            let rotation = match self.parents[joint] {
                Some(parent) => (world_rotations[parent] * local).normalize(),
                None => local,
            };
            world_rotations.push(rotation);
            world.push(Mat4::from_rotation_translation(
                rotation,
                self.state.positions[joint].extend(0.0),
            ));
        }
        world
    }

    /// 每个关节在父关节空间中的位置（根关节为世界位置）
    pub fn local_positions(&self) -> Vec<Vec2> {
        let world = self.world_transforms();
        self.parents
            .iter()
            .zip(&self.state.positions)
            .map(|(parent, &pos)| match parent {
                Some(p) => world[*p]
                    .inverse()
                    .transform_point3(pos.extend(0.0))
                    .truncate(),
                None => pos,
            })
            .collect()
    }

    /// 蒙皮矩阵：world[i] * bind[i]
    pub fn skinning_matrices(&self, bind_pose: &[Mat4]) -> Vec<Mat4> {
        self.world_transforms()
            .into_iter()
            .zip(bind_pose)
            .map(|(world, bind)| world * *bind)
            .collect()
    }
}
