//! 动画时钟：帧索引 + 倒计时

use crate::{RigError, Result};

/// 倒计时到达 0 的容差（吸收浮点累减误差）
const COUNTDOWN_EPSILON: f32 = 1e-6;

/// 固定帧间隔的循环时钟
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClock {
    interval: f32,
    frame_count: usize,
    /// 尚未显示任何帧时为 None
    current: Option<usize>,
    countdown: f32,
}

impl AnimationClock {
    /// 创建时尚未显示任何帧，倒计时为 0
    ///
    /// 第一次 step 显示第 0 帧并把倒计时重置为完整帧间隔，
    /// 此后每过一个帧间隔推进一帧。
    pub fn new(interval: f32, frame_count: usize) -> Result<Self> {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(RigError::Config(format!(
                "frame interval must be positive and finite, got {interval}"
            )));
        }
        if frame_count == 0 {
            return Err(RigError::Config("animation has no frames".to_string()));
        }
        Ok(Self {
            interval,
            frame_count,
            current: None,
            countdown: 0.0,
        })
    }

    /// 推进时间，倒计时归零时切到下一帧（越过最后一帧回到 0）
    ///
    /// 每次调用最多推进一帧，倒计时重置为完整帧间隔。返回显示的帧是否切换。
    pub fn step(&mut self, elapsed: f32) -> bool {
        self.countdown -= elapsed;
        if self.countdown > COUNTDOWN_EPSILON {
            return false;
        }
        self.current = Some(match self.current {
            Some(frame) => (frame + 1) % self.frame_count,
            None => 0,
        });
        self.countdown = self.interval;
        true
    }

    /// 跳到指定帧（取模），不改变倒计时
    pub fn set_frame(&mut self, frame: usize) {
        self.current = Some(frame % self.frame_count);
    }

    /// 回到未显示任何帧的初始状态
    pub fn reset(&mut self) {
        self.current = None;
        self.countdown = 0.0;
    }

    /// 当前帧索引，尚未开始时为 0
    pub fn frame(&self) -> usize {
        self.current.unwrap_or(0)
    }

    /// 已显示的帧，第一次 step 之前为 None
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// 距下一帧的剩余时间
    pub fn countdown(&self) -> f32 {
        self.countdown
    }
}
