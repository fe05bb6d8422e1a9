//! 定义了调度器和帧驱动的可配置参数。
//! Defines configurable parameters for the scheduler and the frame driver.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// A structure containing all configurable parameters.
///
/// 包含所有可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Scheduler-related parameters.
    /// 调度器相关参数。
    pub scheduler: SchedulerConfig,

    /// Frame driver parameters. Only used by [`crate::scheduler::driver`].
    /// 帧驱动参数。仅由 [`crate::scheduler::driver`] 使用。
    pub driver: DriverConfig,
}

impl Config {
    /// 校验配置。
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.driver.validate()
    }
}

/// 回调 panic 的处理策略
/// How a panicking callback is handled during `tick()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackFailurePolicy {
    /// 当前定时器完成本帧的状态推进后，panic 继续向 `tick()` 的调用者传播，
    /// 本帧剩余的定时器不再推进。
    ///
    /// The panicking timer finishes its own step, then the panic unwinds out of
    /// `tick()`. The remaining timers are not advanced in that tick.
    #[default]
    Propagate,
    /// panic 被捕获并记录，本帧剩余的定时器照常推进。
    ///
    /// The panic is caught, logged and reported in the tick summary; the
    /// remaining timers are still advanced.
    Isolate,
}

/// Scheduler-related parameters.
///
/// 调度器相关参数。
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Policy applied when a user callback panics.
    /// 用户回调 panic 时采用的策略。
    pub callback_failure_policy: CallbackFailurePolicy,
    /// Initial capacity of the active and pending buffers.
    /// 活跃与待合并缓冲区的初始容量。
    pub initial_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            callback_failure_policy: CallbackFailurePolicy::Propagate,
            initial_capacity: 64,
        }
    }
}

/// 帧驱动错过帧时的行为
/// What the frame driver does when frames were missed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissedFrames {
    /// 跳过错过的帧
    /// Skip missed frames
    #[default]
    Skip,
    /// 尽快补齐错过的帧
    /// Catch up as fast as possible
    Burst,
    /// 从当前时刻重新计时
    /// Restart the schedule from now
    Delay,
}

impl From<MissedFrames> for MissedTickBehavior {
    fn from(value: MissedFrames) -> Self {
        match value {
            MissedFrames::Skip => MissedTickBehavior::Skip,
            MissedFrames::Burst => MissedTickBehavior::Burst,
            MissedFrames::Delay => MissedTickBehavior::Delay,
        }
    }
}

/// Frame driver parameters.
///
/// 帧驱动参数。
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Interval between two ticks. Defaults to 60 frames per second.
    /// 两次 tick 之间的间隔。默认每秒60帧。
    pub frame_interval: Duration,
    /// Behavior when the host falls behind.
    /// 宿主落后时的行为。
    pub missed_frames: MissedFrames,
}

impl DriverConfig {
    /// 校验帧驱动配置。
    /// Validate the driver configuration.
    pub fn validate(&self) -> Result<()> {
        if self.frame_interval.is_zero() {
            return Err(Error::InvalidFrameInterval);
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_micros(16_667),
            missed_frames: MissedFrames::Skip,
        }
    }
}
