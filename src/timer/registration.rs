//! 定时器注册请求
//! Timer registration request

use std::fmt;
use std::time::Duration;

use crate::clock::ClockKind;
use crate::liveness::Liveness;

use super::types::{CompleteFn, UpdateFn};

/// 定时器注册请求，以构建器方式设置可选参数。
/// Timer registration request; optional parameters are set builder-style.
///
/// ```
/// use frame_timer::TimerRegistration;
///
/// let registration = TimerRegistration::new(2.5)
///     .on_complete(|| println!("respawn"))
///     .looped(true);
/// assert!(registration.is_looped());
/// ```
pub struct TimerRegistration {
    pub(crate) duration: f64,
    pub(crate) looped: bool,
    pub(crate) clock: ClockKind,
    pub(crate) on_complete: Option<Box<CompleteFn>>,
    pub(crate) on_update: Option<Box<UpdateFn>>,
    pub(crate) owner: Option<Box<dyn Liveness>>,
}

impl TimerRegistration {
    /// 创建新的注册请求，时长以秒为单位。
    /// Create a new registration, duration in seconds.
    ///
    /// 零或负时长不会被拒绝：定时器会在第一次 tick 时触发。
    /// A zero or negative duration is not rejected: the timer fires on its
    /// first tick.
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            looped: false,
            clock: ClockKind::Scaled,
            on_complete: None,
            on_update: None,
            owner: None,
        }
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self::new(duration.as_secs_f64())
    }

    /// 到期回调
    /// Completion callback
    pub fn on_complete(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// 每帧回调，参数为当前已耗时（秒）
    /// Per-tick callback receiving the elapsed seconds so far
    pub fn on_update(mut self, callback: impl FnMut(f64) + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    /// 使用真实时钟而非缩放时钟
    /// Drive the timer from the real clock instead of the scaled clock
    pub fn real_time(mut self, real_time: bool) -> Self {
        self.clock = if real_time {
            ClockKind::Real
        } else {
            ClockKind::Scaled
        };
        self
    }

    /// 绑定所有者，所有者销毁后定时器静默结束。
    /// Bind an owner; the timer silently ends once the owner is gone.
    pub fn owned_by(mut self, owner: impl Liveness + 'static) -> Self {
        self.owner = Some(Box::new(owner));
        self
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    pub fn clock(&self) -> ClockKind {
        self.clock
    }
}

impl fmt::Debug for TimerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistration")
            .field("duration", &self.duration)
            .field("looped", &self.looped)
            .field("clock", &self.clock)
            .field("on_complete", &self.on_complete.as_ref().map(|_| "<closure>"))
            .field("on_update", &self.on_update.as_ref().map(|_| "<closure>"))
            .field("owned", &self.owner.is_some())
            .finish()
    }
}
