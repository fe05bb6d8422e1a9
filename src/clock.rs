//! 时间源
//! Time sources
//!
//! 定时器从宿主提供的两个单调时钟读取时间：不受宿主暂停/慢动作影响的真实时钟，
//! 以及受其影响的缩放时钟。核心逻辑只查询，不拥有任何时钟状态。
//!
//! Timers read from two monotonic clocks supplied by the host: a real clock that
//! ignores host pause/slow-motion, and a scaled clock that follows it. The core
//! only queries them and owns no clock state.

use crate::error::{Error, Result};
use std::cell::Cell;
use tokio::time::Instant;
use tracing::warn;

/// 定时器使用哪一个时钟
/// Which clock drives a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClockKind {
    /// 受宿主时间缩放影响的游戏时钟
    /// Game clock, follows the host time scale
    #[default]
    Scaled,
    /// 真实时钟
    /// Wall-clock rate, unaffected by the host time scale
    Real,
}

/// 时间源 trait，以秒为单位返回两个单调不减的读数。
/// Time source returning two non-decreasing readings, in seconds.
pub trait TimeSource {
    /// 真实时钟读数
    /// Real clock reading
    fn real_time(&self) -> f64;

    /// 缩放时钟读数
    /// Scaled clock reading
    fn scaled_time(&self) -> f64;

    /// 按时钟类型读取
    /// Read the clock selected by `kind`
    fn now(&self, kind: ClockKind) -> f64 {
        match kind {
            ClockKind::Real => self.real_time(),
            ClockKind::Scaled => self.scaled_time(),
        }
    }
}

fn check_time_scale(scale: f64) -> Result<f64> {
    if scale.is_finite() && scale >= 0.0 {
        Ok(scale)
    } else {
        Err(Error::InvalidTimeScale(scale))
    }
}

/// 由宿主手动推进的时钟，适合帧循环自己计算增量的宿主以及测试。
/// A clock advanced explicitly by the host. Fits hosts that compute their own
/// frame deltas, and tests.
#[derive(Debug)]
pub struct ManualClock {
    real: Cell<f64>,
    scaled: Cell<f64>,
    time_scale: Cell<f64>,
}

impl ManualClock {
    /// 创建两个读数都为零、缩放系数为1的时钟
    /// Create a clock with both readings at zero and a time scale of 1
    pub fn new() -> Self {
        Self {
            real: Cell::new(0.0),
            scaled: Cell::new(0.0),
            time_scale: Cell::new(1.0),
        }
    }

    /// 推进一帧：真实时钟前进 `seconds`，缩放时钟前进 `seconds * time_scale`。
    /// Advance one frame: the real clock moves by `seconds`, the scaled clock by
    /// `seconds * time_scale`.
    pub fn advance(&self, seconds: f64) {
        let Some(seconds) = Self::forward(seconds) else {
            return;
        };
        self.real.set(self.real.get() + seconds);
        self.scaled
            .set(self.scaled.get() + seconds * self.time_scale.get());
    }

    /// 只推进真实时钟
    /// Advance only the real clock
    pub fn advance_real(&self, seconds: f64) {
        if let Some(seconds) = Self::forward(seconds) {
            self.real.set(self.real.get() + seconds);
        }
    }

    /// 只推进缩放时钟
    /// Advance only the scaled clock
    pub fn advance_scaled(&self, seconds: f64) {
        if let Some(seconds) = Self::forward(seconds) {
            self.scaled.set(self.scaled.get() + seconds);
        }
    }

    /// 设置缩放系数，0 表示宿主暂停。
    /// Set the time scale; 0 means the host is paused.
    pub fn set_time_scale(&self, scale: f64) -> Result<()> {
        self.time_scale.set(check_time_scale(scale)?);
        Ok(())
    }

    /// 当前缩放系数
    /// Current time scale
    pub fn time_scale(&self) -> f64 {
        self.time_scale.get()
    }

    fn forward(seconds: f64) -> Option<f64> {
        if seconds.is_finite() && seconds >= 0.0 {
            Some(seconds)
        } else {
            // 时钟不允许回退
            // Clocks never move backwards
            warn!(seconds, "Ignoring non-forward manual clock advance");
            None
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualClock {
    fn real_time(&self) -> f64 {
        self.real.get()
    }

    fn scaled_time(&self) -> f64 {
        self.scaled.get()
    }
}

/// 基于 tokio `Instant` 的时钟。
/// A clock backed by tokio's `Instant`.
///
/// 真实时钟是自创建以来经过的秒数；缩放时钟在每次读取时按当前缩放系数累加
/// 真实时钟的增量。在 `tokio::time::pause()` 下两者都可被测试精确控制。
///
/// The real clock is the number of seconds since creation. The scaled clock
/// integrates real-clock deltas at the current time scale, lazily on each
/// read. Both follow `tokio::time::pause()` in tests.
#[derive(Debug)]
pub struct TokioClock {
    origin: Instant,
    last_real: Cell<f64>,
    scaled: Cell<f64>,
    time_scale: Cell<f64>,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_real: Cell::new(0.0),
            scaled: Cell::new(0.0),
            time_scale: Cell::new(1.0),
        }
    }

    /// 以指定的缩放系数创建
    /// Create with the given time scale
    pub fn with_time_scale(scale: f64) -> Result<Self> {
        let clock = Self::new();
        clock.time_scale.set(check_time_scale(scale)?);
        Ok(clock)
    }

    /// 修改缩放系数。之前经过的时间按旧系数结算。
    /// Change the time scale. Time already passed is settled at the old scale.
    pub fn set_time_scale(&self, scale: f64) -> Result<()> {
        let scale = check_time_scale(scale)?;
        self.sync();
        self.time_scale.set(scale);
        Ok(())
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale.get()
    }

    fn sync(&self) -> f64 {
        let real = self.origin.elapsed().as_secs_f64();
        let delta = (real - self.last_real.get()).max(0.0);
        self.scaled
            .set(self.scaled.get() + delta * self.time_scale.get());
        self.last_real.set(real);
        self.scaled.get()
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for TokioClock {
    fn real_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn scaled_time(&self) -> f64 {
        self.sync()
    }
}
