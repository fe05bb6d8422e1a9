#![deny(clippy::expect_used, clippy::unwrap_used)]

//! 帧驱动的延时与周期定时器库的根。
//! The root of the frame-driven delayed and periodic timer library.
//!
//! 宿主每帧调用一次 [`Timers::tick`]（或 [`Scheduler::tick`]），无需为每个定时器
//! 占用线程或任务。
//!
//! The host calls [`Timers::tick`] (or [`Scheduler::tick`]) once per frame; no
//! thread or task is dedicated to any timer.

pub mod clock;
pub mod config;
pub mod error;
pub mod liveness;
pub mod registry;
pub mod scheduler;
pub mod timer;

pub use clock::{ClockKind, ManualClock, TimeSource, TokioClock};
pub use config::{CallbackFailurePolicy, Config, DriverConfig, MissedFrames, SchedulerConfig};
pub use error::{CallbackKind, CallbackPanic, Error, Result};
pub use liveness::{AliveFn, Liveness};
pub use registry::Timers;
pub use scheduler::{Scheduler, SchedulerStats, TickSummary};
pub use timer::{TimerHandle, TimerId, TimerRegistration, TimerState};
