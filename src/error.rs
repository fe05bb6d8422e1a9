//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::timer::TimerId;
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// 发生 panic 的回调类型
/// Which user callback panicked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// 每帧的进度回调
    /// Per-frame progress callback
    Update,
    /// 到期回调
    /// Completion callback
    Complete,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackKind::Update => f.write_str("on_update"),
            CallbackKind::Complete => f.write_str("on_complete"),
        }
    }
}

/// 用户回调在 `tick()` 中 panic 时捕获的信息。
/// A panic captured from a user callback while a timer was being advanced.
///
/// 保留原始 payload，以便在 `Propagate` 策略下原样重新抛出。
/// The original payload is kept so the panic can be resumed unchanged under
/// the `Propagate` policy.
#[derive(Error)]
#[error("timer {timer}: {callback} panicked: {message}")]
pub struct CallbackPanic {
    /// 所属定时器
    /// Owning timer
    pub timer: TimerId,
    /// 回调类型
    /// Callback kind
    pub callback: CallbackKind,
    /// 可读的 panic 信息
    /// Human readable panic message
    pub message: String,
    payload: Box<dyn Any + Send>,
}

impl CallbackPanic {
    pub(crate) fn new(timer: TimerId, callback: CallbackKind, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Self {
            timer,
            callback,
            message,
            payload,
        }
    }

    /// 取出原始 panic payload，可交给 `std::panic::resume_unwind`。
    /// Take the original panic payload, suitable for `std::panic::resume_unwind`.
    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }
}

impl fmt::Debug for CallbackPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPanic")
            .field("timer", &self.timer)
            .field("callback", &self.callback)
            .field("message", &self.message)
            .finish()
    }
}

/// The primary error type for the timer library.
/// 定时器库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// The frame driver was configured with a zero interval.
    /// 帧驱动配置了零间隔。
    #[error("frame interval must be greater than zero")]
    InvalidFrameInterval,

    /// A clock was given a negative or non-finite time scale.
    /// 时钟收到了负数或非有限的时间缩放系数。
    #[error("invalid time scale: {0}")]
    InvalidTimeScale(f64),

    /// A user callback panicked and the panic was isolated.
    /// 用户回调发生 panic 并被隔离。
    #[error(transparent)]
    CallbackPanicked(#[from] CallbackPanic),
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
