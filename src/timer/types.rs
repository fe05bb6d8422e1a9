//! 定时器类型定义
//! Timer type definitions

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::error::CallbackPanic;

/// 定时器ID，在同一个注册门面内唯一
/// Timer ID, unique within one registration facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 定时器状态。任意时刻恰好处于其中一种。
/// Timer state. Exactly one holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerState {
    /// 运行中
    /// Running
    Running,
    /// 已暂停
    /// Paused
    Paused,
    /// 已取消（终态）
    /// Cancelled (terminal)
    Cancelled,
    /// 已完成（终态，仅非循环定时器）
    /// Completed (terminal, non-looped timers only)
    Completed,
    /// 所有者已销毁（终态）
    /// Owner destroyed (terminal)
    Expired,
}

impl TimerState {
    /// 是否为终态
    /// Whether this is a terminal state
    pub fn is_done(self) -> bool {
        matches!(
            self,
            TimerState::Cancelled | TimerState::Completed | TimerState::Expired
        )
    }
}

/// 已冻结的耗时快照。取消会覆盖暂停，二者不会同时存在。
/// Frozen elapsed snapshot. Cancel replaces pause; both never coexist.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) enum Snapshot {
    #[default]
    None,
    Paused(f64),
    Cancelled(f64),
}

pub(crate) type CompleteFn = dyn FnMut();
pub(crate) type UpdateFn = dyn FnMut(f64);

/// 回调槽位。调用期间回调被取出，因此回调内部可以安全地操作自己的定时器。
/// Callback slot. The callback is taken out while it runs, so it may freely
/// operate on its own timer.
pub(crate) struct CallbackSlot<F: ?Sized> {
    slot: RefCell<Option<Box<F>>>,
}

impl<F: ?Sized> CallbackSlot<F> {
    pub(crate) fn new(callback: Option<Box<F>>) -> Self {
        Self {
            slot: RefCell::new(callback),
        }
    }

    /// 调用回调并捕获 panic。返回 `Ok(false)` 表示没有回调。
    /// Invoke the callback, catching a panic. `Ok(false)` means no callback is set.
    pub(crate) fn invoke(&self, call: impl FnOnce(&mut F)) -> std::thread::Result<bool> {
        let Some(mut callback) = self.slot.borrow_mut().take() else {
            return Ok(false);
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| call(&mut *callback)));
        let mut slot = self.slot.borrow_mut();
        if slot.is_none() {
            *slot = Some(callback);
        }
        result.map(|()| true)
    }
}

/// 单个定时器在一次 tick 中的推进结果
/// Outcome of advancing one timer for one tick
#[derive(Debug, Default)]
pub(crate) struct Step {
    /// 是否以运行态推进（暂停或已结束的定时器为 false）
    /// Whether the timer was advanced as running (false when paused or done)
    pub advanced: bool,
    /// 本帧是否到期（循环定时器每个周期一次）
    /// Whether the timer reached its fire time this tick
    pub fired: bool,
    /// 本帧捕获的回调 panic，按发生顺序排列
    /// Callback panics captured this tick, in the order they happened
    pub failures: Vec<CallbackPanic>,
}
