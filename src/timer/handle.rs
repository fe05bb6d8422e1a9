//! 定时器状态机与句柄
//! Timer state machine and handle
//!
//! 句柄是共享的、不拥有调度权的引用：调度器在提升后负责推进定时器，调用者
//! 只用句柄查询和控制。定时器结束后查询依然有效，返回冻结的值。
//!
//! A handle is a shared reference that carries no scheduling rights: once
//! promoted, the scheduler advances the timer, while callers only query and
//! command it. Queries stay valid after the timer is done and return frozen
//! values.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::clock::{ClockKind, TimeSource};
use crate::config::CallbackFailurePolicy;
use crate::error::{CallbackKind, CallbackPanic};
use crate::liveness::Liveness;

use super::registration::TimerRegistration;
use super::types::{CallbackSlot, CompleteFn, Snapshot, Step, TimerId, TimerState, UpdateFn};

struct Timer {
    id: TimerId,
    duration: f64,
    looped: Cell<bool>,
    clock_kind: ClockKind,
    clock: Rc<dyn TimeSource>,
    completed: Cell<bool>,
    /// 已交给调度器，防止重复注册
    /// Already handed to a scheduler, guards against double registration
    registered: Cell<bool>,
    start_time: Cell<f64>,
    last_update_time: Cell<f64>,
    snapshot: Cell<Snapshot>,
    on_complete: CallbackSlot<CompleteFn>,
    on_update: CallbackSlot<UpdateFn>,
    owner: Option<Box<dyn Liveness>>,
}

/// 定时器句柄
/// Timer handle
#[derive(Clone)]
pub struct TimerHandle {
    inner: Rc<Timer>,
}

impl TimerHandle {
    /// 创建定时器。起始时间取自所选时钟的当前读数。
    /// Create a timer. Its start time is the current reading of its clock.
    pub fn new(id: TimerId, registration: TimerRegistration, clock: Rc<dyn TimeSource>) -> Self {
        let TimerRegistration {
            duration,
            looped,
            clock: clock_kind,
            on_complete,
            on_update,
            owner,
        } = registration;
        let now = clock.now(clock_kind);

        Self {
            inner: Rc::new(Timer {
                id,
                duration,
                looped: Cell::new(looped),
                clock_kind,
                clock,
                completed: Cell::new(false),
                registered: Cell::new(false),
                start_time: Cell::new(now),
                last_update_time: Cell::new(now),
                snapshot: Cell::new(Snapshot::None),
                on_complete: CallbackSlot::new(on_complete),
                on_update: CallbackSlot::new(on_update),
                owner,
            }),
        }
    }

    pub fn id(&self) -> TimerId {
        self.inner.id
    }

    /// 时长（秒），创建后不可变
    /// Duration in seconds, fixed at creation
    pub fn duration(&self) -> f64 {
        self.inner.duration
    }

    pub fn is_looped(&self) -> bool {
        self.inner.looped.get()
    }

    /// 修改循环标志，下一次到期时生效。
    /// Change the loop flag; takes effect at the next fire.
    pub fn set_looped(&self, looped: bool) {
        self.inner.looped.set(looped);
    }

    pub fn is_completed(&self) -> bool {
        self.inner.completed.get()
    }

    pub fn uses_real_time(&self) -> bool {
        self.inner.clock_kind == ClockKind::Real
    }

    pub fn clock_kind(&self) -> ClockKind {
        self.inner.clock_kind
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.inner.snapshot.get(), Snapshot::Paused(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.inner.snapshot.get(), Snapshot::Cancelled(_))
    }

    /// 创建时绑定了所有者且所有者已不再存活
    /// The timer was bound to an owner and that owner is no longer alive
    pub fn is_owner_expired(&self) -> bool {
        self.inner
            .owner
            .as_ref()
            .is_some_and(|owner| !owner.is_alive())
    }

    /// 已完成、已取消或所有者已销毁
    /// Completed, cancelled, or expired because the owner is gone
    pub fn is_done(&self) -> bool {
        self.is_completed() || self.is_cancelled() || self.is_owner_expired()
    }

    pub fn state(&self) -> TimerState {
        if self.is_completed() {
            TimerState::Completed
        } else if self.is_cancelled() {
            TimerState::Cancelled
        } else if self.is_owner_expired() {
            TimerState::Expired
        } else if self.is_paused() {
            TimerState::Paused
        } else {
            TimerState::Running
        }
    }

    /// 取消定时器。已结束时无操作；取消后到期回调不会再被调用。
    /// Cancel the timer. No-op once done; `on_complete` never fires afterwards.
    pub fn cancel(&self) {
        if self.is_done() {
            return;
        }
        let elapsed = self.time_elapsed();
        self.inner.snapshot.set(Snapshot::Cancelled(elapsed));
        trace!(timer_id = %self.id(), elapsed, "Timer cancelled");
    }

    /// 暂停定时器。已暂停或已结束时无操作。
    /// Pause the timer. No-op if already paused or done.
    pub fn pause(&self) {
        if self.is_paused() || self.is_done() {
            return;
        }
        let elapsed = self.time_elapsed();
        self.inner.snapshot.set(Snapshot::Paused(elapsed));
        trace!(timer_id = %self.id(), elapsed, "Timer paused");
    }

    /// 恢复定时器，耗时从暂停时的快照继续累计。
    /// Resume the timer; elapsed time continues from the paused snapshot.
    pub fn resume(&self) {
        let Snapshot::Paused(elapsed) = self.inner.snapshot.get() else {
            return;
        };
        if self.is_done() {
            return;
        }
        // 重新锚定起始时间，使 now - start 等于暂停前的耗时
        // Re-anchor the start so that now - start equals the paused elapsed
        let now = self.now();
        self.inner.start_time.set(now - elapsed);
        self.inner.last_update_time.set(now);
        self.inner.snapshot.set(Snapshot::None);
        trace!(timer_id = %self.id(), elapsed, "Timer resumed");
    }

    /// 当前循环周期内的已耗时，限制在 `[0, duration]` 内。
    /// Elapsed time in the current cycle, clamped to `[0, duration]`.
    ///
    /// 优先级：已完成 > 取消快照 > 暂停快照 > 实时计算。
    /// Precedence: completed, then cancel snapshot, then pause snapshot, then
    /// the live reading.
    pub fn time_elapsed(&self) -> f64 {
        let upper = self.inner.duration.max(0.0);
        if self.is_completed() {
            return upper;
        }
        let raw = match self.inner.snapshot.get() {
            Snapshot::Cancelled(elapsed) | Snapshot::Paused(elapsed) => elapsed,
            Snapshot::None => self.now() - self.inner.start_time.get(),
        };
        raw.clamp(0.0, upper)
    }

    pub fn time_remaining(&self) -> f64 {
        (self.inner.duration - self.time_elapsed()).max(0.0)
    }

    pub fn ratio_complete(&self) -> f64 {
        if self.inner.duration <= 0.0 {
            return 1.0;
        }
        self.time_elapsed() / self.inner.duration
    }

    pub fn ratio_remaining(&self) -> f64 {
        if self.inner.duration <= 0.0 {
            return 0.0;
        }
        self.time_remaining() / self.inner.duration
    }

    /// 两个句柄是否指向同一个定时器
    /// Whether both handles refer to the same timer
    pub fn ptr_eq(&self, other: &TimerHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// 标记为已注册。已经注册过时返回 `false`。
    /// Mark the timer as registered. Returns `false` if it already was.
    pub(crate) fn mark_registered(&self) -> bool {
        !self.inner.registered.replace(true)
    }

    fn now(&self) -> f64 {
        self.inner.clock.now(self.inner.clock_kind)
    }

    fn fire_time(&self) -> f64 {
        self.inner.start_time.get() + self.inner.duration
    }

    #[cfg(test)]
    pub(crate) fn advance(&self) -> Step {
        self.advance_with(CallbackFailurePolicy::Isolate)
    }

    /// 推进一帧，仅由调度器调用。
    /// Advance one tick. Called by the scheduler only.
    ///
    /// 在 `Propagate` 策略下，进度回调 panic 后立即返回，本帧不再检查到期，
    /// 到期回调也不会被调用。
    /// Under `Propagate`, a panicking update callback ends the step at once:
    /// the fire check is skipped and `on_complete` does not run.
    pub(crate) fn advance_with(&self, policy: CallbackFailurePolicy) -> Step {
        let mut step = Step::default();
        if self.is_done() {
            return step;
        }

        let timer = &*self.inner;
        let now = self.now();

        if self.is_paused() {
            // 暂停期间时间不累计
            // Time does not accumulate while paused
            let delta = now - timer.last_update_time.get();
            timer.start_time.set(timer.start_time.get() + delta);
            timer.last_update_time.set(now);
            return step;
        }

        step.advanced = true;
        timer.last_update_time.set(now);

        let elapsed = self.time_elapsed();
        if let Err(payload) = timer.on_update.invoke(|callback| callback(elapsed)) {
            step.failures
                .push(CallbackPanic::new(timer.id, CallbackKind::Update, payload));
            if policy == CallbackFailurePolicy::Propagate {
                return step;
            }
        }

        // 进度回调可能已经取消或暂停了定时器
        // The update callback may have cancelled or paused the timer
        if self.is_done() || self.is_paused() {
            return step;
        }

        if now >= self.fire_time() {
            step.fired = true;
            if let Err(payload) = timer.on_complete.invoke(|callback| callback()) {
                step.failures
                    .push(CallbackPanic::new(timer.id, CallbackKind::Complete, payload));
            }

            if self.is_done() {
                // 在到期回调中被取消
                // Cancelled from inside its own completion callback
            } else if timer.looped.get() {
                timer.start_time.set(now);
                if self.is_paused() {
                    timer.snapshot.set(Snapshot::Paused(0.0));
                }
                trace!(timer_id = %timer.id, now, "Looped timer fired, new cycle started");
            } else {
                // 终态覆盖到期回调中设置的暂停
                // The terminal state replaces a pause set by the completion callback
                timer.snapshot.set(Snapshot::None);
                timer.completed.set(true);
                trace!(timer_id = %timer.id, now, "Timer completed");
            }
        }

        step
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.inner.id)
            .field("duration", &self.inner.duration)
            .field("state", &self.state())
            .field("looped", &self.inner.looped.get())
            .field("clock", &self.inner.clock_kind)
            .finish()
    }
}
