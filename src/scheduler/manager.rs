//! 调度器核心实现
//! Scheduler core implementation

use std::cell::{Cell, RefCell};
use std::panic;

use tracing::{debug, error, trace, warn};

use crate::config::{CallbackFailurePolicy, SchedulerConfig};
use crate::error::CallbackPanic;
use crate::timer::TimerHandle;

use super::stats::{SchedulerStats, TickSummary};

/// tick 结束（包括 panic 展开）时清除重入标志
/// Clears the re-entrancy flag when a tick ends, including on unwind
struct TickGuard<'a>(&'a Cell<bool>);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// 帧调度器
/// Frame scheduler
///
/// 所有操作都在调用线程上同步完成；宿主必须每帧恰好调用一次 [`Scheduler::tick`]。
/// Every operation completes synchronously on the calling thread; the host
/// must call [`Scheduler::tick`] exactly once per frame.
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    /// 活跃定时器，按提升顺序排列
    /// Active timers, in promotion order
    active: RefCell<Vec<TimerHandle>>,
    /// 等待在下一次 tick 开始时合并的定时器
    /// Timers waiting to be merged at the start of the next tick
    pending: RefCell<Vec<TimerHandle>>,
    ticking: Cell<bool>,
    stats: RefCell<SchedulerStats>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            active: RefCell::new(Vec::with_capacity(config.initial_capacity)),
            pending: RefCell::new(Vec::with_capacity(config.initial_capacity)),
            config,
            ticking: Cell::new(false),
            stats: RefCell::new(SchedulerStats::default()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// 注册定时器。只追加到待合并缓冲区，从不直接修改活跃集合。
    /// Register a timer. It is only appended to the staging buffer; the
    /// active set is never touched directly.
    pub fn register(&self, timer: TimerHandle) {
        if !timer.mark_registered() {
            warn!(timer_id = %timer.id(), "Timer already registered, ignoring");
            return;
        }
        trace!(timer_id = %timer.id(), duration = timer.duration(), "Timer registered");
        self.pending.borrow_mut().push(timer);
        self.stats.borrow_mut().registered += 1;
    }

    /// 推进一帧：合并待注册定时器，按顺序推进每个活跃定时器，移除已结束的定时器。
    /// Advance one frame: merge pending registrations, advance every active
    /// timer in order, then evict the ones that are done.
    ///
    /// 在回调内部再次调用 `tick()` 会被忽略。
    /// Calling `tick()` again from inside a callback is ignored.
    ///
    /// # Panics
    ///
    /// 在 [`CallbackFailurePolicy::Propagate`] 策略下，所有失败记录日志后，第一个
    /// panic 继续向上传播，本帧剩余的定时器不再推进。进度回调 panic 时该定时器
    /// 本帧不会到期。
    ///
    /// Under [`CallbackFailurePolicy::Propagate`] every failure is logged, then
    /// the first panic resumes; the remaining timers of that tick are not
    /// advanced. A timer whose update callback panicked does not fire that tick.
    pub fn tick(&self) -> TickSummary {
        if self.ticking.replace(true) {
            warn!("Re-entrant tick ignored");
            return TickSummary::default();
        }
        let _guard = TickGuard(&self.ticking);

        let frame = {
            let mut stats = self.stats.borrow_mut();
            stats.frames += 1;
            stats.frames
        };
        let mut summary = TickSummary {
            frame,
            promoted: self.promote_pending(),
            ..TickSummary::default()
        };

        // 每次只短暂借用活跃集合，回调中可以安全地注册或批量取消
        // The active set is only borrowed briefly so callbacks may register
        // or cancel everything
        let mut index = 0;
        loop {
            let timer = match self.active.borrow().get(index) {
                Some(timer) => timer.clone(),
                None => break,
            };
            index += 1;

            let step = timer.advance_with(self.config.callback_failure_policy);
            summary.advanced += usize::from(step.advanced);
            summary.fired += usize::from(step.fired);
            if step.fired {
                self.stats.borrow_mut().fired += 1;
            }
            if !step.failures.is_empty() {
                self.handle_failures(step.failures, &mut summary);
            }
        }

        summary.evicted = self.evict_done();
        if summary.promoted > 0 || summary.evicted > 0 {
            debug!(
                frame,
                promoted = summary.promoted,
                evicted = summary.evicted,
                active = self.active_len(),
                "Scheduler tick"
            );
        }
        summary
    }

    /// 取消所有活跃定时器并丢弃活跃与待合并集合。
    /// Cancel every active timer and discard both the active and pending sets.
    ///
    /// 待合并的定时器从未被推进，同样被标记为已取消，以便句柄持有者能观察到。
    /// Pending timers were never advanced; they are marked cancelled as well so
    /// their handle holders can observe it.
    pub fn cancel_all(&self) {
        let active = std::mem::take(&mut *self.active.borrow_mut());
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        for timer in active.iter().chain(pending.iter()) {
            timer.cancel();
        }
        let count = active.len() + pending.len();
        {
            let mut stats = self.stats.borrow_mut();
            stats.bulk_cancelled += count as u64;
            stats.evicted += active.len() as u64;
        }
        debug!(
            active = active.len(),
            pending = pending.len(),
            "Cancelled all timers"
        );
    }

    /// 暂停所有活跃定时器
    /// Pause every active timer
    pub fn pause_all(&self) {
        for timer in self.active.borrow().iter() {
            timer.pause();
        }
    }

    /// 恢复所有活跃定时器
    /// Resume every active timer
    pub fn resume_all(&self) {
        for timer in self.active.borrow().iter() {
            timer.resume();
        }
    }

    pub fn active_len(&self) -> usize {
        self.active.borrow().len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_len() == 0 && self.pending_len() == 0
    }

    /// 活跃定时器的快照，按推进顺序排列
    /// Snapshot of the active timers, in advance order
    pub fn active_timers(&self) -> Vec<TimerHandle> {
        self.active.borrow().clone()
    }

    pub fn stats(&self) -> SchedulerStats {
        let mut stats = self.stats.borrow().clone();
        stats.active_timers = self.active_len();
        stats.pending_timers = self.pending_len();
        stats
    }

    fn promote_pending(&self) -> usize {
        let mut pending = self.pending.borrow_mut();
        if pending.is_empty() {
            return 0;
        }
        let count = pending.len();
        self.active.borrow_mut().append(&mut pending);
        count
    }

    fn evict_done(&self) -> usize {
        // 存活检查是用户代码，先在不持有借用的情况下求值
        // Liveness checks are user code; evaluate them without holding a borrow
        let snapshot = self.active.borrow().clone();
        let done: Vec<bool> = snapshot.iter().map(TimerHandle::is_done).collect();
        drop(snapshot);

        let mut active = self.active.borrow_mut();
        let before = active.len();
        if before == done.len() {
            let mut flags = done.into_iter();
            active.retain(|_| !flags.next().unwrap_or(false));
        } else {
            // 存活检查中调用了 cancel_all，活跃集合已被清空
            // A liveness check ran cancel_all and the active set was cleared
            active.retain(|timer| !timer.is_done());
        }
        let evicted = before - active.len();
        self.stats.borrow_mut().evicted += evicted as u64;
        evicted
    }

    fn handle_failures(&self, failures: Vec<CallbackPanic>, summary: &mut TickSummary) {
        self.stats.borrow_mut().callback_failures += failures.len() as u64;
        match self.config.callback_failure_policy {
            CallbackFailurePolicy::Propagate => {
                for failure in &failures {
                    error!(
                        timer_id = %failure.timer,
                        callback = %failure.callback,
                        message = %failure.message,
                        "Timer callback panicked, aborting tick"
                    );
                }
                if let Some(first) = failures.into_iter().next() {
                    panic::resume_unwind(first.into_payload());
                }
            }
            CallbackFailurePolicy::Isolate => {
                for failure in failures {
                    error!(
                        timer_id = %failure.timer,
                        callback = %failure.callback,
                        message = %failure.message,
                        "Timer callback panicked, isolated"
                    );
                    summary.failures.push(failure);
                }
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
