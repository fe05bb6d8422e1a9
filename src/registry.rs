//! 定时器注册门面
//! Timer registration facade
//!
//! 宿主持有一个 [`Timers`] 并通过依赖注入传递给需要定时器的代码。调度器在第一次
//! 注册时惰性创建，也可以预先注入。
//!
//! The host owns one [`Timers`] and passes it to code that needs timers. The
//! scheduler is created lazily on the first registration, or injected up front.

use std::cell::{Cell, OnceCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::clock::TimeSource;
use crate::config::SchedulerConfig;
use crate::scheduler::driver::FrameTick;
use crate::scheduler::{Scheduler, TickSummary};
use crate::timer::{TimerHandle, TimerId, TimerRegistration};

/// 定时器注册门面
/// Timer registration facade
///
/// ```
/// use std::rc::Rc;
/// use frame_timer::{ManualClock, TimerRegistration, Timers};
///
/// let clock = Rc::new(ManualClock::new());
/// let timers = Timers::new(clock.clone());
/// let handle = timers.register(TimerRegistration::new(1.0));
///
/// clock.advance(1.0);
/// timers.tick();
/// assert!(handle.is_completed());
/// ```
pub struct Timers {
    clock: Rc<dyn TimeSource>,
    config: SchedulerConfig,
    scheduler: OnceCell<Scheduler>,
    next_id: Cell<u64>,
}

impl Timers {
    /// 使用默认调度器配置创建
    /// Create with the default scheduler configuration
    pub fn new(clock: Rc<dyn TimeSource>) -> Self {
        Self::with_config(clock, SchedulerConfig::default())
    }

    /// 调度器将在第一次注册时按 `config` 创建
    /// The scheduler is created from `config` on the first registration
    pub fn with_config(clock: Rc<dyn TimeSource>, config: SchedulerConfig) -> Self {
        Self {
            clock,
            config,
            scheduler: OnceCell::new(),
            next_id: Cell::new(1),
        }
    }

    /// 注入一个已经构造好的调度器
    /// Inject an already constructed scheduler
    pub fn with_scheduler(clock: Rc<dyn TimeSource>, scheduler: Scheduler) -> Self {
        let config = scheduler.config().clone();
        let timers = Self::with_config(clock, config);
        let _ = timers.scheduler.set(scheduler);
        timers
    }

    /// 构造定时器并注册到调度器，返回句柄。定时器从下一次 tick 开始推进。
    /// Build a timer, register it and return its handle. The timer is advanced
    /// starting with the next tick.
    pub fn register(&self, registration: TimerRegistration) -> TimerHandle {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let scheduler = self.scheduler.get_or_init(|| {
            debug!("Creating scheduler on first registration");
            Scheduler::new(self.config.clone())
        });
        let handle = TimerHandle::new(id, registration, self.clock.clone());
        scheduler.register(handle.clone());
        handle
    }

    /// 调度器，尚未注册过任何定时器时为 `None`
    /// The scheduler, `None` until the first registration
    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.get()
    }

    pub fn clock(&self) -> &Rc<dyn TimeSource> {
        &self.clock
    }

    /// 推进一帧；还没有调度器时无操作
    /// Advance one frame; no-op while no scheduler exists
    pub fn tick(&self) -> TickSummary {
        match self.scheduler.get() {
            Some(scheduler) => scheduler.tick(),
            None => TickSummary::default(),
        }
    }

    /// 取消定时器，句柄为空时无操作
    /// Cancel a timer; no-op for an absent handle
    pub fn cancel(handle: Option<&TimerHandle>) {
        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    /// 暂停定时器，句柄为空时无操作
    /// Pause a timer; no-op for an absent handle
    pub fn pause(handle: Option<&TimerHandle>) {
        if let Some(handle) = handle {
            handle.pause();
        }
    }

    /// 恢复定时器，句柄为空时无操作
    /// Resume a timer; no-op for an absent handle
    pub fn resume(handle: Option<&TimerHandle>) {
        if let Some(handle) = handle {
            handle.resume();
        }
    }

    pub fn cancel_all_registered(&self) {
        if let Some(scheduler) = self.scheduler.get() {
            scheduler.cancel_all();
        }
    }

    pub fn pause_all_registered(&self) {
        if let Some(scheduler) = self.scheduler.get() {
            scheduler.pause_all();
        }
    }

    pub fn resume_all_registered(&self) {
        if let Some(scheduler) = self.scheduler.get() {
            scheduler.resume_all();
        }
    }
}

impl FrameTick for Timers {
    fn tick_frame(&self) -> TickSummary {
        self.tick()
    }
}

impl fmt::Debug for Timers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timers")
            .field("scheduler", &self.scheduler.get())
            .field("next_id", &self.next_id.get())
            .finish()
    }
}
