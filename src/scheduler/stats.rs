//! 调度器统计信息
//! Scheduler statistics

use crate::error::CallbackPanic;

/// 调度器累计统计信息
/// Cumulative scheduler statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// 活跃定时器数
    /// Number of active timers
    pub active_timers: usize,
    /// 等待合并的定时器数
    /// Number of timers waiting to be promoted
    pub pending_timers: usize,
    /// 已执行的 tick 数
    /// Number of ticks run
    pub frames: u64,
    /// 已注册的定时器数
    /// Number of timers registered
    pub registered: u64,
    /// 到期回调触发次数（循环定时器每个周期计一次）
    /// Number of fires, counting every cycle of a looped timer
    pub fired: u64,
    /// 已移除的定时器数
    /// Number of timers evicted
    pub evicted: u64,
    /// 被批量取消的定时器数
    /// Number of timers cancelled by `cancel_all`
    pub bulk_cancelled: u64,
    /// 回调 panic 次数
    /// Number of callback panics
    pub callback_failures: u64,
}

impl std::fmt::Display for SchedulerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SchedulerStats {{ active: {}, pending: {}, frames: {}, registered: {}, fired: {}, evicted: {}, bulk_cancelled: {}, failures: {} }}",
            self.active_timers,
            self.pending_timers,
            self.frames,
            self.registered,
            self.fired,
            self.evicted,
            self.bulk_cancelled,
            self.callback_failures
        )
    }
}

/// 单次 tick 的结果
/// Result of a single tick
#[derive(Debug, Default)]
pub struct TickSummary {
    /// 帧序号，从1开始；被忽略的重入 tick 为0
    /// Frame number starting at 1; 0 for an ignored re-entrant tick
    pub frame: u64,
    pub promoted: usize,
    pub advanced: usize,
    pub fired: usize,
    pub evicted: usize,
    /// `Isolate` 策略下被捕获的回调 panic
    /// Callback panics captured under the `Isolate` policy
    pub failures: Vec<CallbackPanic>,
}

impl TickSummary {
    /// 本帧是否没有回调失败
    /// Whether no callback failed during this tick
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
