//! 定时器模块
//! Timer Module
//!
//! 单个可调度的定时器：一个覆盖运行、暂停、取消、完成和所有者失效的状态机，
//! 按帧推进，并可查询已耗时、剩余时间和完成比例。
//!
//! A single schedulable timer: a state machine over running, paused,
//! cancelled, completed and owner-expired, advanced once per frame, with
//! elapsed, remaining and ratio queries.

mod handle;
mod registration;
mod types;

#[cfg(test)]
mod tests;

pub use handle::TimerHandle;
pub use registration::TimerRegistration;
pub use types::{TimerId, TimerState};
