//! 帧调度器模块
//! Frame Scheduler Module
//!
//! 调度器持有所有已提升的定时器，每帧推进一次，并移除已结束的定时器。新注册的
//! 定时器先进入待合并缓冲区，只在下一次 tick 开始时合并，因此永远不会在遍历
//! 过程中修改正在遍历的集合。
//!
//! The scheduler owns every promoted timer, advances each one once per frame
//! and evicts the ones that are done. New registrations go to a staging buffer
//! that is merged only at the start of the next tick, so the collection being
//! traversed is never mutated by a registration.

mod manager;
pub mod driver;
mod stats;


pub use manager::Scheduler;
pub use stats::{SchedulerStats, TickSummary};
