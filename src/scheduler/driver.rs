//! 帧驱动
//! Frame driver
//!
//! 对没有自己帧循环的宿主，按固定间隔驱动 tick，直到关闭信号完成。驱动本身只是
//! 一个 future，在当前任务上运行，不会派生新任务。
//!
//! For hosts without a frame loop of their own: drives ticks at a fixed
//! interval until a shutdown future resolves. The driver is a plain future
//! running on the current task; it spawns nothing.

use std::future::Future;

use tokio::time::interval;
use tracing::{info, warn};

use crate::config::DriverConfig;
use crate::error::Result;

use super::{Scheduler, TickSummary};

/// 可被帧驱动推进的对象
/// Something the frame driver can advance
pub trait FrameTick {
    fn tick_frame(&self) -> TickSummary;
}

impl FrameTick for Scheduler {
    fn tick_frame(&self) -> TickSummary {
        self.tick()
    }
}

/// 按 `config.frame_interval` 驱动 `target`，直到 `shutdown` 完成，返回已执行的帧数。
/// Drive `target` every `config.frame_interval` until `shutdown` resolves and
/// return the number of frames run.
///
/// 第一帧立即执行。
/// The first frame runs immediately.
pub async fn run_until<T, F>(target: &T, config: &DriverConfig, shutdown: F) -> Result<u64>
where
    T: FrameTick + ?Sized,
    F: Future<Output = ()>,
{
    config.validate()?;

    let mut frame_interval = interval(config.frame_interval);
    frame_interval.set_missed_tick_behavior(config.missed_frames.into());
    tokio::pin!(shutdown);

    info!(interval = ?config.frame_interval, "Frame driver started");
    let mut frames = 0u64;
    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            _ = frame_interval.tick() => {
                let summary = target.tick_frame();
                frames += 1;
                if !summary.is_clean() {
                    warn!(
                        frame = summary.frame,
                        failures = summary.failures.len(),
                        "Frame finished with isolated callback failures"
                    );
                }
            }
        }
    }

    info!(frames, "Frame driver stopped");
    Ok(frames)
}
