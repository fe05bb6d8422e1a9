//! tests/common/harness.rs
use frame_timer::{ManualClock, TimeSource, TimerHandle, TimerRegistration, Timers};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "frame_timer=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::FULL)
            .with_test_writer()
            .init();
    });
}

/// A host stand-in: a manual clock, the registration facade and a fire
/// counter shared by the timers a test registers.
pub struct TestHarness {
    pub clock: Rc<ManualClock>,
    pub timers: Timers,
    pub fired: Rc<Cell<u32>>,
}

impl TestHarness {
    pub fn new() -> Self {
        init_tracing();
        let clock = Rc::new(ManualClock::new());
        let timers = Timers::new(clock.clone());
        Self {
            clock,
            timers,
            fired: Rc::new(Cell::new(0)),
        }
    }

    /// Adds a completion callback that increments the shared counter.
    pub fn counting(&self, registration: TimerRegistration) -> TimerRegistration {
        let fired = self.fired.clone();
        registration.on_complete(move || fired.set(fired.get() + 1))
    }

    pub fn register_counting(&self, registration: TimerRegistration) -> TimerHandle {
        self.timers.register(self.counting(registration))
    }

    /// Moves the scaled clock to the absolute time `seconds` and runs one frame.
    pub fn tick_at(&self, seconds: f64) {
        let delta = seconds - self.clock.scaled_time();
        self.clock.advance(delta);
        self.timers.tick();
    }

    pub fn fired(&self) -> u32 {
        self.fired.get()
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
