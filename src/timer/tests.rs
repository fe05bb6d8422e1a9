//! 定时器状态机测试
//! Timer state machine tests

use super::{TimerHandle, TimerId, TimerRegistration, TimerState};
use crate::clock::{ManualClock, TimeSource};
use crate::config::CallbackFailurePolicy;
use crate::error::CallbackKind;
use rand::Rng;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const EPSILON: f64 = 1e-9;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {expected}, got {actual}"
    );
}

fn make_timer(clock: &Rc<ManualClock>, registration: TimerRegistration) -> TimerHandle {
    let source: Rc<dyn TimeSource> = clock.clone();
    TimerHandle::new(TimerId(1), registration, source)
}

fn counting(counter: &Rc<Cell<u32>>) -> impl FnMut() + 'static {
    let counter = counter.clone();
    move || counter.set(counter.get() + 1)
}

#[test]
fn test_new_timer_is_running() {
    let clock = Rc::new(ManualClock::new());
    let timer = make_timer(&clock, TimerRegistration::new(1.0));

    assert_eq!(timer.state(), TimerState::Running);
    assert!(!timer.is_done());
    assert!(!timer.is_looped());
    assert!(!timer.uses_real_time());
    assert_close(timer.time_elapsed(), 0.0);
    assert_close(timer.time_remaining(), 1.0);
    assert_close(timer.ratio_remaining(), 1.0);
}

#[test]
fn test_fires_once_and_completes() {
    let clock = Rc::new(ManualClock::new());
    let fired = Rc::new(Cell::new(0));
    let timer = make_timer(
        &clock,
        TimerRegistration::new(1.0).on_complete(counting(&fired)),
    );

    clock.advance(0.5);
    let step = timer.advance();
    assert!(step.advanced);
    assert!(!step.fired);
    assert_close(timer.ratio_complete(), 0.5);

    clock.advance(1.0);
    let step = timer.advance();
    assert!(step.fired);
    assert_eq!(fired.get(), 1);
    assert!(timer.is_completed());
    assert_eq!(timer.state(), TimerState::Completed);
    assert_close(timer.ratio_complete(), 1.0);

    clock.advance(5.0);
    let step = timer.advance();
    assert!(!step.advanced);
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_looped_timer_restarts_cycle() {
    let clock = Rc::new(ManualClock::new());
    let fired = Rc::new(Cell::new(0));
    let timer = make_timer(
        &clock,
        TimerRegistration::new(1.0)
            .on_complete(counting(&fired))
            .looped(true),
    );

    clock.advance(1.5);
    timer.advance();
    assert_eq!(fired.get(), 1);
    assert!(!timer.is_completed());
    assert_close(timer.time_elapsed(), 0.0);

    clock.advance(1.0);
    timer.advance();
    assert_eq!(fired.get(), 2);

    // 关闭循环后下一次到期即完成
    // Turning the loop off completes the timer at its next fire
    timer.set_looped(false);
    clock.advance(1.0);
    timer.advance();
    assert_eq!(fired.get(), 3);
    assert!(timer.is_completed());
}

#[test]
fn test_pause_freezes_elapsed() {
    let clock = Rc::new(ManualClock::new());
    let timer = make_timer(&clock, TimerRegistration::new(1.0));

    clock.advance(0.3);
    timer.advance();
    timer.pause();
    assert!(timer.is_paused());
    assert_eq!(timer.state(), TimerState::Paused);
    assert_close(timer.time_elapsed(), 0.3);

    for _ in 0..5 {
        clock.advance(0.5);
        let step = timer.advance();
        assert!(!step.advanced);
        assert_close(timer.time_elapsed(), 0.3);
    }

    timer.resume();
    assert!(!timer.is_paused());
    assert_close(timer.time_elapsed(), 0.3);

    clock.advance(0.4);
    timer.advance();
    assert_close(timer.time_elapsed(), 0.7);
}

#[test]
fn test_resume_without_tick_preserves_elapsed() {
    let clock = Rc::new(ManualClock::new());
    let timer = make_timer(&clock, TimerRegistration::new(2.0));

    clock.advance(0.25);
    timer.pause();
    clock.advance(10.0);
    timer.resume();
    assert_close(timer.time_elapsed(), 0.25);
}

#[test]
fn test_pause_and_resume_are_idempotent() {
    let clock = Rc::new(ManualClock::new());
    let timer = make_timer(&clock, TimerRegistration::new(1.0));

    clock.advance(0.2);
    timer.pause();
    clock.advance(0.2);
    timer.pause();
    assert_close(timer.time_elapsed(), 0.2);

    timer.resume();
    clock.advance(0.1);
    timer.resume();
    assert_close(timer.time_elapsed(), 0.3);
}

#[test]
fn test_cancel_is_idempotent_and_suppresses_fire() {
    let clock = Rc::new(ManualClock::new());
    let fired = Rc::new(Cell::new(0));
    let timer = make_timer(
        &clock,
        TimerRegistration::new(1.0).on_complete(counting(&fired)),
    );

    clock.advance(0.2);
    timer.cancel();
    assert!(timer.is_cancelled());
    assert!(timer.is_done());
    assert_close(timer.time_elapsed(), 0.2);

    clock.advance(0.3);
    timer.cancel();
    assert_close(timer.time_elapsed(), 0.2);

    clock.advance(5.0);
    timer.advance();
    assert_eq!(fired.get(), 0);
    assert_close(timer.time_elapsed(), 0.2);
    assert_close(timer.time_remaining(), 0.8);
}

#[test]
fn test_cancel_replaces_pause_snapshot() {
    let clock = Rc::new(ManualClock::new());
    let timer = make_timer(&clock, TimerRegistration::new(1.0));

    clock.advance(0.4);
    timer.pause();
    clock.advance(0.4);
    timer.cancel();

    assert!(timer.is_cancelled());
    assert!(!timer.is_paused());
    assert_eq!(timer.state(), TimerState::Cancelled);
    assert_close(timer.time_elapsed(), 0.4);

    // 终态下的暂停、恢复均无效
    // Pause and resume are no-ops once done
    timer.resume();
    timer.pause();
    assert!(!timer.is_paused());
    assert_close(timer.time_elapsed(), 0.4);
}

#[test]
fn test_owner_expiry_skips_callbacks() {
    let clock = Rc::new(ManualClock::new());
    let fired = Rc::new(Cell::new(0));
    let updates = Rc::new(Cell::new(0));
    let owner = Rc::new(());
    let update_count = updates.clone();
    let timer = make_timer(
        &clock,
        TimerRegistration::new(1.0)
            .on_complete(counting(&fired))
            .on_update(move |_| update_count.set(update_count.get() + 1))
            .owned_by(Rc::downgrade(&owner)),
    );

    clock.advance(0.5);
    timer.advance();
    assert_eq!(updates.get(), 1);

    drop(owner);
    assert!(timer.is_owner_expired());
    assert!(timer.is_done());
    assert_eq!(timer.state(), TimerState::Expired);

    clock.advance(1.0);
    let step = timer.advance();
    assert!(!step.advanced);
    assert_eq!(updates.get(), 1);
    assert_eq!(fired.get(), 0);
    assert!(!timer.is_cancelled());
    assert!(!timer.is_completed());
}

#[test]
fn test_on_update_receives_elapsed() {
    let clock = Rc::new(ManualClock::new());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let timer = make_timer(
        &clock,
        TimerRegistration::new(1.0).on_update(move |elapsed| sink.borrow_mut().push(elapsed)),
    );

    for _ in 0..3 {
        clock.advance(0.25);
        timer.advance();
    }
    clock.advance(1.0);
    timer.advance();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);
    assert_close(seen[0], 0.25);
    assert_close(seen[1], 0.5);
    assert_close(seen[2], 0.75);
    assert_close(seen[3], 1.0);
}

#[test]
fn test_cancel_from_update_prevents_fire() {
    let clock = Rc::new(ManualClock::new());
    let fired = Rc::new(Cell::new(0));
    let slot: Rc<RefCell<Option<TimerHandle>>> = Rc::new(RefCell::new(None));
    let own = slot.clone();
    let timer = make_timer(
        &clock,
        TimerRegistration::new(1.0)
            .on_complete(counting(&fired))
            .on_update(move |_| {
                if let Some(timer) = own.borrow().as_ref() {
                    timer.cancel();
                }
            }),
    );
    *slot.borrow_mut() = Some(timer.clone());

    clock.advance(2.0);
    let step = timer.advance();
    assert!(!step.fired);
    assert_eq!(fired.get(), 0);
    assert!(timer.is_cancelled());

    // 打破引用环
    // Break the reference cycle
    slot.borrow_mut().take();
}

#[test]
fn test_pause_from_complete_still_completes() {
    let clock = Rc::new(ManualClock::new());
    let slot: Rc<RefCell<Option<TimerHandle>>> = Rc::new(RefCell::new(None));
    let own = slot.clone();
    let timer = make_timer(
        &clock,
        TimerRegistration::new(1.0).on_complete(move || {
            if let Some(timer) = own.borrow().as_ref() {
                timer.pause();
            }
        }),
    );
    *slot.borrow_mut() = Some(timer.clone());

    clock.advance(1.5);
    let step = timer.advance();
    assert!(step.fired);
    assert!(timer.is_completed());
    assert!(!timer.is_paused());
    assert_eq!(timer.state(), TimerState::Completed);
    assert_close(timer.time_elapsed(), 1.0);

    // 已完成的定时器不能再被恢复
    // A completed timer cannot be resumed
    timer.resume();
    assert!(timer.is_completed());
    assert!(!timer.advance().advanced);

    slot.borrow_mut().take();
}

#[test]
fn test_update_panic_on_fire_tick() {
    let clock = Rc::new(ManualClock::new());
    let fired = Rc::new(Cell::new(0));
    let registration = |fired: &Rc<Cell<u32>>| {
        TimerRegistration::new(1.0)
            .on_complete(counting(fired))
            .on_update(|_| panic!("bad update"))
    };

    // Propagate：进度回调 panic 后本帧结束，不再触发到期
    // Propagate: the step ends after the update panic, nothing fires
    let timer = make_timer(&clock, registration(&fired));
    clock.advance(1.0);
    let step = timer.advance_with(CallbackFailurePolicy::Propagate);
    assert!(step.advanced);
    assert!(!step.fired);
    assert_eq!(step.failures.len(), 1);
    assert_eq!(step.failures[0].callback, CallbackKind::Update);
    assert_eq!(step.failures[0].message, "bad update");
    assert_eq!(fired.get(), 0);
    assert!(!timer.is_completed());

    // Isolate：记录失败后照常到期
    // Isolate: the failure is recorded and the timer fires as usual
    let isolated = make_timer(&clock, registration(&fired));
    clock.advance(1.0);
    let step = isolated.advance_with(CallbackFailurePolicy::Isolate);
    assert!(step.fired);
    assert_eq!(step.failures.len(), 1);
    assert_eq!(fired.get(), 1);
    assert!(isolated.is_completed());
}

#[test]
fn test_zero_duration_fires_on_first_tick() {
    let clock = Rc::new(ManualClock::new());
    let fired = Rc::new(Cell::new(0));
    let timer = make_timer(
        &clock,
        TimerRegistration::new(0.0).on_complete(counting(&fired)),
    );

    let step = timer.advance();
    assert!(step.fired);
    assert_eq!(fired.get(), 1);
    assert!(timer.is_completed());
    assert_close(timer.ratio_complete(), 1.0);
    assert_close(timer.ratio_remaining(), 0.0);

    let negative = make_timer(&clock, TimerRegistration::new(-3.0));
    assert!(negative.advance().fired);
    assert_close(negative.time_elapsed(), 0.0);
    assert_close(negative.time_remaining(), 0.0);
}

#[test]
fn test_real_time_timer_ignores_time_scale() {
    let clock = Rc::new(ManualClock::new());
    let real = make_timer(&clock, TimerRegistration::new(1.0).real_time(true));
    let scaled = make_timer(&clock, TimerRegistration::new(1.0));
    assert!(real.uses_real_time());

    clock.set_time_scale(0.5).unwrap();
    clock.advance(0.8);
    real.advance();
    scaled.advance();

    assert_close(real.time_elapsed(), 0.8);
    assert_close(scaled.time_elapsed(), 0.4);
}

#[test]
fn test_panicking_callback_is_captured_and_restored() {
    let clock = Rc::new(ManualClock::new());
    let calls = Rc::new(Cell::new(0));
    let count = calls.clone();
    let timer = make_timer(
        &clock,
        TimerRegistration::new(1.0)
            .looped(true)
            .on_complete(move || {
                count.set(count.get() + 1);
                panic!("boom");
            }),
    );

    clock.advance(1.0);
    let step = timer.advance();
    assert!(step.fired);
    assert_eq!(step.failures.len(), 1);
    assert_eq!(step.failures[0].callback, CallbackKind::Complete);
    assert_eq!(step.failures[0].message, "boom");
    assert_close(timer.time_elapsed(), 0.0);

    // 回调在 panic 后仍然保留
    // The callback survives its own panic
    clock.advance(1.0);
    let step = timer.advance();
    assert_eq!(calls.get(), 2);
    assert_eq!(step.failures.len(), 1);
}

#[test]
fn test_elapsed_invariants_hold_under_random_operations() {
    let mut rng = rand::rng();
    for _ in 0..50 {
        let clock = Rc::new(ManualClock::new());
        let duration = rng.random_range(0.1..3.0);
        let timer = make_timer(
            &clock,
            TimerRegistration::new(duration).looped(rng.random_bool(0.5)),
        );

        for _ in 0..40 {
            clock.advance(rng.random_range(0.0..0.5));
            match rng.random_range(0..10) {
                0 => timer.pause(),
                1 => timer.resume(),
                2 if rng.random_bool(0.2) => timer.cancel(),
                _ => {
                    timer.advance();
                }
            }

            let elapsed = timer.time_elapsed();
            assert!((0.0..=duration).contains(&elapsed));
            assert!((elapsed + timer.time_remaining() - duration).abs() < EPSILON);
            assert_eq!(
                timer.is_done(),
                timer.is_completed() || timer.is_cancelled() || timer.is_owner_expired()
            );
        }
    }
}
