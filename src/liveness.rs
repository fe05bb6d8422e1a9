//! 所有者存活检查
//! Owner liveness checks
//!
//! 定时器可以绑定一个宿主对象。对象被销毁后，定时器静默结束，不再调用任何回调。
//!
//! A timer may be bound to a host object. Once the object is destroyed the
//! timer silently becomes done and never invokes a callback again.

use std::fmt;

/// 回答“被引用的宿主对象是否仍然存活”
/// Answers "is the referenced host object still alive?"
pub trait Liveness {
    fn is_alive(&self) -> bool;
}

impl<T: ?Sized> Liveness for std::rc::Weak<T> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

impl<T: ?Sized> Liveness for std::sync::Weak<T> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

/// 将闭包适配为 [`Liveness`]，用于宿主自带生命周期系统的场景。
/// Adapts a closure into a [`Liveness`] check, for hosts with their own
/// object lifecycle system.
pub struct AliveFn<F>(pub F);

impl<F: Fn() -> bool> Liveness for AliveFn<F> {
    fn is_alive(&self) -> bool {
        (self.0)()
    }
}

impl<F> fmt::Debug for AliveFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AliveFn").field(&"<closure>").finish()
    }
}
