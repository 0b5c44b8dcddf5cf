//! Tracks which computation is currently running on this thread.
//!
//! Reads of a [`Dependency`](crate::Dependency) subscribe whatever computation
//! sits on top of this stack. `None` layers mark untracked regions.

use std::cell::RefCell;

use crate::computation::Computation;

thread_local! {
    /// Stack of computations being executed on the current thread.
    static COMPUTATION_STACK: RefCell<Vec<Option<Computation>>> = const { RefCell::new(Vec::new()) };
}

fn push_layer(layer: Option<Computation>) {
    COMPUTATION_STACK.with(|stack| stack.borrow_mut().push(layer));
}

fn pop_layer() {
    COMPUTATION_STACK.with(|stack| {
        let popped = stack.borrow_mut().pop();
        debug_assert!(popped.is_some(), "Computation stack underflow");
    });
}

/// Runs `f` with `layer` as the current computation.
pub(crate) fn with_current<R>(layer: Option<Computation>, f: impl FnOnce() -> R) -> R {
    struct LayerGuard;
    impl Drop for LayerGuard {
        fn drop(&mut self) {
            pop_layer();
        }
    }

    push_layer(layer);
    let guard = LayerGuard;
    let result = f();
    drop(guard);
    result
}

/// Returns the computation currently running on this thread, if any.
pub fn current() -> Option<Computation> {
    COMPUTATION_STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Whether a computation is currently running and tracking reads.
pub fn is_active() -> bool {
    COMPUTATION_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
}

/// Runs `f` without tracking any dependency reads.
///
/// # Examples
///
/// ```
/// use wayline_reactive::{Dependency, Scheduler, nonreactive};
///
/// let scheduler = Scheduler::new();
/// let dep = Dependency::new();
/// let computation = scheduler
///     .run({
///         let dep = dep.clone();
///         move |_| {
///             nonreactive(|| dep.depend());
///             Ok(())
///         }
///     })
///     .expect("first run succeeds");
/// assert!(!dep.has_dependents());
/// computation.stop();
/// ```
pub fn nonreactive<R>(f: impl FnOnce() -> R) -> R {
    with_current(None, f)
}
