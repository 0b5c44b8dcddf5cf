//! Single-threaded scheduler that owns pending re-runs.
//!
//! ## Usage
//!
//! Create one [`Scheduler`] per UI thread, create computations with
//! [`Scheduler::run`], and call [`Scheduler::flush`] on every scheduling tick.
//! Hosts with their own event loop can install a flush request hook so that a
//! tick is scheduled whenever work is queued.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    rc::{Rc, Weak},
};

use tracing::{debug, warn};

use crate::{
    ReactiveError,
    computation::{Computation, ComputationResult},
    context::{current, is_active, nonreactive},
};

type AfterFlush = Box<dyn FnOnce() -> ComputationResult>;
type FlushHook = Rc<dyn Fn()>;

#[derive(Default)]
pub(crate) struct SchedulerInner {
    pending: RefCell<VecDeque<Computation>>,
    after_flush: RefCell<VecDeque<AfterFlush>>,
    flushing: Cell<bool>,
    flush_requested: Cell<bool>,
    flush_hook: RefCell<Option<FlushHook>>,
}

impl SchedulerInner {
    pub(crate) fn enqueue(&self, computation: Computation) {
        self.pending.borrow_mut().push_back(computation);
        self.request_flush();
    }

    fn request_flush(&self) {
        if self.flushing.get() || self.flush_requested.replace(true) {
            return;
        }
        let hook = self.flush_hook.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn pop_pending(&self) -> Option<Computation> {
        self.pending.borrow_mut().pop_front()
    }

    fn pop_after_flush(&self) -> Option<AfterFlush> {
        self.after_flush.borrow_mut().pop_front()
    }
}

/// Cheap-to-clone handle to a computation scheduler.
///
/// All computations created through one scheduler share its re-run queue.
/// The scheduler is not `Send`: every computation runs on the thread that
/// owns it.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.inner.pending.borrow().len())
            .field("after_flush", &self.inner.after_flush.borrow().len())
            .field("flushing", &self.inner.flushing.get())
            .finish()
    }
}

/// Non-owning handle to a [`Scheduler`].
#[derive(Clone, Default)]
pub struct WeakScheduler {
    inner: Weak<SchedulerInner>,
}

impl WeakScheduler {
    /// Returns the scheduler if it is still alive.
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.inner.upgrade().map(|inner| Scheduler { inner })
    }
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a non-owning handle, for hooks stored inside the scheduler.
    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Installs a hook that is called once whenever work is queued while no
    /// flush is pending. The hook is expected to arrange a call to
    /// [`Scheduler::flush`] on a later tick.
    pub fn set_flush_hook(&self, hook: impl Fn() + 'static) {
        *self.inner.flush_hook.borrow_mut() = Some(Rc::new(hook));
    }

    /// Runs `body` once, synchronously, as a new computation.
    ///
    /// Every dependency read during the body subscribes the returned
    /// computation; the body runs again on the next flush after any of them
    /// changes. When called while another computation is running, the new
    /// computation is stopped as soon as the outer one is invalidated.
    ///
    /// A body that fails on its first run leaves the computation stopped.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::{cell::Cell, rc::Rc};
    /// use wayline_reactive::{Dependency, Scheduler};
    ///
    /// let scheduler = Scheduler::new();
    /// let dep = Dependency::new();
    /// let runs = Rc::new(Cell::new(0));
    ///
    /// let computation = scheduler
    ///     .run({
    ///         let dep = dep.clone();
    ///         let runs = runs.clone();
    ///         move |_| {
    ///             dep.depend();
    ///             runs.set(runs.get() + 1);
    ///             Ok(())
    ///         }
    ///     })
    ///     .unwrap();
    ///
    /// dep.changed();
    /// scheduler.flush().unwrap();
    /// assert_eq!(runs.get(), 2);
    /// computation.stop();
    /// ```
    pub fn run<F>(&self, body: F) -> Result<Computation, ReactiveError>
    where
        F: FnMut(&Computation) -> ComputationResult + 'static,
    {
        let parent = current();
        let computation = Computation::new(Rc::downgrade(&self.inner), Box::new(body));
        debug!(computation = %computation.id(), nested = parent.is_some(), "computation created");

        if let Err(source) = computation.compute() {
            computation.stop();
            return Err(ReactiveError::FirstRun {
                id: computation.id(),
                source,
            });
        }

        if let Some(parent) = parent {
            let child = computation.clone();
            parent.on_invalidate(move |_| child.stop());
        }
        Ok(computation)
    }

    /// Queues `f` to run at the end of the next flush.
    pub fn after_flush(&self, f: impl FnOnce() -> ComputationResult + 'static) {
        self.inner.after_flush.borrow_mut().push_back(Box::new(f));
        self.inner.request_flush();
    }

    /// Whether any re-run or after-flush callback is waiting.
    pub fn has_pending(&self) -> bool {
        !self.inner.pending.borrow().is_empty() || !self.inner.after_flush.borrow().is_empty()
    }

    /// Whether a flush is currently in progress.
    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }

    /// Re-runs every invalidated computation, then drains after-flush
    /// callbacks.
    ///
    /// Re-runs triggered during the flush are processed by the same flush.
    /// The first failing body or callback ends the flush; anything still
    /// queued stays queued for the next one.
    pub fn flush(&self) -> Result<(), ReactiveError> {
        if self.inner.flushing.get() || is_active() {
            warn!("flush requested from inside a flush or a running computation");
            return Err(ReactiveError::ReentrantFlush);
        }

        struct FlushGuard<'a>(&'a SchedulerInner);
        impl Drop for FlushGuard<'_> {
            fn drop(&mut self) {
                self.0.flushing.set(false);
                self.0.flush_requested.set(false);
            }
        }

        self.inner.flushing.set(true);
        let guard = FlushGuard(&self.inner);
        let result = self.drain();
        drop(guard);

        if result.is_err() && self.has_pending() {
            self.inner.request_flush();
        }
        result
    }

    fn drain(&self) -> Result<(), ReactiveError> {
        loop {
            while let Some(computation) = self.inner.pop_pending() {
                let result = computation.recompute();
                if computation.needs_recompute() {
                    self.inner.pending.borrow_mut().push_front(computation.clone());
                }
                if let Err(source) = result {
                    return Err(ReactiveError::Recompute {
                        id: computation.id(),
                        source,
                    });
                }
            }

            let Some(callback) = self.inner.pop_after_flush() else {
                return Ok(());
            };
            nonreactive(callback).map_err(|source| ReactiveError::AfterFlush { source })?;
        }
    }
}
