//! Re-runnable units of reactive work.
//!
//! A [`Computation`] wraps a body closure. The body runs once when the
//! computation is created by [`Scheduler::run`](crate::Scheduler::run) and again
//! on every scheduler flush that follows an invalidation, until the computation
//! is stopped.
//!
//! # Lifecycle
//!
//! - `invalidate()` marks the computation stale, queues it for re-run (unless
//!   stopped), and fires its invalidation callbacks exactly once.
//! - `stop()` invalidates (if not already invalidated), fires stop callbacks,
//!   and releases the body. A stopped computation never runs again.

use std::{
    cell::{Cell, RefCell},
    error::Error,
    fmt,
    mem,
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
};

use smallvec::SmallVec;
use tracing::debug;

use crate::{
    context::{nonreactive, with_current},
    scheduler::SchedulerInner,
};

static NEXT_COMPUTATION_ID: AtomicU64 = AtomicU64::new(1);

/// Boxed error surfaced from computation bodies and flush callbacks.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The result type returned by computation bodies.
pub type ComputationResult = Result<(), BoxError>;

pub(crate) type Body = Box<dyn FnMut(&Computation) -> ComputationResult>;
type Callback = Box<dyn FnOnce(&Computation)>;

/// Stable identifier for one computation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ComputationId(u64);

impl ComputationId {
    fn new() -> Self {
        Self(NEXT_COMPUTATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct ComputationInner {
    id: ComputationId,
    stopped: Cell<bool>,
    invalidated: Cell<bool>,
    first_run: Cell<bool>,
    recomputing: Cell<bool>,
    body: RefCell<Option<Body>>,
    invalidate_callbacks: RefCell<SmallVec<[Callback; 2]>>,
    stop_callbacks: RefCell<SmallVec<[Callback; 1]>>,
    scheduler: Weak<SchedulerInner>,
}

/// Handle to one reactive execution.
///
/// Cloning a `Computation` creates a new handle to the same execution.
#[derive(Clone)]
pub struct Computation {
    inner: Rc<ComputationInner>,
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("id", &self.inner.id)
            .field("stopped", &self.inner.stopped.get())
            .field("invalidated", &self.inner.invalidated.get())
            .field("first_run", &self.inner.first_run.get())
            .finish()
    }
}

impl PartialEq for Computation {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Computation {}

impl Computation {
    pub(crate) fn new(scheduler: Weak<SchedulerInner>, body: Body) -> Self {
        Self {
            inner: Rc::new(ComputationInner {
                id: ComputationId::new(),
                stopped: Cell::new(false),
                invalidated: Cell::new(false),
                first_run: Cell::new(true),
                recomputing: Cell::new(false),
                body: RefCell::new(Some(body)),
                invalidate_callbacks: RefCell::new(SmallVec::new()),
                stop_callbacks: RefCell::new(SmallVec::new()),
                scheduler,
            }),
        }
    }

    /// Identifier of this computation.
    pub fn id(&self) -> ComputationId {
        self.inner.id
    }

    /// Whether the computation has been stopped for good.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.get()
    }

    /// Whether the computation is stale and waiting for a re-run or teardown.
    pub fn is_invalidated(&self) -> bool {
        self.inner.invalidated.get()
    }

    /// Whether the body is executing for the first time.
    pub fn is_first_run(&self) -> bool {
        self.inner.first_run.get()
    }

    /// Marks the computation stale.
    ///
    /// A live computation is queued for re-run on the next flush. Invalidation
    /// callbacks run synchronously, once.
    pub fn invalidate(&self) {
        if self.inner.invalidated.replace(true) {
            return;
        }

        if !self.inner.recomputing.get() && !self.inner.stopped.get() {
            if let Some(scheduler) = self.inner.scheduler.upgrade() {
                scheduler.enqueue(self.clone());
            }
        }

        let callbacks = mem::take(&mut *self.inner.invalidate_callbacks.borrow_mut());
        for callback in callbacks {
            nonreactive(|| callback(self));
        }
    }

    /// Stops the computation permanently.
    ///
    /// Fires the invalidation callbacks (if the computation was not already
    /// invalidated) and then the stop callbacks. Stopping twice is a no-op.
    pub fn stop(&self) {
        if self.inner.stopped.replace(true) {
            return;
        }
        debug!(computation = %self.inner.id, "computation stopped");

        self.invalidate();

        let callbacks = mem::take(&mut *self.inner.stop_callbacks.borrow_mut());
        for callback in callbacks {
            nonreactive(|| callback(self));
        }

        // The body is absent while it executes; `compute` drops it afterwards.
        let body = self.inner.body.borrow_mut().take();
        drop(body);
    }

    /// Registers `f` to run the first time this computation is invalidated.
    ///
    /// If the computation is already invalidated `f` runs immediately.
    pub fn on_invalidate(&self, f: impl FnOnce(&Computation) + 'static) {
        if self.inner.invalidated.get() {
            nonreactive(|| f(self));
        } else {
            self.inner
                .invalidate_callbacks
                .borrow_mut()
                .push(Box::new(f));
        }
    }

    /// Registers `f` to run when this computation is stopped.
    ///
    /// If the computation is already stopped `f` runs immediately.
    pub fn on_stop(&self, f: impl FnOnce(&Computation) + 'static) {
        if self.inner.stopped.get() {
            nonreactive(|| f(self));
        } else {
            self.inner.stop_callbacks.borrow_mut().push(Box::new(f));
        }
    }

    pub(crate) fn needs_recompute(&self) -> bool {
        self.inner.invalidated.get() && !self.inner.stopped.get()
    }

    /// Runs the body once as the current computation.
    pub(crate) fn compute(&self) -> ComputationResult {
        self.inner.invalidated.set(false);
        let Some(mut body) = self.inner.body.borrow_mut().take() else {
            return Ok(());
        };

        let result = with_current(Some(self.clone()), || body(self));
        self.inner.first_run.set(false);

        if !self.inner.stopped.get() {
            *self.inner.body.borrow_mut() = Some(body);
        }
        result
    }

    /// Re-runs the body from a scheduler flush.
    pub(crate) fn recompute(&self) -> ComputationResult {
        if !self.needs_recompute() {
            return Ok(());
        }
        debug!(computation = %self.inner.id, "recomputing");
        self.inner.recomputing.set(true);
        let result = self.compute();
        self.inner.recomputing.set(false);
        result
    }
}
