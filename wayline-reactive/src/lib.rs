//! Dependency-tracked computations for wayline.
//!
//! A [`Computation`] runs a body, records which [`Dependency`] values the body
//! read, and re-runs on the next [`Scheduler::flush`] after any of them
//! changes. Everything runs on one thread; "later" only ever means a later
//! flush.
//!
//! ```
//! use std::{cell::Cell, rc::Rc};
//! use wayline_reactive::{Dependency, Scheduler};
//!
//! let scheduler = Scheduler::new();
//! let dep = Dependency::new();
//! let seen = Rc::new(Cell::new(0));
//!
//! let computation = scheduler
//!     .run({
//!         let dep = dep.clone();
//!         let seen = seen.clone();
//!         move |_| {
//!             dep.depend();
//!             seen.set(seen.get() + 1);
//!             Ok(())
//!         }
//!     })
//!     .unwrap();
//!
//! computation.on_invalidate(|c| assert!(c.is_invalidated()));
//! dep.changed();
//! scheduler.flush().unwrap();
//! assert_eq!(seen.get(), 2);
//!
//! computation.stop();
//! dep.changed();
//! scheduler.flush().unwrap();
//! assert_eq!(seen.get(), 2);
//! ```
#![deny(missing_docs, clippy::unwrap_used)]

mod computation;
mod context;
mod dependency;
mod error;
mod scheduler;

pub use computation::{BoxError, Computation, ComputationId, ComputationResult};
pub use context::{current, is_active, nonreactive};
pub use dependency::Dependency;
pub use error::ReactiveError;
pub use scheduler::{Scheduler, WeakScheduler};
