//! Location sources: where the router reads the current path from and pushes
//! new paths to.
//!
//! ## Usage
//!
//! Use [`MemoryLocation`] off the browser (tests, native shells, server-side
//! previews) and `BrowserLocation` on `wasm` targets.

use std::cell::RefCell;

use serde_json::Value;
use tracing::{debug, info};
use wayline_reactive::{Dependency, nonreactive};

/// The current path and the opaque state attached to its history entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Location {
    /// Path component of the location, e.g. `/posts/1`.
    pub pathname: String,
    /// State stored with the history entry, passed through untouched.
    pub state: Option<Value>,
}

impl Location {
    /// Creates a location without state.
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            state: None,
        }
    }
}

/// Options for [`LocationSource::set`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace_state: bool,
    /// State to attach to the history entry.
    pub state: Option<Value>,
    /// Update the location without notifying reactive readers.
    ///
    /// Used when the caller has already dispatched the navigation itself.
    pub skip_reactive: bool,
}

/// Exposes the current location and accepts new ones.
pub trait LocationSource {
    /// Returns the current location.
    ///
    /// Reading inside a computation subscribes it to later changes.
    fn get(&self) -> Location;

    /// Returns the current location without subscribing.
    fn get_untracked(&self) -> Location {
        nonreactive(|| self.get())
    }

    /// Moves to `path`.
    ///
    /// Pushing the current path with unchanged state is a no-op.
    fn set(&self, path: &str, options: &SetOptions);

    /// Leaves the application with a full, non-reactive navigation to `path`.
    fn navigate_away(&self, path: &str);
}

#[derive(Debug)]
struct History {
    entries: Vec<Location>,
    index: usize,
    external: Vec<String>,
}

/// In-memory history stack.
///
/// Mirrors the browser model: `set` pushes or replaces entries, `back` and
/// `forward` move through them and notify readers like a `popstate` would.
/// Full navigations are recorded instead of performed.
#[derive(Debug)]
pub struct MemoryLocation {
    history: RefCell<History>,
    dependency: Dependency,
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryLocation {
    /// Creates a history with a single entry at `initial_path`.
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            history: RefCell::new(History {
                entries: vec![Location::new(initial_path)],
                index: 0,
                external: Vec::new(),
            }),
            dependency: Dependency::new(),
        }
    }

    /// Moves one entry back. Returns `false` at the start of history.
    pub fn back(&self) -> bool {
        self.step(-1)
    }

    /// Moves one entry forward. Returns `false` at the end of history.
    pub fn forward(&self) -> bool {
        self.step(1)
    }

    /// Whether [`back`](Self::back) would move.
    pub fn can_go_back(&self) -> bool {
        self.history.borrow().index > 0
    }

    /// Whether [`forward`](Self::forward) would move.
    pub fn can_go_forward(&self) -> bool {
        let history = self.history.borrow();
        history.index + 1 < history.entries.len()
    }

    /// Snapshot of all history entries, oldest first.
    pub fn entries(&self) -> Vec<Location> {
        self.history.borrow().entries.clone()
    }

    /// Index of the current entry in [`entries`](Self::entries).
    pub fn index(&self) -> usize {
        self.history.borrow().index
    }

    /// Paths handed to [`LocationSource::navigate_away`], in order.
    pub fn external_navigations(&self) -> Vec<String> {
        self.history.borrow().external.clone()
    }

    fn step(&self, delta: isize) -> bool {
        {
            let mut history = self.history.borrow_mut();
            let Some(target) = history.index.checked_add_signed(delta) else {
                return false;
            };
            if target >= history.entries.len() {
                return false;
            }
            history.index = target;
            debug!(path = %history.entries[target].pathname, "history traversal");
        }
        self.dependency.changed();
        true
    }
}

impl LocationSource for MemoryLocation {
    fn get(&self) -> Location {
        self.dependency.depend();
        let history = self.history.borrow();
        history.entries[history.index].clone()
    }

    fn set(&self, path: &str, options: &SetOptions) {
        let entry = Location {
            pathname: path.to_owned(),
            state: options.state.clone(),
        };
        {
            let mut history = self.history.borrow_mut();
            let index = history.index;
            if history.entries[index] == entry {
                return;
            }
            if options.replace_state {
                history.entries[index] = entry;
            } else {
                history.entries.truncate(index + 1);
                history.entries.push(entry);
                history.index = index + 1;
            }
        }
        debug!(
            path,
            replace = options.replace_state,
            skip_reactive = options.skip_reactive,
            "location set"
        );

        if !options.skip_reactive {
            self.dependency.changed();
        }
    }

    fn navigate_away(&self, path: &str) {
        info!(path, "full navigation");
        self.history.borrow_mut().external.push(path.to_owned());
    }
}
