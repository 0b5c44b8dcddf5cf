//! Reactive sources that computations subscribe to.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    rc::Rc,
};

use crate::{
    computation::{Computation, ComputationId},
    context::current,
};

type Dependents = Rc<RefCell<BTreeMap<ComputationId, Computation>>>;

/// A change-notification point.
///
/// Readers call [`depend`](Dependency::depend) (or
/// [`depend_on`](Dependency::depend_on)) when they read the guarded value;
/// writers call [`changed`](Dependency::changed) after mutating it. Every
/// subscribed computation is invalidated in creation order. A subscription
/// lasts until the computation is next invalidated.
#[derive(Clone, Default)]
pub struct Dependency {
    dependents: Dependents,
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("dependents", &self.dependents.borrow().len())
            .finish()
    }
}

impl Dependency {
    /// Creates a dependency with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes the currently running computation.
    ///
    /// Returns `true` when a new subscription was made, `false` when there is
    /// no current computation or it is already subscribed.
    pub fn depend(&self) -> bool {
        match current() {
            Some(computation) => self.depend_on(&computation),
            None => false,
        }
    }

    /// Subscribes an explicit computation.
    pub fn depend_on(&self, computation: &Computation) -> bool {
        let id = computation.id();
        if self.dependents.borrow().contains_key(&id) {
            return false;
        }
        self.dependents
            .borrow_mut()
            .insert(id, computation.clone());

        let dependents = Rc::downgrade(&self.dependents);
        computation.on_invalidate(move |computation| {
            if let Some(dependents) = dependents.upgrade() {
                dependents.borrow_mut().remove(&computation.id());
            }
        });
        true
    }

    /// Invalidates every subscribed computation.
    pub fn changed(&self) {
        let targets: Vec<Computation> = self.dependents.borrow().values().cloned().collect();
        for computation in targets {
            computation.invalidate();
        }
    }

    /// Whether any computation is subscribed.
    pub fn has_dependents(&self) -> bool {
        !self.dependents.borrow().is_empty()
    }
}
