//! Route table interfaces.
//!
//! Path matching and route registration belong to the route table; the
//! router only needs to resolve a path to a [`Controller`] and to look routes
//! up by name.

use std::{collections::BTreeMap, rc::Rc};

use serde_json::Value;
use wayline_reactive::{BoxError, Computation};

use crate::layout::LayoutControl;

/// Options carried by a navigation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing one.
    pub replace_state: bool,
    /// Opaque state attached to the history entry.
    pub state: Option<Value>,
}

impl NavigateOptions {
    /// Options that replace the current history entry.
    pub fn replace() -> Self {
        Self {
            replace_state: true,
            ..Default::default()
        }
    }

    /// Attaches `state` to the navigation.
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }
}

/// Parameters used to build a path from a named route.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum RouteParams {
    /// No parameters.
    #[default]
    None,
    /// Parameters matched to path segments by position.
    Positional(Vec<String>),
    /// Parameters matched to path segments by name.
    Named(BTreeMap<String, String>),
}

impl RouteParams {
    /// Looks up a parameter by name, falling back to its position.
    pub fn get(&self, name: &str, position: usize) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Positional(values) => values.get(position).map(String::as_str),
            Self::Named(values) => values.get(name).map(String::as_str),
        }
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Positional(values) => values.is_empty(),
            Self::Named(values) => values.is_empty(),
        }
    }
}

impl From<()> for RouteParams {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl<T: ToString> From<Vec<T>> for RouteParams {
    fn from(values: Vec<T>) -> Self {
        Self::Positional(values.iter().map(ToString::to_string).collect())
    }
}

impl<T: ToString, const N: usize> From<[T; N]> for RouteParams {
    fn from(values: [T; N]) -> Self {
        Self::Positional(values.iter().map(ToString::to_string).collect())
    }
}

impl From<BTreeMap<String, String>> for RouteParams {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self::Named(values)
    }
}

/// How a controller decided to handle its path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Handling {
    /// The client handles the route; the navigation is committed.
    Client,
    /// The route must be served by the server; the router falls back to a
    /// full navigation.
    Server,
}

/// Everything a controller sees while it runs.
pub struct RouteContext<'a> {
    path: &'a str,
    options: &'a NavigateOptions,
    layout: &'a dyn LayoutControl,
    computation: Option<&'a Computation>,
}

impl<'a> RouteContext<'a> {
    pub(crate) fn new(
        path: &'a str,
        options: &'a NavigateOptions,
        layout: &'a dyn LayoutControl,
        computation: Option<&'a Computation>,
    ) -> Self {
        Self {
            path,
            options,
            layout,
            computation,
        }
    }

    /// The path being dispatched.
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Options of the navigation.
    pub fn options(&self) -> &'a NavigateOptions {
        self.options
    }

    /// History state of the navigation.
    pub fn state(&self) -> Option<&'a Value> {
        self.options.state.as_ref()
    }

    /// Layout regions the controller renders into.
    pub fn layout(&self) -> &'a dyn LayoutControl {
        self.layout
    }

    /// The route computation, when the controller runs reactively.
    pub fn computation(&self) -> Option<&'a Computation> {
        self.computation
    }
}

/// The executable representation of a matched route.
pub trait Controller {
    /// Whether the controller re-runs when data it read changes.
    fn is_reactive(&self) -> bool {
        true
    }

    /// Runs the route action.
    fn run(&self, cx: &RouteContext<'_>) -> Result<Handling, BoxError>;
}

impl<F> Controller for F
where
    F: Fn(&RouteContext<'_>) -> Result<Handling, BoxError>,
{
    fn run(&self, cx: &RouteContext<'_>) -> Result<Handling, BoxError> {
        self(cx)
    }
}

/// Wraps a controller so that it runs once per dispatch, without a route
/// computation.
pub struct OneShot<C>(pub C);

impl<C: Controller> Controller for OneShot<C> {
    fn is_reactive(&self) -> bool {
        false
    }

    fn run(&self, cx: &RouteContext<'_>) -> Result<Handling, BoxError> {
        self.0.run(cx)
    }
}

/// A named route.
pub trait Route {
    /// Name used by [`ClientRouter::go`](crate::ClientRouter::go).
    fn name(&self) -> &str;

    /// Builds the concrete path for `params`.
    fn path(&self, params: &RouteParams, options: &NavigateOptions) -> Result<String, BoxError>;

    /// Creates the controller for `path`.
    fn controller(&self, path: &str, options: &NavigateOptions) -> Rc<dyn Controller>;
}

/// The route table the router dispatches against.
pub trait RouteTable {
    /// Resolves `path` to a controller, or `None` when no client route
    /// matches.
    fn resolve(&self, path: &str, options: &NavigateOptions) -> Option<Rc<dyn Controller>>;

    /// Looks up a route by name.
    fn route(&self, name: &str) -> Option<Rc<dyn Route>>;
}
