use thiserror::Error;
use wayline_reactive::{BoxError, ReactiveError};

/// Errors returned by [`ClientRouter`](crate::ClientRouter).
#[derive(Debug, Error)]
pub enum NavigationError {
    /// `go` was called with a name the route table does not know.
    #[error("no route named `{name}`")]
    UnknownRoute {
        /// The requested route name.
        name: String,
    },
    /// The named route could not build a path from the given parameters.
    #[error("route `{name}` could not build a path")]
    ReversePath {
        /// The route name.
        name: String,
        /// Error returned by the route.
        #[source]
        source: BoxError,
    },
    /// A controller failed while handling `path`.
    #[error("controller for `{path}` failed")]
    Route {
        /// The dispatched path.
        path: String,
        /// Error returned by the controller.
        #[source]
        source: BoxError,
    },
    /// Auto-render was requested but no document root was configured.
    #[error("auto-render requires a document root")]
    MissingDocumentRoot,
    /// The reactive layer failed.
    #[error(transparent)]
    Reactive(ReactiveError),
}
