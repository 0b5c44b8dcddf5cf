//! # wayline
//!
//! A reactive client-side navigation controller.
//!
//! [`ClientRouter`] watches a [`LocationSource`], resolves the current path
//! through a [`RouteTable`], and runs the matching [`Controller`] inside a
//! route computation, so the route re-renders whenever reactive data it read
//! changes. Navigations the client cannot handle fall back to a full page
//! load.
//!
//! ## Usage
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//!
//! use wayline::{
//!     ClientRouter, Controller, Handling, LayoutControl, LayoutSink, MemoryLocation,
//!     NavigateOptions, Route, RouteContext, RouteTable,
//! };
//! use wayline::wayline_reactive::{BoxError, Scheduler};
//!
//! #[derive(Default)]
//! struct Page(RefCell<String>);
//!
//! impl LayoutControl for Page {
//!     fn set_layout(&self, _layout: &str) {}
//!     fn set_template(&self, template: &str, _region: Option<&str>) {
//!         *self.0.borrow_mut() = template.to_owned();
//!     }
//!     fn set_data(&self, _data: serde_json::Value) {}
//! }
//!
//! impl LayoutSink for Page {
//!     type Output = String;
//!
//!     fn render_layout(&self) -> String {
//!         self.0.borrow().clone()
//!     }
//! }
//!
//! fn show_home(cx: &RouteContext<'_>) -> Result<Handling, BoxError> {
//!     cx.layout().set_template("home", None);
//!     Ok(Handling::Client)
//! }
//!
//! struct Home;
//!
//! impl RouteTable for Home {
//!     fn resolve(&self, path: &str, _options: &NavigateOptions) -> Option<Rc<dyn Controller>> {
//!         (path == "/").then(|| Rc::new(show_home) as Rc<dyn Controller>)
//!     }
//!
//!     fn route(&self, _name: &str) -> Option<Rc<dyn Route>> {
//!         None
//!     }
//! }
//!
//! let location = Rc::new(MemoryLocation::new("/"));
//! let router = ClientRouter::builder(
//!     Scheduler::new(),
//!     Rc::new(Home),
//!     location.clone(),
//!     Rc::new(Page::default()),
//! )
//! .build();
//!
//! router.start()?;
//! assert_eq!(router.render(), "home");
//!
//! router.go("/elsewhere", (), NavigateOptions::default())?;
//! assert!(!router.is_started());
//! assert_eq!(location.external_navigations(), ["/elsewhere"]);
//! # Ok::<(), wayline::NavigationError>(())
//! ```
#![deny(missing_docs, clippy::unwrap_used)]

#[cfg(target_family = "wasm")]
mod browser;
mod config;
mod error;
mod layout;
mod location;
mod route;
mod router;

#[cfg(target_family = "wasm")]
pub use browser::{BodyRoot, BrowserLocation, spawn_flush};
pub use config::RouterConfig;
pub use error::NavigationError;
pub use layout::{DocumentRoot, LayoutControl, LayoutSink};
pub use location::{Location, LocationSource, MemoryLocation, SetOptions};
pub use route::{
    Controller, Handling, NavigateOptions, OneShot, Route, RouteContext, RouteParams, RouteTable,
};
pub use router::{ClientRouter, ClientRouterBuilder, OnComplete};
pub use wayline_reactive;
