//! Client-side navigation controller.
//!
//! [`ClientRouter`] keeps the current location and the active route in sync.
//!
//! # Responsibilities
//!
//! - Own the location computation that re-dispatches whenever the location
//!   changes (`start`/`stop`).
//! - Own the route computation that re-runs a reactive controller whenever
//!   data it read changes, and replace it strictly sequentially on every
//!   dispatch.
//! - Translate `go` calls into dispatches and commit the new location only
//!   once the route is known to be handled on the client.
//! - Fall back to a full navigation when no client route matches.
//!
//! There is no global router: build one per application and hand clones of
//! it to whatever code needs to navigate.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use tracing::{debug, error, info};
use wayline_reactive::{Computation, ReactiveError, Scheduler, nonreactive};

use crate::{
    NavigationError, RouterConfig,
    layout::{DocumentRoot, LayoutControl, LayoutSink},
    location::{LocationSource, SetOptions},
    route::{Controller, Handling, NavigateOptions, RouteContext, RouteParams, RouteTable},
};

/// Callback invoked once a dispatch is confirmed to be handled on the client.
pub type OnComplete = Rc<dyn Fn()>;

struct RouterInner<S: LayoutSink> {
    scheduler: Scheduler,
    routes: Rc<dyn RouteTable>,
    location: Rc<dyn LocationSource>,
    layout: Rc<S>,
    document_root: Option<Box<dyn DocumentRoot<S::Output>>>,
    config: RouterConfig,
    is_started: Cell<bool>,
    is_rendered: Cell<bool>,
    startup_released: Cell<bool>,
    route_computation: RefCell<Option<Computation>>,
    location_computation: RefCell<Option<Computation>>,
}

/// Reactive navigation controller.
///
/// Cloning a `ClientRouter` creates a new handle to the same router.
pub struct ClientRouter<S: LayoutSink> {
    inner: Rc<RouterInner<S>>,
}

impl<S: LayoutSink> Clone for ClientRouter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: LayoutSink> fmt::Debug for ClientRouter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRouter")
            .field("config", &self.inner.config)
            .field("is_started", &self.inner.is_started.get())
            .field("is_rendered", &self.inner.is_rendered.get())
            .field("route_computation", &self.inner.route_computation.borrow())
            .field("location_computation", &self.inner.location_computation.borrow())
            .finish()
    }
}

/// Builder for [`ClientRouter`].
pub struct ClientRouterBuilder<S: LayoutSink> {
    scheduler: Scheduler,
    routes: Rc<dyn RouteTable>,
    location: Rc<dyn LocationSource>,
    layout: Rc<S>,
    document_root: Option<Box<dyn DocumentRoot<S::Output>>>,
    config: RouterConfig,
}

impl<S: LayoutSink + 'static> ClientRouterBuilder<S> {
    /// Overrides the router configuration.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the element that [`ClientRouter::auto_render`] attaches to.
    pub fn document_root(mut self, root: impl DocumentRoot<S::Output> + 'static) -> Self {
        self.document_root = Some(Box::new(root));
        self
    }

    /// Builds the router. Nothing is rendered or dispatched until
    /// [`ClientRouter::startup`] or [`ClientRouter::start`] is called.
    pub fn build(self) -> ClientRouter<S> {
        ClientRouter {
            inner: Rc::new(RouterInner {
                scheduler: self.scheduler,
                routes: self.routes,
                location: self.location,
                layout: self.layout,
                document_root: self.document_root,
                config: self.config,
                is_started: Cell::new(false),
                is_rendered: Cell::new(false),
                startup_released: Cell::new(false),
                route_computation: RefCell::new(None),
                location_computation: RefCell::new(None),
            }),
        }
    }
}

impl<S: LayoutSink + 'static> ClientRouter<S> {
    /// Starts building a router from its collaborators.
    pub fn builder(
        scheduler: Scheduler,
        routes: Rc<dyn RouteTable>,
        location: Rc<dyn LocationSource>,
        layout: Rc<S>,
    ) -> ClientRouterBuilder<S> {
        ClientRouterBuilder {
            scheduler,
            routes,
            location,
            layout,
            document_root: None,
            config: RouterConfig::default(),
        }
    }

    /// The scheduler running this router's computations.
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// The location source this router watches.
    pub fn location(&self) -> &Rc<dyn LocationSource> {
        &self.inner.location
    }

    /// The layout sink controllers render into.
    pub fn layout(&self) -> &Rc<S> {
        &self.inner.layout
    }

    /// Active configuration.
    pub fn config(&self) -> RouterConfig {
        self.inner.config
    }

    /// Whether the router is listening to location changes.
    pub fn is_started(&self) -> bool {
        self.inner.is_started.get()
    }

    /// Whether [`render`](Self::render) has been called.
    pub fn is_rendered(&self) -> bool {
        self.inner.is_rendered.get()
    }

    /// Whether a route computation is currently live.
    pub fn has_active_route(&self) -> bool {
        self.inner
            .route_computation
            .borrow()
            .as_ref()
            .is_some_and(|computation| !computation.is_stopped())
    }

    /// Selects the layout template.
    pub fn set_layout(&self, layout: &str) {
        self.inner.layout.set_layout(layout);
    }

    /// Places `template` in `region`, or in the main region when `None`.
    pub fn set_template(&self, template: &str, region: Option<&str>) {
        self.inner.layout.set_template(template, region);
    }

    /// Replaces the layout data context.
    pub fn set_data(&self, data: serde_json::Value) {
        self.inner.layout.set_data(data);
    }

    /// Marks the router rendered and materializes the current layout.
    pub fn render(&self) -> S::Output {
        self.inner.is_rendered.set(true);
        self.inner.layout.render_layout()
    }

    /// Renders the layout and attaches it to the document root.
    pub fn auto_render(&self) -> Result<(), NavigationError> {
        let Some(root) = self.inner.document_root.as_ref() else {
            return Err(NavigationError::MissingDocumentRoot);
        };
        let output = self.render();
        root.append(output);
        debug!("layout attached to document root");
        Ok(())
    }

    /// Releases the startup barrier.
    ///
    /// Call once application setup (route registration, other startup hooks)
    /// is complete. On the next scheduler flush the router auto-renders and
    /// then starts, as enabled by [`RouterConfig`]. Later calls do nothing.
    pub fn startup(&self) {
        if self.inner.startup_released.replace(true) {
            return;
        }
        debug!(config = ?self.inner.config, "startup barrier released");

        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.after_flush(move || {
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            let router = ClientRouter { inner };
            if router.inner.config.auto_render {
                router.auto_render()?;
            }
            if router.inner.config.auto_start {
                router.start()?;
            }
            Ok(())
        });
    }

    /// Starts listening to location changes and dispatches the current
    /// location. Does nothing when already started.
    pub fn start(&self) -> Result<(), NavigationError> {
        if self.inner.is_started.replace(true) {
            return Ok(());
        }
        info!("router started");

        let weak = Rc::downgrade(&self.inner);
        let result = self.inner.scheduler.run(move |computation| {
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            let router = ClientRouter { inner };
            *router.inner.location_computation.borrow_mut() = Some(computation.clone());

            let location = router.inner.location.get();
            let options = NavigateOptions {
                state: location.state,
                ..Default::default()
            };
            router.dispatch(&location.pathname, &options, None)?;
            Ok(())
        });

        if let Err(err) = result {
            self.stop();
            return Err(NavigationError::from_reactive(err));
        }
        Ok(())
    }

    /// Stops listening to location changes and tears down the active route.
    /// Does nothing when not started.
    pub fn stop(&self) {
        let was_started = self.inner.is_started.replace(false);
        let computation = self.inner.location_computation.borrow_mut().take();
        if let Some(computation) = computation {
            computation.stop();
        }
        if was_started {
            self.stop_route();
            info!("router stopped");
        }
    }

    /// Navigates to a path or to a named route.
    ///
    /// `target` is treated as a path when it starts with `/` or with an
    /// `http:`/`https:` scheme; `params` is ignored in that case.
    pub fn go(
        &self,
        target: &str,
        params: impl Into<RouteParams>,
        options: NavigateOptions,
    ) -> Result<(), NavigationError> {
        if is_path(target) {
            self.go_path(target, options)
        } else {
            self.go_route(target, params, options)
        }
    }

    /// Dispatches `path` and commits it to the location once the route is
    /// confirmed to be handled on the client.
    pub fn go_path(&self, path: &str, options: NavigateOptions) -> Result<(), NavigationError> {
        let commit = self.commit(path, &options);
        self.dispatch(path, &options, Some(commit))
    }

    /// Runs the named route with `params` and commits its path.
    pub fn go_route(
        &self,
        name: &str,
        params: impl Into<RouteParams>,
        options: NavigateOptions,
    ) -> Result<(), NavigationError> {
        let Some(route) = self.inner.routes.route(name) else {
            error!(route = name, "no route found");
            return Err(NavigationError::UnknownRoute {
                name: name.to_owned(),
            });
        };

        let params = params.into();
        let path = route
            .path(&params, &options)
            .map_err(|source| NavigationError::ReversePath {
                name: name.to_owned(),
                source,
            })?;
        debug!(route = route.name(), %path, "running named route");
        let controller = route.controller(&path, &options);
        let commit = self.commit(&path, &options);
        self.run(controller, &path, &options, Some(commit))
    }

    /// Resolves `path` through the route table and runs the match, or falls
    /// back to a full navigation when there is none.
    #[tracing::instrument(level = "debug", skip(self, options, on_complete))]
    pub fn dispatch(
        &self,
        path: &str,
        options: &NavigateOptions,
        on_complete: Option<OnComplete>,
    ) -> Result<(), NavigationError> {
        match self.inner.routes.resolve(path, options) {
            Some(controller) => self.run(controller, path, options, on_complete),
            None => {
                self.on_unhandled(path);
                Ok(())
            }
        }
    }

    /// Runs `controller` for `path` as the new active route.
    ///
    /// A live route computation is stopped first, and the replacement is
    /// registered as its invalidation callback, so the new route never starts
    /// before the old one is torn down and never starts twice.
    #[tracing::instrument(level = "debug", skip(self, controller, options, on_complete))]
    pub fn run(
        &self,
        controller: Rc<dyn Controller>,
        path: &str,
        options: &NavigateOptions,
        on_complete: Option<OnComplete>,
    ) -> Result<(), NavigationError> {
        let run_next = {
            let router = self.clone();
            let path = path.to_owned();
            let options = options.clone();
            move || router.run_controller(controller, path, options, on_complete)
        };

        let previous = self.inner.route_computation.borrow_mut().take();
        let Some(previous) = previous else {
            return run_next();
        };

        previous.stop();
        let outcome = Rc::new(RefCell::new(None));
        previous.on_invalidate({
            let outcome = outcome.clone();
            move |_| *outcome.borrow_mut() = Some(run_next())
        });
        let outcome = outcome.borrow_mut().take();
        outcome.unwrap_or(Ok(()))
    }

    /// Gives up on client handling: stops the router and the active route,
    /// then hands `path` to a full navigation.
    pub fn on_unhandled(&self, path: &str) {
        info!(path, "no client route, falling back to full navigation");
        self.stop();
        self.stop_route();
        self.inner.location.navigate_away(path);
    }

    fn stop_route(&self) {
        let computation = self.inner.route_computation.borrow_mut().take();
        if let Some(computation) = computation {
            computation.stop();
        }
    }

    fn run_controller(
        &self,
        controller: Rc<dyn Controller>,
        path: String,
        options: NavigateOptions,
        on_complete: Option<OnComplete>,
    ) -> Result<(), NavigationError> {
        if !controller.is_reactive() {
            debug!(%path, "running one-shot controller");
            return nonreactive(|| {
                self.execute(controller.as_ref(), &path, &options, on_complete.as_ref(), None)
            });
        }

        let weak = Rc::downgrade(&self.inner);
        let body = move |computation: &Computation| {
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            let router = ClientRouter { inner };
            *router.inner.route_computation.borrow_mut() = Some(computation.clone());
            router.execute(
                controller.as_ref(),
                &path,
                &options,
                on_complete.as_ref(),
                Some(computation),
            )?;
            Ok(())
        };

        // Created untracked so that only this router can stop it.
        let scheduler = &self.inner.scheduler;
        nonreactive(move || scheduler.run(body))
            .map(|computation| debug!(computation = %computation.id(), "route computation live"))
            .map_err(NavigationError::from_reactive)
    }

    fn execute(
        &self,
        controller: &dyn Controller,
        path: &str,
        options: &NavigateOptions,
        on_complete: Option<&OnComplete>,
        computation: Option<&Computation>,
    ) -> Result<(), NavigationError> {
        let layout: &dyn LayoutControl = &*self.inner.layout;
        let cx = RouteContext::new(path, options, layout, computation);
        let handling = controller
            .run(&cx)
            .map_err(|source| NavigationError::Route {
                path: path.to_owned(),
                source,
            })?;

        if computation.is_some_and(Computation::is_stopped) {
            debug!(path, "route superseded while running");
            return Ok(());
        }

        match handling {
            Handling::Client => {
                if let Some(on_complete) = on_complete {
                    on_complete();
                }
            }
            Handling::Server => self.on_unhandled(path),
        }
        Ok(())
    }

    fn commit(&self, path: &str, options: &NavigateOptions) -> OnComplete {
        let location = self.inner.location.clone();
        let path = path.to_owned();
        let set_options = SetOptions {
            replace_state: options.replace_state,
            state: options.state.clone(),
            skip_reactive: true,
        };
        Rc::new(move || location.set(&path, &set_options))
    }
}

impl NavigationError {
    /// Unwraps navigation errors that travelled through a computation body.
    pub(crate) fn from_reactive(err: ReactiveError) -> Self {
        match err {
            ReactiveError::FirstRun { id, source } => match source.downcast::<NavigationError>() {
                Ok(err) => *err,
                Err(source) => Self::Reactive(ReactiveError::FirstRun { id, source }),
            },
            other => Self::Reactive(other),
        }
    }
}

fn is_path(target: &str) -> bool {
    target.starts_with('/') || target.starts_with("http:") || target.starts_with("https:")
}
