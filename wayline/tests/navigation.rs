use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use serde_json::{Value, json};
use wayline::{
    ClientRouter, Controller, Handling, LayoutControl, LayoutSink, Location, LocationSource,
    MemoryLocation, NavigateOptions, NavigationError, Route, RouteContext, RouteParams,
    RouteTable, RouterConfig, SetOptions,
};
use wayline_reactive::{BoxError, Dependency, Scheduler};

#[derive(Default)]
struct Page {
    layout: RefCell<String>,
    template: RefCell<String>,
}

impl LayoutControl for Page {
    fn set_layout(&self, layout: &str) {
        *self.layout.borrow_mut() = layout.to_owned();
    }

    fn set_template(&self, template: &str, _region: Option<&str>) {
        *self.template.borrow_mut() = template.to_owned();
    }

    fn set_data(&self, _data: Value) {}
}

impl LayoutSink for Page {
    type Output = String;

    fn render_layout(&self) -> String {
        format!("{}|{}", self.layout.borrow(), self.template.borrow())
    }
}

struct RecordingLocation {
    memory: MemoryLocation,
    reads: Cell<usize>,
    sets: RefCell<Vec<(String, SetOptions)>>,
}

impl RecordingLocation {
    fn new(path: &str) -> Self {
        Self {
            memory: MemoryLocation::new(path),
            reads: Cell::new(0),
            sets: RefCell::new(Vec::new()),
        }
    }

    fn paths(&self) -> Vec<String> {
        self.memory
            .entries()
            .into_iter()
            .map(|entry| entry.pathname)
            .collect()
    }
}

impl LocationSource for RecordingLocation {
    fn get(&self) -> Location {
        self.reads.set(self.reads.get() + 1);
        self.memory.get()
    }

    fn get_untracked(&self) -> Location {
        self.memory.get_untracked()
    }

    fn set(&self, path: &str, options: &SetOptions) {
        self.sets
            .borrow_mut()
            .push((path.to_owned(), options.clone()));
        self.memory.set(path, options);
    }

    fn navigate_away(&self, path: &str) {
        self.memory.navigate_away(path);
    }
}

#[derive(Default)]
struct Shared {
    log: RefCell<Vec<String>>,
    states: RefCell<Vec<Option<Value>>>,
    data: Dependency,
    router: RefCell<Option<ClientRouter<Page>>>,
}

struct Show {
    shared: Rc<Shared>,
    path: String,
    handling: Handling,
}

impl Controller for Show {
    fn run(&self, cx: &RouteContext<'_>) -> Result<Handling, BoxError> {
        if self.path.starts_with("/posts/") || self.path == "/export" {
            self.shared.data.depend();
        }
        if let Some(computation) = cx.computation() {
            if computation.is_first_run() {
                let shared = self.shared.clone();
                let path = self.path.clone();
                computation.on_stop(move |_| shared.log.borrow_mut().push(format!("stop {path}")));
            }
        }
        self.shared
            .log
            .borrow_mut()
            .push(format!("run {}", self.path));
        self.shared.states.borrow_mut().push(cx.state().cloned());
        cx.layout().set_template(&self.path, None);
        Ok(self.handling)
    }
}

struct Redirect {
    shared: Rc<Shared>,
    to: &'static str,
}

impl Controller for Redirect {
    fn run(&self, _cx: &RouteContext<'_>) -> Result<Handling, BoxError> {
        self.shared.log.borrow_mut().push("run /old".to_owned());
        let router = self.shared.router.borrow().clone();
        if let Some(router) = router {
            router.go(self.to, (), NavigateOptions::default())?;
        }
        Ok(Handling::Client)
    }
}

struct Broken;

impl Controller for Broken {
    fn run(&self, _cx: &RouteContext<'_>) -> Result<Handling, BoxError> {
        Err("post store unavailable".into())
    }
}

fn show(shared: &Rc<Shared>, path: &str, handling: Handling) -> Rc<dyn Controller> {
    Rc::new(Show {
        shared: shared.clone(),
        path: path.to_owned(),
        handling,
    })
}

struct PostIndex {
    shared: Rc<Shared>,
}

impl Route for PostIndex {
    fn name(&self) -> &str {
        "postIndex"
    }

    fn path(&self, params: &RouteParams, _options: &NavigateOptions) -> Result<String, BoxError> {
        let id = params.get("id", 0).ok_or("missing id")?;
        Ok(format!("/posts/{id}"))
    }

    fn controller(&self, path: &str, _options: &NavigateOptions) -> Rc<dyn Controller> {
        show(&self.shared, path, Handling::Client)
    }
}

struct Table {
    shared: Rc<Shared>,
}

impl RouteTable for Table {
    fn resolve(&self, path: &str, _options: &NavigateOptions) -> Option<Rc<dyn Controller>> {
        match path {
            "/" => Some(show(&self.shared, path, Handling::Client)),
            "/report.pdf" | "/export" => Some(show(&self.shared, path, Handling::Server)),
            "/old" => Some(Rc::new(Redirect {
                shared: self.shared.clone(),
                to: "/",
            })),
            "/broken" => Some(Rc::new(Broken)),
            _ if path.starts_with("/posts/") => Some(show(&self.shared, path, Handling::Client)),
            _ => None,
        }
    }

    fn route(&self, name: &str) -> Option<Rc<dyn Route>> {
        (name == "postIndex").then(|| {
            Rc::new(PostIndex {
                shared: self.shared.clone(),
            }) as Rc<dyn Route>
        })
    }
}

struct Fixture {
    router: ClientRouter<Page>,
    location: Rc<RecordingLocation>,
    shared: Rc<Shared>,
    attached: Rc<RefCell<Vec<String>>>,
}

impl Fixture {
    fn log(&self) -> Vec<String> {
        self.shared.log.borrow().clone()
    }

    fn flush(&self) {
        self.router.scheduler().flush().expect("flush succeeds");
    }
}

fn fixture_with(path: &str, config: RouterConfig) -> Fixture {
    let shared = Rc::new(Shared::default());
    let location = Rc::new(RecordingLocation::new(path));
    let attached = Rc::new(RefCell::new(Vec::new()));
    let router = ClientRouter::builder(
        Scheduler::new(),
        Rc::new(Table {
            shared: shared.clone(),
        }),
        location.clone(),
        Rc::new(Page::default()),
    )
    .config(config)
    .document_root({
        let attached = attached.clone();
        move |output: String| attached.borrow_mut().push(output)
    })
    .build();

    Fixture {
        router,
        location,
        shared,
        attached,
    }
}

fn fixture(path: &str) -> Fixture {
    fixture_with(path, RouterConfig::default())
}

#[test]
fn unhandled_path_stops_the_router_and_navigates_away_once() {
    let app = fixture("/");
    app.router.start().expect("start succeeds");

    app.router
        .go("/nowhere", (), NavigateOptions::default())
        .expect("fallback is not an error");

    assert!(!app.router.is_started());
    assert_eq!(app.location.memory.external_navigations(), ["/nowhere"]);
    assert!(app.location.sets.borrow().is_empty());
    assert_eq!(app.location.paths(), ["/"]);
    assert!(!app.router.has_active_route());
}

#[test]
fn unhandled_fallback_tears_down_the_active_route() {
    let app = fixture("/posts/1");
    app.router.start().expect("start succeeds");

    app.router
        .go("/nowhere", (), NavigateOptions::default())
        .expect("fallback is not an error");
    app.shared.data.changed();
    app.flush();

    assert_eq!(app.log(), ["run /posts/1", "stop /posts/1"]);
    assert!(!app.router.has_active_route());
    assert_eq!(app.location.memory.external_navigations(), ["/nowhere"]);
}

#[test]
fn reactive_server_route_navigates_away_once() {
    let app = fixture("/");
    app.router.start().expect("start succeeds");

    app.router
        .go("/export", (), NavigateOptions::default())
        .expect("fallback is not an error");
    app.shared.data.changed();
    app.flush();

    assert_eq!(app.location.memory.external_navigations(), ["/export"]);
    assert_eq!(app.log(), ["run /", "stop /", "run /export", "stop /export"]);
    assert!(!app.router.has_active_route());
}

#[test]
fn stop_tears_down_the_active_route() {
    let app = fixture("/posts/1");
    app.router.start().expect("start succeeds");

    app.router.stop();
    app.shared.data.changed();
    app.flush();

    assert_eq!(app.log(), ["run /posts/1", "stop /posts/1"]);
    assert!(!app.router.has_active_route());
    assert!(!app.router.is_started());
}

#[test]
fn redirect_from_a_running_controller_commits_only_the_target() {
    let app = fixture("/start");
    *app.shared.router.borrow_mut() = Some(app.router.clone());

    app.router
        .go("/old", (), NavigateOptions::default())
        .expect("redirect succeeds");

    assert_eq!(app.log(), ["run /old", "run /"]);
    assert_eq!(app.location.paths(), ["/start", "/"]);
    assert_eq!(
        app.location
            .sets
            .borrow()
            .iter()
            .map(|(path, _)| path.as_str())
            .collect::<Vec<_>>(),
        ["/"]
    );
    assert!(app.router.has_active_route());

    app.shared.router.borrow_mut().take();
}

#[test]
fn unhandled_initial_location_stops_during_start() {
    let app = fixture("/nowhere");
    app.router.start().expect("fallback is not an error");

    assert!(!app.router.is_started());
    assert_eq!(app.location.memory.external_navigations(), ["/nowhere"]);
}

#[test]
fn start_twice_creates_one_location_computation() {
    let app = fixture("/");
    app.router.start().expect("start succeeds");
    app.router.start().expect("second start is a no-op");
    assert_eq!(app.location.reads.get(), 1);

    app.location.set("/posts/1", &SetOptions::default());
    app.flush();

    assert_eq!(app.location.reads.get(), 2);
    assert_eq!(app.log(), ["run /", "stop /", "run /posts/1"]);
}

#[test]
fn data_change_reruns_the_route_exactly_once() {
    let app = fixture("/posts/1");
    app.router.start().expect("start succeeds");

    app.shared.data.changed();
    app.flush();
    app.flush();

    assert_eq!(app.log(), ["run /posts/1", "run /posts/1"]);
    assert!(app.router.has_active_route());
    assert_eq!(app.location.paths(), ["/posts/1"]);
}

#[test]
fn location_change_stops_the_stale_route_before_the_next_runs() {
    let app = fixture("/posts/1");
    app.router.start().expect("start succeeds");

    app.location.set("/posts/2", &SetOptions::default());
    app.flush();

    assert_eq!(app.log(), ["run /posts/1", "stop /posts/1", "run /posts/2"]);

    app.shared.data.changed();
    app.flush();
    assert_eq!(app.log().last().map(String::as_str), Some("run /posts/2"));
    assert_eq!(app.log().len(), 4);
}

#[test]
fn named_route_pushes_its_path() {
    let app = fixture("/");
    app.router.start().expect("start succeeds");

    app.router
        .go("postIndex", [1], NavigateOptions::default())
        .expect("route runs");
    app.flush();

    assert_eq!(app.location.paths(), ["/", "/posts/1"]);
    assert_eq!(
        *app.location.sets.borrow(),
        [(
            "/posts/1".to_owned(),
            SetOptions {
                replace_state: false,
                state: None,
                skip_reactive: true,
            }
        )]
    );
    assert_eq!(app.log(), ["run /", "stop /", "run /posts/1"]);
}

#[test]
fn named_route_replaces_when_asked() {
    let app = fixture("/");
    app.router
        .go("postIndex", [1], NavigateOptions::default())
        .expect("route runs");
    app.router
        .go("postIndex", [2], NavigateOptions::replace())
        .expect("route runs");

    assert_eq!(app.location.paths(), ["/", "/posts/2"]);
    assert_eq!(app.location.memory.index(), 1);
}

#[test]
fn named_route_without_params_fails_to_build_a_path() {
    let app = fixture("/");
    let err = app
        .router
        .go("postIndex", (), NavigateOptions::default())
        .expect_err("path needs an id");

    assert!(matches!(err, NavigationError::ReversePath { name, .. } if name == "postIndex"));
    assert!(app.location.sets.borrow().is_empty());
}

#[test]
fn stop_when_not_started_is_a_noop() {
    let app = fixture("/");
    app.router.stop();
    app.router.stop();
    assert!(!app.router.is_started());
}

#[test]
fn server_handled_path_is_never_committed() {
    let app = fixture("/");
    app.router.start().expect("start succeeds");

    app.router
        .go("/report.pdf", (), NavigateOptions::default())
        .expect("fallback is not an error");

    assert!(app.location.sets.borrow().is_empty());
    assert_eq!(app.location.paths(), ["/"]);
    assert_eq!(app.location.memory.external_navigations(), ["/report.pdf"]);
    assert!(!app.router.is_started());
}

#[test]
fn failing_controller_is_reported_and_not_committed() {
    let app = fixture("/");
    let err = app
        .router
        .go("/broken", (), NavigateOptions::default())
        .expect_err("controller fails");

    assert!(matches!(err, NavigationError::Route { path, .. } if path == "/broken"));
    assert!(app.location.sets.borrow().is_empty());
}

#[test]
fn history_traversal_redispatches_with_stored_state() {
    let app = fixture("/");
    app.router.start().expect("start succeeds");

    app.router
        .go(
            "/posts/1",
            (),
            NavigateOptions::default().with_state(json!({ "scroll": 10 })),
        )
        .expect("route runs");
    app.router
        .go("/", (), NavigateOptions::default())
        .expect("route runs");
    assert!(app.location.memory.back());
    app.flush();

    assert_eq!(app.log().last().map(String::as_str), Some("run /posts/1"));
    assert_eq!(
        app.shared.states.borrow().last(),
        Some(&Some(json!({ "scroll": 10 })))
    );
    assert_eq!(app.location.memory.index(), 1);
}

#[test]
fn startup_renders_then_starts_after_the_next_flush() {
    let app = fixture("/");
    app.router.startup();
    app.router.startup();
    assert!(!app.router.is_started());
    assert!(!app.router.is_rendered());

    app.flush();

    assert!(app.router.is_rendered());
    assert!(app.router.is_started());
    assert_eq!(app.attached.borrow().len(), 1);
    assert_eq!(app.log(), ["run /"]);
    assert_eq!(app.router.render(), "|/");
}

#[test]
fn startup_honours_the_config() {
    let app = fixture_with(
        "/",
        RouterConfig {
            auto_render: true,
            auto_start: false,
        },
    );
    app.router.startup();
    app.flush();

    assert!(app.router.is_rendered());
    assert!(!app.router.is_started());
    assert!(app.log().is_empty());
}
