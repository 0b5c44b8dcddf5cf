//! Drives a two-page application through an in-memory history and logs
//! every navigation step.
//!
//! Run with `RUST_LOG=debug` to also see computation lifecycle events.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    rc::Rc,
};

use serde_json::{Value, json};
use tracing::info;
use wayline::{
    ClientRouter, Controller, Handling, LayoutControl, LayoutSink, MemoryLocation,
    NavigateOptions, Route, RouteContext, RouteParams, RouteTable,
};
use wayline_reactive::{BoxError, Dependency, Scheduler};

#[derive(Default)]
struct TextLayout {
    layout: RefCell<String>,
    regions: RefCell<BTreeMap<String, String>>,
    data: RefCell<Value>,
}

impl LayoutControl for TextLayout {
    fn set_layout(&self, layout: &str) {
        *self.layout.borrow_mut() = layout.to_owned();
    }

    fn set_template(&self, template: &str, region: Option<&str>) {
        self.regions
            .borrow_mut()
            .insert(region.unwrap_or("main").to_owned(), template.to_owned());
    }

    fn set_data(&self, data: Value) {
        *self.data.borrow_mut() = data;
    }
}

impl LayoutSink for TextLayout {
    type Output = String;

    fn render_layout(&self) -> String {
        let regions = self
            .regions
            .borrow()
            .iter()
            .map(|(region, template)| format!("{region}={template}"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("[{}] {} {}", self.layout.borrow(), regions, self.data.borrow())
    }
}

/// Post titles, readable reactively.
#[derive(Default)]
struct Posts {
    titles: RefCell<BTreeMap<u32, String>>,
    dependency: Dependency,
}

impl Posts {
    fn title(&self, id: u32) -> Option<String> {
        self.dependency.depend();
        self.titles.borrow().get(&id).cloned()
    }

    fn set_title(&self, id: u32, title: &str) {
        self.titles.borrow_mut().insert(id, title.to_owned());
        self.dependency.changed();
    }
}

struct Home;

impl Controller for Home {
    fn run(&self, cx: &RouteContext<'_>) -> Result<Handling, BoxError> {
        cx.layout().set_layout("main");
        cx.layout().set_template("home", None);
        cx.layout().set_data(Value::Null);
        Ok(Handling::Client)
    }
}

struct ShowPost {
    posts: Rc<Posts>,
    id: u32,
}

impl Controller for ShowPost {
    fn run(&self, cx: &RouteContext<'_>) -> Result<Handling, BoxError> {
        // Unknown posts are rendered by the server's 404 page.
        let Some(title) = self.posts.title(self.id) else {
            return Ok(Handling::Server);
        };
        info!(id = self.id, %title, state = ?cx.state(), "showing post");
        cx.layout().set_layout("main");
        cx.layout().set_template("post", None);
        cx.layout().set_template("post_sidebar", Some("aside"));
        cx.layout().set_data(json!({ "id": self.id, "title": title }));
        Ok(Handling::Client)
    }
}

struct PostRoute {
    posts: Rc<Posts>,
}

impl Route for PostRoute {
    fn name(&self) -> &str {
        "post"
    }

    fn path(&self, params: &RouteParams, _options: &NavigateOptions) -> Result<String, BoxError> {
        let id = params.get("id", 0).ok_or("`post` needs an id")?;
        Ok(format!("/posts/{id}"))
    }

    fn controller(&self, path: &str, _options: &NavigateOptions) -> Rc<dyn Controller> {
        let id = post_id(path).unwrap_or_default();
        Rc::new(ShowPost {
            posts: self.posts.clone(),
            id,
        })
    }
}

struct Pages {
    posts: Rc<Posts>,
}

impl RouteTable for Pages {
    fn resolve(&self, path: &str, _options: &NavigateOptions) -> Option<Rc<dyn Controller>> {
        if path == "/" {
            return Some(Rc::new(Home));
        }
        let id = post_id(path)?;
        Some(Rc::new(ShowPost {
            posts: self.posts.clone(),
            id,
        }))
    }

    fn route(&self, name: &str) -> Option<Rc<dyn Route>> {
        match name {
            "post" => Some(Rc::new(PostRoute {
                posts: self.posts.clone(),
            })),
            _ => None,
        }
    }
}

fn post_id(path: &str) -> Option<u32> {
    path.strip_prefix("/posts/")?.parse().ok()
}

fn init_tracing() {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match tracing_subscriber::EnvFilter::try_new("warn,example=info,wayline=info") {
            Ok(filter) => filter,
            Err(_) => tracing_subscriber::EnvFilter::new("warn"),
        },
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .try_init();
}

fn main() -> Result<(), BoxError> {
    init_tracing();

    let scheduler = Scheduler::new();
    let posts = Rc::new(Posts::default());
    posts.set_title(1, "Hello, wayline");
    posts.set_title(2, "Reactive routes");

    let location = Rc::new(MemoryLocation::new("/"));
    let router = ClientRouter::builder(
        scheduler.clone(),
        Rc::new(Pages {
            posts: posts.clone(),
        }),
        location.clone(),
        Rc::new(TextLayout::default()),
    )
    .document_root(|output: String| info!(%output, "attached"))
    .build();

    router.startup();
    scheduler.flush()?;
    info!(rendered = %router.render(), "started");

    router.go("post", [1], NavigateOptions::default())?;
    info!(rendered = %router.render(), "navigated");

    posts.set_title(1, "Hello again, wayline");
    scheduler.flush()?;
    info!(rendered = %router.render(), "post edited");

    router.go(
        "/posts/2",
        (),
        NavigateOptions::default().with_state(json!({ "scroll": 120 })),
    )?;
    location.back();
    scheduler.flush()?;
    location.forward();
    scheduler.flush()?;
    info!(rendered = %router.render(), "history traversed");

    router.go("/posts/99", (), NavigateOptions::default())?;
    info!(
        started = router.is_started(),
        external = ?location.external_navigations(),
        "handed off to the server"
    );
    Ok(())
}
