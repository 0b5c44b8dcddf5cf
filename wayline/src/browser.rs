//! Browser bindings, compiled for `wasm` targets only.

use serde_json::Value;
use tracing::{debug, error, info, warn};
use wasm_bindgen::{JsCast, JsValue, closure::Closure};
use wayline_reactive::{Dependency, Scheduler};
use web_sys::{Event, Node, Window};

use crate::{
    layout::DocumentRoot,
    location::{Location, LocationSource, SetOptions},
};

/// [`LocationSource`] backed by `window.location` and `window.history`.
///
/// `popstate` events (the back and forward buttons) notify reactive readers.
/// The listener is removed when the value is dropped.
pub struct BrowserLocation {
    window: Window,
    dependency: Dependency,
    on_popstate: Closure<dyn FnMut(Event)>,
}

impl BrowserLocation {
    /// Binds to the current window. Returns `None` outside a browser window.
    pub fn new() -> Option<Self> {
        let window = web_sys::window()?;
        let dependency = Dependency::new();
        let on_popstate = Closure::<dyn FnMut(Event)>::new({
            let dependency = dependency.clone();
            move |_event: Event| {
                debug!("popstate");
                dependency.changed();
            }
        });
        if let Err(err) = window
            .add_event_listener_with_callback("popstate", on_popstate.as_ref().unchecked_ref())
        {
            warn!(?err, "failed to listen for popstate");
            return None;
        }

        Some(Self {
            window,
            dependency,
            on_popstate,
        })
    }

    fn read(&self) -> Location {
        let pathname = self.window.location().pathname().unwrap_or_else(|err| {
            warn!(?err, "failed to read location pathname");
            String::from("/")
        });
        let state = self
            .window
            .history()
            .and_then(|history| history.state())
            .ok()
            .and_then(|state| state_from_js(&state));
        Location { pathname, state }
    }
}

impl Drop for BrowserLocation {
    fn drop(&mut self) {
        let _ = self.window.remove_event_listener_with_callback(
            "popstate",
            self.on_popstate.as_ref().unchecked_ref(),
        );
    }
}

impl LocationSource for BrowserLocation {
    fn get(&self) -> Location {
        self.dependency.depend();
        self.read()
    }

    fn set(&self, path: &str, options: &SetOptions) {
        let entry = Location {
            pathname: path.to_owned(),
            state: options.state.clone(),
        };
        if self.read() == entry {
            return;
        }

        let history = match self.window.history() {
            Ok(history) => history,
            Err(err) => {
                error!(?err, "history is unavailable");
                return;
            }
        };
        let state = options
            .state
            .as_ref()
            .map_or(JsValue::NULL, state_to_js);
        let result = if options.replace_state {
            history.replace_state_with_url(&state, "", Some(path))
        } else {
            history.push_state_with_url(&state, "", Some(path))
        };
        if let Err(err) = result {
            error!(path, ?err, "failed to update history");
            return;
        }
        debug!(path, replace = options.replace_state, "location set");

        if !options.skip_reactive {
            self.dependency.changed();
        }
    }

    fn navigate_away(&self, path: &str) {
        info!(path, "full navigation");
        if let Err(err) = self.window.location().assign(path) {
            error!(path, ?err, "full navigation failed");
        }
    }
}

/// Appends rendered nodes to `document.body`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BodyRoot;

impl DocumentRoot<Node> for BodyRoot {
    fn append(&self, node: Node) {
        let Some(body) = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.body())
        else {
            error!("document has no body");
            return;
        };
        if let Err(err) = body.append_child(&node) {
            error!(?err, "failed to attach layout");
        }
    }
}

/// Flushes `scheduler` on a microtask whenever work is queued.
pub fn spawn_flush(scheduler: &Scheduler) {
    let weak = scheduler.downgrade();
    scheduler.set_flush_hook(move || {
        let weak = weak.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let Some(scheduler) = weak.upgrade() else {
                return;
            };
            if let Err(err) = scheduler.flush() {
                error!(%err, "scheduler flush failed");
            }
        });
    });
}

fn state_to_js(state: &Value) -> JsValue {
    serde_json::to_string(state)
        .ok()
        .and_then(|json| js_sys::JSON::parse(&json).ok())
        .unwrap_or(JsValue::NULL)
}

fn state_from_js(state: &JsValue) -> Option<Value> {
    if state.is_null() || state.is_undefined() {
        return None;
    }
    let json = String::from(js_sys::JSON::stringify(state).ok()?);
    serde_json::from_str(&json).ok()
}
