//! Layout sink interfaces.
//!
//! The router never renders by itself: controllers fill layout regions
//! through [`LayoutControl`] and the router asks the [`LayoutSink`] to
//! materialize the result.

use serde_json::Value;

/// Imperative setters a controller uses to describe its view.
///
/// Methods take `&self`; sinks keep their state behind interior mutability so
/// they can be shared between the router and controllers.
pub trait LayoutControl {
    /// Selects the layout template.
    fn set_layout(&self, layout: &str);

    /// Places `template` in `region`, or in the main region when `None`.
    fn set_template(&self, template: &str, region: Option<&str>);

    /// Replaces the data context used by the layout.
    fn set_data(&self, data: Value);
}

/// A layout that can be turned into a renderable value.
pub trait LayoutSink: LayoutControl {
    /// What [`render_layout`](LayoutSink::render_layout) produces.
    type Output;

    /// Materializes the current layout.
    fn render_layout(&self) -> Self::Output;
}

/// The document element auto-rendered output is attached to.
pub trait DocumentRoot<T> {
    /// Appends `node` to the root.
    fn append(&self, node: T);
}

impl<T, F> DocumentRoot<T> for F
where
    F: Fn(T),
{
    fn append(&self, node: T) {
        self(node)
    }
}
