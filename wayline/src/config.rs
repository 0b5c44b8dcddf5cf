/// Startup behavior of a [`ClientRouter`](crate::ClientRouter).
///
/// Read once by [`ClientRouter::startup`](crate::ClientRouter::startup).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RouterConfig {
    /// Render the layout and attach it to the document root at startup.
    pub auto_render: bool,
    /// Start listening to location changes at startup.
    pub auto_start: bool,
}

impl Default for RouterConfig {
    /// Renders and starts automatically.
    fn default() -> Self {
        Self {
            auto_render: true,
            auto_start: true,
        }
    }
}
