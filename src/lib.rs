//! Nemo previewer bridge
//!
//! Delegates file preview to an out-of-process previewer (sushi, nemo-preview)
//! reachable on the session bus as `org.gnome.NautilusPreviewer`, and routes
//! the previewer's keyboard navigation back into the file manager's active view.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # async fn demo(host: Arc<dyn nemo_previewer::HostApplication>) {
//! let previewer = nemo_previewer::get_singleton(host).await;
//! previewer.show_file("file:///tmp/a.png", 0x3a00007, false);
//! // ...
//! previewer.close();
//! # }
//! ```

pub mod config;
pub mod dbus;
pub mod error;
pub mod previewer;
pub mod router;

pub use config::{BusConfig, Config, Endpoint};
pub use dbus::{PreviewerCall, SubscriptionId, Transport};
pub use error::PreviewerError;
pub use previewer::{Previewer, SingletonSlot, get_singleton};
pub use router::{
    Direction, FileManagerWindow, HostApplication, HostWindow, Pane, PreviewSelectionTarget,
    RouteOutcome, SelectionRouter, View, find_preview_target,
};
