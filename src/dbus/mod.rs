//! D-Bus plumbing for the previewer service
//!
//! The bridge never touches zbus directly: it talks to a [`Transport`], which
//! dispatches [`PreviewerCall`]s and manages `SelectionEvent` matches. The
//! session-bus implementation lives in [`session`].

use futures::future::BoxFuture;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::Result;

pub mod proxy;
pub mod session;

#[cfg(test)]
pub(crate) mod recording;

pub use session::DbusTransport;

pub const PREVIEWER_DBUS_NAME: &str = "org.gnome.NautilusPreviewer";
pub const PREVIEWER_DBUS_IFACE: &str = "org.gnome.NautilusPreviewer";
pub const PREVIEWER_DBUS_EVENT: &str = "org.gnome.NautilusPreviewer2";
pub const PREVIEWER_DBUS_PATH: &str = "/org/gnome/NautilusPreviewer";

/// A method call on the previewer's primary interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewerCall {
    /// `ShowFile(s uri, i window_id, b close_if_already_visible)`
    ShowFile {
        uri: String,
        window_id: u32,
        close_if_already_visible: bool,
    },
    /// `Close()`
    Close,
}

impl PreviewerCall {
    /// D-Bus member name
    pub fn member(&self) -> &'static str {
        match self {
            Self::ShowFile { .. } => "ShowFile",
            Self::Close => "Close",
        }
    }

    /// Whether the bus may launch the previewer to service this call.
    ///
    /// `Close` must never start a previewer that isn't running.
    pub fn allows_auto_start(&self) -> bool {
        !matches!(self, Self::Close)
    }
}

/// Identifier of one live `SelectionEvent` match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(NonZeroU32);

impl SubscriptionId {
    pub fn new(raw: NonZeroU32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receives the direction code of every `SelectionEvent` on a subscription
pub type SelectionHandler = Arc<dyn Fn(u32) + Send + Sync>;

/// Connection to the bus the previewer lives on
pub trait Transport: Send + Sync {
    /// Submit `call` and return a future resolving with the peer's reply.
    ///
    /// The returned future owns everything it needs; it is spawned by the
    /// caller and may outlive the borrow of `self`.
    fn dispatch(&self, call: PreviewerCall) -> BoxFuture<'static, Result<()>>;

    /// Start matching `SelectionEvent` and feed each direction code to `handler`
    fn subscribe(&self, handler: SelectionHandler) -> SubscriptionId;

    /// Remove the match registered as `id`. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}
