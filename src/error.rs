//! Error type shared by the bridge and the bus transport.
//!
//! None of these errors escape the public bridge operations; they exist so the
//! transport can report what went wrong and the bridge can log it.

use thiserror::Error;

/// Errors produced while talking to the previewer service
#[derive(Debug, Error)]
pub enum PreviewerError {
    /// The bus could not be reached when the bridge was constructed
    #[error("unable to initialize D-Bus connection: {0}")]
    BusUnavailable(#[source] zbus::Error),

    /// The peer answered a method call with an error, or the call timed out
    #[error("unable to call {member} on the previewer: {source}")]
    CallFailed {
        member: &'static str,
        #[source]
        source: zbus::Error,
    },

    /// A `SelectionEvent` whose body is not a single `u32`
    #[error("malformed SelectionEvent payload: {0}")]
    MalformedSignal(#[source] zbus::Error),

    /// A configured bus name, object path or interface name is not valid
    #[error("invalid previewer endpoint: {0}")]
    InvalidEndpoint(#[source] zbus::Error),
}

impl PreviewerError {
    /// Wrap a failed reply for `member`
    pub fn call_failed(member: &'static str, source: zbus::Error) -> Self {
        Self::CallFailed { member, source }
    }
}

pub type Result<T, E = PreviewerError> = std::result::Result<T, E>;
