//! The previewer bridge
//!
//! One [`Previewer`] per process owns the bus connection. It asks the
//! previewer service to show or hide a file and, while a preview is up,
//! listens for `SelectionEvent` so arrow keys pressed in the preview window
//! move the selection in the file manager.
//!
//! Everything here is best effort: a missing bus or a failing peer is logged
//! and otherwise ignored, so previewing can never get in the way of the file
//! manager itself.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::dbus::{DbusTransport, PreviewerCall, SubscriptionId, Transport};
use crate::router::{HostApplication, SelectionRouter};

static SINGLETON: SingletonSlot = SingletonSlot::new();

/// Get the process-wide bridge, creating it on first use.
///
/// `host` is only used when a new bridge has to be created. If the bus can't
/// be reached the bridge is still returned, but every operation on it is a
/// logged no-op.
pub async fn get_singleton(host: Arc<dyn HostApplication>) -> Arc<Previewer> {
    SINGLETON
        .acquire(move || async move {
            let config = Config::load().unwrap_or_else(|e| {
                warn!("Failed to load previewer configuration: {:#}, using defaults", e);
                Config::default()
            });
            Previewer::connect(&config, host).await
        })
        .await
}

/// Client side of the previewer service
pub struct Previewer {
    /// `None` when the bus was unavailable at construction; never reopened
    transport: Option<Arc<dyn Transport>>,
    router: Arc<SelectionRouter>,
    /// The live `SelectionEvent` match, if any
    selection: Mutex<Option<SubscriptionId>>,
    /// Calls whose reply hasn't been handled yet
    pending: AtomicUsize,
    /// Woken when `pending` drops to zero
    idle: Notify,
    runtime: Handle,
}

impl Previewer {
    /// Connect to the bus described by `config`.
    ///
    /// Never fails: a bus error is reported once and yields an inert bridge.
    pub async fn connect(config: &Config, host: Arc<dyn HostApplication>) -> Self {
        let transport = match DbusTransport::connect(&config.bus, &config.previewer).await {
            Ok(transport) => Some(Arc::new(transport) as Arc<dyn Transport>),
            Err(e) => {
                error!("{}", e);
                None
            }
        };

        Self::with_transport(transport, host)
    }

    /// Build a bridge over an already established transport.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime; replies are handled on it.
    pub fn with_transport(
        transport: Option<Arc<dyn Transport>>,
        host: Arc<dyn HostApplication>,
    ) -> Self {
        Self {
            transport,
            router: Arc::new(SelectionRouter::new(host)),
            selection: Mutex::new(None),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
            runtime: Handle::current(),
        }
    }

    /// Whether a bus connection was acquired
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// The live selection subscription, if any
    pub fn selection_subscription(&self) -> Option<SubscriptionId> {
        *self.selection()
    }

    /// Number of calls still waiting for their reply
    pub fn pending_calls(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Resolve once every call sent so far has had its reply handled
    pub async fn wait_for_replies(&self) {
        loop {
            let mut idle = std::pin::pin!(self.idle.notified());
            idle.as_mut().enable();
            if self.pending_calls() == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Ask the previewer to show `uri` over the X window `window_id`.
    ///
    /// With `close_if_already_visible` the previewer treats the request as a
    /// toggle. Afterwards exactly one selection subscription is live.
    pub fn show_file(self: &Arc<Self>, uri: &str, window_id: u32, close_if_already_visible: bool) {
        let Some(transport) = &self.transport else {
            warn!("No D-Bus connection available, not showing {}", uri);
            return;
        };

        self.dispatch(
            transport.as_ref(),
            PreviewerCall::ShowFile {
                uri: uri.to_string(),
                window_id,
                close_if_already_visible,
            },
        );

        // A previous previewer session may still be matched; replace it
        let mut selection = self.selection();
        if let Some(previous) = selection.take() {
            debug!("Disconnecting selection subscription {}", previous);
            transport.unsubscribe(previous);
        }
        let id = transport.subscribe(self.router.handler());
        debug!("Connected selection subscription {}", id);
        *selection = Some(id);
    }

    /// Ask the previewer to hide. Does not start the previewer if it isn't running.
    pub fn close(self: &Arc<Self>) {
        let Some(transport) = &self.transport else {
            warn!("No D-Bus connection available, not closing the previewer");
            return;
        };

        self.dispatch(transport.as_ref(), PreviewerCall::Close);

        if let Some(previous) = self.selection().take() {
            debug!("Disconnecting selection subscription {}", previous);
            transport.unsubscribe(previous);
        }
    }

    /// Send `call` without waiting for the reply.
    ///
    /// The pending call holds a reference to the bridge until its reply has
    /// been handled, so dropping every other reference doesn't cut it short.
    fn dispatch(self: &Arc<Self>, transport: &dyn Transport, call: PreviewerCall) {
        let member = call.member();
        let reply = transport.dispatch(call);
        let this = Arc::clone(self);

        self.pending.fetch_add(1, Ordering::AcqRel);
        self.runtime.spawn(async move {
            match reply.await {
                Ok(()) => debug!("{} completed", member),
                Err(e) => debug!("{}", e),
            }
            if this.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                this.idle.notify_waiters();
            }
            drop(this);
        });
    }

    fn selection(&self) -> MutexGuard<'_, Option<SubscriptionId>> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Previewer {
    fn drop(&mut self) {
        debug!("Disposing previewer bridge");
        let selection = self
            .selection
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let (Some(transport), Some(id)) = (&self.transport, selection) {
            transport.unsubscribe(id);
        }
    }
}

/// Publication point for a bridge that doesn't own it.
///
/// The slot only holds a weak reference: once the last holder drops the
/// bridge the slot reads as empty and the next request builds a new one.
pub struct SingletonSlot {
    slot: tokio::sync::Mutex<Weak<Previewer>>,
}

impl SingletonSlot {
    pub const fn new() -> Self {
        Self {
            slot: tokio::sync::Mutex::const_new(Weak::new()),
        }
    }

    /// Return the published bridge, or build one with `construct` and publish it.
    ///
    /// The slot stays locked while `construct` runs, so concurrent first
    /// requests all observe the same instance.
    pub async fn acquire<F, Fut>(&self, construct: F) -> Arc<Previewer>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Previewer>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(existing) = slot.upgrade() {
            return existing;
        }

        let previewer = Arc::new(construct().await);
        *slot = Arc::downgrade(&previewer);
        previewer
    }

    /// The published bridge, if one is alive
    pub async fn current(&self) -> Option<Arc<Previewer>> {
        self.slot.lock().await.upgrade()
    }
}

impl Default for SingletonSlot {
    fn default() -> Self {
        Self::new()
    }
}
