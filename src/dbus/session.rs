//! zbus-backed [`Transport`]

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use zbus::Connection;
use zbus::proxy::CacheProperties;

use super::proxy::{PreviewerEventsProxy, PreviewerProxy};
use super::{PreviewerCall, SelectionHandler, SubscriptionId, Transport};
use crate::config::{BusConfig, Endpoint};
use crate::error::{PreviewerError, Result};

/// Transport over a real bus connection
pub struct DbusTransport {
    previewer: PreviewerProxy<'static>,
    events: PreviewerEventsProxy<'static>,
    runtime: Handle,
    next_id: AtomicU32,
    /// One signal-stream task per live match
    subscriptions: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
}

impl DbusTransport {
    /// Connect to the configured bus (the session bus unless an address is set)
    pub async fn connect(bus: &BusConfig, endpoint: &Endpoint) -> Result<Self> {
        let conn = match &bus.address {
            Some(address) => {
                zbus::connection::Builder::address(address.as_str())
                    .map_err(PreviewerError::BusUnavailable)?
                    .build()
                    .await
            }
            None => Connection::session().await,
        }
        .map_err(PreviewerError::BusUnavailable)?;

        info!(
            "Connected to D-Bus {} bus",
            if bus.address.is_some() { "configured" } else { "session" }
        );

        Self::with_connection(conn, endpoint).await
    }

    /// Build the previewer proxies on an existing connection.
    ///
    /// Properties are never cached so building the proxies cannot wake the peer.
    pub async fn with_connection(conn: Connection, endpoint: &Endpoint) -> Result<Self> {
        let previewer = PreviewerProxy::builder(&conn)
            .destination(endpoint.service_name.clone())
            .and_then(|b| b.path(endpoint.object_path.clone()))
            .and_then(|b| b.interface(endpoint.interface.clone()))
            .map_err(PreviewerError::InvalidEndpoint)?
            .cache_properties(CacheProperties::No)
            .build()
            .await
            .map_err(PreviewerError::InvalidEndpoint)?;

        let events = PreviewerEventsProxy::builder(&conn)
            .destination(endpoint.service_name.clone())
            .and_then(|b| b.path(endpoint.object_path.clone()))
            .and_then(|b| b.interface(endpoint.event_interface.clone()))
            .map_err(PreviewerError::InvalidEndpoint)?
            .cache_properties(CacheProperties::No)
            .build()
            .await
            .map_err(PreviewerError::InvalidEndpoint)?;

        Ok(Self {
            previewer,
            events,
            runtime: Handle::current(),
            next_id: AtomicU32::new(1),
            subscriptions: Mutex::new(HashMap::new()),
        })
    }

    fn allocate_id(&self) -> SubscriptionId {
        loop {
            let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
            if let Some(raw) = NonZeroU32::new(raw) {
                return SubscriptionId::new(raw);
            }
        }
    }

    fn subscriptions(&self) -> MutexGuard<'_, HashMap<SubscriptionId, JoinHandle<()>>> {
        self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for DbusTransport {
    fn dispatch(&self, call: PreviewerCall) -> BoxFuture<'static, Result<()>> {
        let proxy = self.previewer.clone();
        async move {
            let member = call.member();
            let reply = match call {
                PreviewerCall::ShowFile {
                    uri,
                    window_id,
                    close_if_already_visible,
                } => {
                    // The wire signature is `i`; the X window id is passed through bit for bit
                    proxy
                        .show_file(&uri, window_id as i32, close_if_already_visible)
                        .await
                }
                PreviewerCall::Close => proxy.close().await,
            };
            reply.map_err(|e| PreviewerError::call_failed(member, e))
        }
        .boxed()
    }

    fn subscribe(&self, handler: SelectionHandler) -> SubscriptionId {
        let id = self.allocate_id();
        let events = self.events.clone();

        let task = self.runtime.spawn(async move {
            let mut stream = match events.receive_selection_event().await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Unable to match SelectionEvent (subscription {}): {}", id, e);
                    return;
                }
            };

            while let Some(signal) = stream.next().await {
                match signal.args() {
                    Ok(args) => {
                        trace!("SelectionEvent({}) on subscription {}", args.direction(), id);
                        handler(*args.direction());
                    }
                    Err(e) => debug!("Dropping event: {}", PreviewerError::MalformedSignal(e)),
                }
            }
            debug!("SelectionEvent stream for subscription {} ended", id);
        });

        self.subscriptions().insert(id, task);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        match self.subscriptions().remove(&id) {
            // Dropping the stream inside the task removes the match rule
            Some(task) => task.abort(),
            None => debug!("Ignoring unknown subscription {}", id),
        }
    }
}

impl Drop for DbusTransport {
    fn drop(&mut self) {
        for (_, task) in self.subscriptions().drain() {
            task.abort();
        }
        debug!("Released D-Bus connection");
    }
}
