//! In-memory [`Transport`] that records what the bridge asks of the bus

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

use super::{PreviewerCall, SelectionHandler, SubscriptionId, Transport};
use crate::error::{PreviewerError, Result};

#[derive(Default)]
struct State {
    calls: Vec<PreviewerCall>,
    subscribed: Vec<SubscriptionId>,
    unsubscribed: Vec<SubscriptionId>,
    live: HashMap<SubscriptionId, SelectionHandler>,
    next_id: u32,
    fail_calls: bool,
    hold_replies: bool,
    pending: Vec<oneshot::Sender<()>>,
}

#[derive(Default)]
pub(crate) struct RecordingTransport {
    state: Mutex<State>,
}

impl RecordingTransport {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn calls(&self) -> Vec<PreviewerCall> {
        self.state().calls.clone()
    }

    pub(crate) fn subscribed(&self) -> Vec<SubscriptionId> {
        self.state().subscribed.clone()
    }

    pub(crate) fn unsubscribed(&self) -> Vec<SubscriptionId> {
        self.state().unsubscribed.clone()
    }

    pub(crate) fn live_subscriptions(&self) -> Vec<SubscriptionId> {
        self.state().live.keys().copied().collect()
    }

    /// Answer every later call with an error
    pub(crate) fn fail_calls(&self) {
        self.state().fail_calls = true;
    }

    /// Keep replies in flight until [`Self::release_replies`]
    pub(crate) fn hold_replies(&self) {
        self.state().hold_replies = true;
    }

    pub(crate) fn release_replies(&self) {
        let mut state = self.state();
        state.hold_replies = false;
        for reply in state.pending.drain(..) {
            let _ = reply.send(());
        }
    }

    /// Deliver a `SelectionEvent` to every live match
    pub(crate) fn emit_selection_event(&self, direction: u32) {
        let handlers: Vec<SelectionHandler> = self.state().live.values().cloned().collect();
        for handler in handlers {
            handler(direction);
        }
    }
}

impl Transport for RecordingTransport {
    fn dispatch(&self, call: PreviewerCall) -> BoxFuture<'static, Result<()>> {
        let mut state = self.state();
        let member = call.member();
        let fail = state.fail_calls;
        state.calls.push(call);

        let held = if state.hold_replies {
            let (tx, rx) = oneshot::channel();
            state.pending.push(tx);
            Some(rx)
        } else {
            None
        };

        async move {
            if let Some(rx) = held {
                let _ = rx.await;
            }
            if fail {
                Err(PreviewerError::call_failed(
                    member,
                    zbus::Error::Failure("previewer is gone".into()),
                ))
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    fn subscribe(&self, handler: SelectionHandler) -> SubscriptionId {
        let mut state = self.state();
        state.next_id += 1;
        let id = SubscriptionId::new(NonZeroU32::new(state.next_id).unwrap());
        state.subscribed.push(id);
        state.live.insert(id, handler);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut state = self.state();
        state.unsubscribed.push(id);
        state.live.remove(&id);
    }
}
