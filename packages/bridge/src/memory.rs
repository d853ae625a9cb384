use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::HostError;
use crate::host::{HostEnvironment, InboundHandler, Subscription};
use crate::transport::Transport;

/// In-process host for testing and the native fallback.
///
/// Exposes whichever transports it is told to, records every outbound request, and
/// lets the caller play the container's side with [`SimulatedHost::deliver`].
#[derive(Clone, Default)]
pub struct SimulatedHost {
    state: Rc<RefCell<HostState>>,
}

#[derive(Default)]
struct HostState {
    available: BTreeSet<Transport>,
    failing: BTreeSet<Transport>,
    accessor_reply: Option<Value>,
    replies_on_send: Vec<(Transport, Transport, Value)>,
    sent: Vec<(Transport, Option<Value>)>,
    listeners: Vec<(u64, Transport, InboundHandler)>,
    next_listener: u64,
}

impl SimulatedHost {
    /// A host exposing nothing, like a plain browser tab.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transports(transports: impl IntoIterator<Item = Transport>) -> Self {
        let host = Self::new();
        for transport in transports {
            host.enable(transport);
        }
        host
    }

    pub fn enable(&self, transport: Transport) {
        self.state.borrow_mut().available.insert(transport);
    }

    pub fn disable(&self, transport: Transport) {
        self.state.borrow_mut().available.remove(&transport);
    }

    /// Value returned by the synchronous accessor.
    pub fn set_accessor_reply(&self, reply: Value) {
        self.state.borrow_mut().accessor_reply = Some(reply);
    }

    /// Make every send on `transport` fail as if the host threw.
    pub fn fail_on(&self, transport: Transport) {
        self.state.borrow_mut().failing.insert(transport);
    }

    /// Deliver `payload` on `via` synchronously whenever a request goes out on
    /// `trigger`, the way some containers answer before `postMessage` returns.
    pub fn reply_on_send(&self, trigger: Transport, via: Transport, payload: Value) {
        self.state
            .borrow_mut()
            .replies_on_send
            .push((trigger, via, payload));
    }

    /// Every outbound request so far, in order.
    pub fn sent(&self) -> Vec<(Transport, Option<Value>)> {
        self.state.borrow().sent.clone()
    }

    pub fn sent_on(&self, transport: Transport) -> usize {
        self.state
            .borrow()
            .sent
            .iter()
            .filter(|(t, _)| *t == transport)
            .count()
    }

    /// Play the container: hand `payload` to every listener on `transport`.
    ///
    /// Returns how many listeners received it.
    pub fn deliver(&self, transport: Transport, payload: Value) -> usize {
        let handlers: Vec<InboundHandler> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|(_, t, _)| *t == transport)
            .map(|(_, _, handler)| handler.clone())
            .collect();
        for handler in &handlers {
            handler(payload.clone());
        }
        handlers.len()
    }

    pub fn listener_count(&self, transport: Transport) -> usize {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|(_, t, _)| *t == transport)
            .count()
    }

    pub fn active_listeners(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl HostEnvironment for SimulatedHost {
    fn is_available(&self, transport: Transport) -> bool {
        self.state.borrow().available.contains(&transport)
    }

    fn send(&self, transport: Transport, request: Option<Value>) -> Result<Option<Value>, HostError> {
        let (reply, echoes) = {
            let mut state = self.state.borrow_mut();
            if !state.available.contains(&transport) {
                return Err(HostError::Unavailable(transport));
            }
            state.sent.push((transport, request));
            if state.failing.contains(&transport) {
                return Err(HostError::Script {
                    transport,
                    message: "simulated failure".to_string(),
                });
            }
            let reply = match transport {
                Transport::SyncAccessor => state.accessor_reply.clone(),
                _ => None,
            };
            let echoes: Vec<(Transport, Value)> = state
                .replies_on_send
                .iter()
                .filter(|(trigger, _, _)| *trigger == transport)
                .map(|(_, via, payload)| (*via, payload.clone()))
                .collect();
            (reply, echoes)
        };
        for (via, payload) in echoes {
            self.deliver(via, payload);
        }
        Ok(reply)
    }

    fn listen(&self, transport: Transport, handler: InboundHandler) -> Result<Subscription, HostError> {
        if !transport.listens() {
            return Err(HostError::NotListenable(transport));
        }
        let id = {
            let mut state = self.state.borrow_mut();
            if !state.available.contains(&transport) {
                return Err(HostError::Unavailable(transport));
            }
            let id = state.next_listener;
            state.next_listener += 1;
            state.listeners.push((id, transport, handler));
            id
        };
        let state = Rc::downgrade(&self.state);
        Ok(Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                state.borrow_mut().listeners.retain(|(other, _, _)| *other != id);
            }
        }))
    }
}

impl fmt::Debug for SimulatedHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SimulatedHost")
            .field("available", &state.available)
            .field("sent", &state.sent.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_records_requests() {
        let host = SimulatedHost::with_transports([Transport::PageMessage]);
        host.send(Transport::PageMessage, Transport::PageMessage.request())
            .unwrap();

        assert_eq!(
            host.sent(),
            vec![(Transport::PageMessage, Some(json!({"type": "TOWNPASS_GET_USER"})))]
        );
        assert_eq!(host.sent_on(Transport::PageMessage), 1);
    }

    #[test]
    fn test_send_to_missing_transport_fails() {
        let host = SimulatedHost::new();
        assert_eq!(
            host.send(Transport::WebViewBridge, None),
            Err(HostError::Unavailable(Transport::WebViewBridge))
        );
        assert!(host.sent().is_empty());
    }

    #[test]
    fn test_accessor_reply_is_returned() {
        let host = SimulatedHost::with_transports([Transport::SyncAccessor]);
        host.set_accessor_reply(json!({"id": "u-1"}));
        let reply = host.send(Transport::SyncAccessor, None).unwrap();
        assert_eq!(reply, Some(json!({"id": "u-1"})));
    }

    #[test]
    fn test_reply_on_send_reaches_listener() {
        let host = SimulatedHost::with_transports([Transport::WebViewBridge, Transport::PageMessage]);
        host.reply_on_send(
            Transport::WebViewBridge,
            Transport::PageMessage,
            json!({"townpass_user": {"id": "u-2"}}),
        );

        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        let _subscription = host
            .listen(
                Transport::PageMessage,
                Rc::new(move |payload| sink.borrow_mut().push(payload)),
            )
            .unwrap();

        host.send(Transport::WebViewBridge, Transport::WebViewBridge.request())
            .unwrap();
        assert_eq!(received.borrow().len(), 1);
    }

    #[test]
    fn test_failing_transport_still_records_attempt() {
        let host = SimulatedHost::with_transports([Transport::NativeMessageHandler]);
        host.fail_on(Transport::NativeMessageHandler);
        assert!(matches!(
            host.send(Transport::NativeMessageHandler, None),
            Err(HostError::Script { .. })
        ));
        assert_eq!(host.sent_on(Transport::NativeMessageHandler), 1);
    }
}
