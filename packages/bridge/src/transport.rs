//! # Transport descriptors
//!
//! A [`Transport`] is one way of asking the hosting container for the current user.
//! The set is closed: every container TownPass runs in exposes some subset of these
//! six primitives, and the wire formats below are a compatibility contract with a
//! native app we do not control. They must not change.
//!
//! | Priority | Transport | Request | Reply |
//! |----------|-----------|---------|-------|
//! | 0 | [`MessageChannel`](Transport::MessageChannel) | string `{"name":"userinfo","data":null}` | envelope `{name, data}` on the channel itself |
//! | 1 | [`SyncAccessor`](Transport::SyncAccessor) | direct call | return value |
//! | 2 | [`NativeMessageHandler`](Transport::NativeMessageHandler) | `{action:"getUser"}` | through [`PageMessage`](Transport::PageMessage) |
//! | 3 | [`WebViewBridge`](Transport::WebViewBridge) | string `{"type":"TOWNPASS_GET_USER"}` | through [`PageMessage`](Transport::PageMessage) |
//! | 4 | [`PageMessage`](Transport::PageMessage) | `{type:"TOWNPASS_GET_USER"}` to any frame | `{type:"TOWNPASS_USER", user}` or `{townpass_user}` |
//! | 5 | [`DeferredCallback`](Transport::DeferredCallback) | nothing | callback invoked with the record |
//!
//! Detection is delegated to [`HostEnvironment`](crate::HostEnvironment); sending
//! and listening go through the same trait. Everything about the payloads lives here
//! so hosts only move opaque JSON around.

use std::fmt;

use serde_json::{json, Value};

use crate::error::DecodeError;
use crate::identity::IdentityRecord;

/// Pre-serialized request posted on the dedicated message channel.
pub const MESSAGE_CHANNEL_REQUEST: &str = r#"{"name":"userinfo","data":null}"#;

/// Pre-serialized request posted to the embedded webview bridge.
pub const WEBVIEW_BRIDGE_REQUEST: &str = r#"{"type":"TOWNPASS_GET_USER"}"#;

const USERINFO: &str = "userinfo";
const GET_USER: &str = "TOWNPASS_GET_USER";
const USER_REPLY: &str = "TOWNPASS_USER";

/// One strategy for reaching the hosting container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Transport {
    MessageChannel,
    SyncAccessor,
    NativeMessageHandler,
    WebViewBridge,
    PageMessage,
    DeferredCallback,
}

impl Transport {
    /// Every transport in priority order.
    pub const ALL: [Transport; 6] = [
        Transport::MessageChannel,
        Transport::SyncAccessor,
        Transport::NativeMessageHandler,
        Transport::WebViewBridge,
        Transport::PageMessage,
        Transport::DeferredCallback,
    ];

    pub fn priority(self) -> u8 {
        match self {
            Transport::MessageChannel => 0,
            Transport::SyncAccessor => 1,
            Transport::NativeMessageHandler => 2,
            Transport::WebViewBridge => 3,
            Transport::PageMessage => 4,
            Transport::DeferredCallback => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Transport::MessageChannel => "message-channel",
            Transport::SyncAccessor => "sync-accessor",
            Transport::NativeMessageHandler => "native-message-handler",
            Transport::WebViewBridge => "webview-bridge",
            Transport::PageMessage => "page-message",
            Transport::DeferredCallback => "deferred-callback",
        }
    }

    /// Same-purpose alternates that are skipped when the dedicated message
    /// channel exists.
    pub fn is_channel_alternate(self) -> bool {
        matches!(
            self,
            Transport::SyncAccessor | Transport::NativeMessageHandler | Transport::WebViewBridge
        )
    }

    /// Whether replies arrive through a listener owned by this transport.
    pub fn listens(self) -> bool {
        matches!(
            self,
            Transport::MessageChannel | Transport::PageMessage | Transport::DeferredCallback
        )
    }

    /// Whether dispatching this transport involves an outbound call.
    pub fn sends(self) -> bool {
        !matches!(self, Transport::DeferredCallback)
    }

    /// Outbound payload for this transport.
    ///
    /// `None` means the transport is exercised without a payload (the synchronous
    /// accessor is simply called) or not at all (the deferred callback).
    pub fn request(self) -> Option<Value> {
        match self {
            Transport::MessageChannel => Some(Value::String(MESSAGE_CHANNEL_REQUEST.to_string())),
            Transport::SyncAccessor => None,
            Transport::NativeMessageHandler => Some(json!({ "action": "getUser" })),
            Transport::WebViewBridge => Some(Value::String(WEBVIEW_BRIDGE_REQUEST.to_string())),
            Transport::PageMessage => Some(json!({ "type": GET_USER })),
            Transport::DeferredCallback => None,
        }
    }

    /// Turn a raw inbound payload into an identity.
    ///
    /// For [`SyncAccessor`](Transport::SyncAccessor) the payload is the accessor's
    /// return value.
    pub fn decode(self, raw: Value) -> Result<IdentityRecord, DecodeError> {
        match self {
            Transport::MessageChannel => decode_envelope(raw),
            Transport::SyncAccessor | Transport::DeferredCallback => decode_direct(raw),
            Transport::PageMessage => decode_page_message(raw),
            Transport::NativeMessageHandler | Transport::WebViewBridge => {
                Err(DecodeError::NoInbound(self))
            }
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// JavaScript-style truthiness, used for values handed back by the host.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parse a JSON document if the host delivered one as a string.
fn parse_if_string(raw: Value) -> Result<Value, DecodeError> {
    match raw {
        Value::String(text) => Ok(serde_json::from_str(&text)?),
        other => Ok(other),
    }
}

fn decode_direct(raw: Value) -> Result<IdentityRecord, DecodeError> {
    if !is_truthy(&raw) {
        return Err(DecodeError::Empty);
    }
    IdentityRecord::from_value(parse_if_string(raw)?)
}

fn decode_envelope(raw: Value) -> Result<IdentityRecord, DecodeError> {
    let envelope = parse_if_string(raw)?;
    let Value::Object(mut envelope) = envelope else {
        return Err(DecodeError::NotAnObject);
    };
    if envelope.get("name").and_then(Value::as_str) != Some(USERINFO) {
        return Err(DecodeError::Unrelated);
    }
    match envelope.remove("data") {
        None | Some(Value::Null) => Err(DecodeError::Empty),
        Some(data) => IdentityRecord::from_value(parse_if_string(data)?),
    }
}

fn decode_page_message(raw: Value) -> Result<IdentityRecord, DecodeError> {
    let message = parse_if_string(raw)?;
    let Value::Object(mut message) = message else {
        return Err(DecodeError::NotAnObject);
    };
    if message.get("type").and_then(Value::as_str) == Some(USER_REPLY) {
        return match message.remove("user") {
            None | Some(Value::Null) => Err(DecodeError::Empty),
            Some(user) => IdentityRecord::from_value(user),
        };
    }
    match message.remove("townpass_user") {
        Some(Value::Null) => Err(DecodeError::Empty),
        Some(user) => IdentityRecord::from_value(user),
        None => Err(DecodeError::Unrelated),
    }
}
