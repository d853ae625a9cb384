//! # Browser host
//!
//! [`BrowserHost`] is the [`HostEnvironment`] used on the **web platform**. It reads
//! the globals each container injects into the page and never defines any of them,
//! except for the deferred callback slot which it owns while a session listens.
//!
//! | Transport | Global |
//! |-----------|--------|
//! | message channel | `window.flutterObject.postMessage` / `addEventListener("message")` |
//! | sync accessor | `window.TownPass.getUser()` |
//! | native message handler | `window.webkit.messageHandlers.townpass.postMessage` |
//! | webview bridge | `window.ReactNativeWebView.postMessage` |
//! | page message | `window.parent.postMessage(msg, "*")`, window `message` event |
//! | deferred callback | `window.onTownPassUser = fn(user)` |
//!
//! Payloads cross the boundary through `serde_wasm_bindgen`, using the
//! JSON-compatible serializer so objects arrive as plain JS objects rather than
//! `Map`s.

use js_sys::{Function, Object, Reflect};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{MessageEvent, Window};

use crate::error::HostError;
use crate::host::{HostEnvironment, InboundHandler, Subscription};
use crate::transport::Transport;

const DEFERRED_CALLBACK: &str = "onTownPassUser";

/// Host backed by the page's `window`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserHost;

impl BrowserHost {
    pub fn new() -> Self {
        Self
    }

    fn window(&self, transport: Transport) -> Result<Window, HostError> {
        web_sys::window().ok_or(HostError::Unavailable(transport))
    }

    /// `(receiver, method)` for the outbound side of a channel transport.
    fn endpoint(&self, transport: Transport) -> Option<(JsValue, Function)> {
        let window: JsValue = web_sys::window()?.into();
        let (path, method): (&[&str], &str) = match transport {
            Transport::MessageChannel => (&["flutterObject"], "postMessage"),
            Transport::SyncAccessor => (&["TownPass"], "getUser"),
            Transport::NativeMessageHandler => (&["webkit", "messageHandlers", "townpass"], "postMessage"),
            Transport::WebViewBridge => (&["ReactNativeWebView"], "postMessage"),
            Transport::PageMessage | Transport::DeferredCallback => return None,
        };
        let receiver = lookup(&window, path)?;
        let function = lookup(&receiver, &[method])?.dyn_into::<Function>().ok()?;
        Some((receiver, function))
    }
}

impl HostEnvironment for BrowserHost {
    fn is_available(&self, transport: Transport) -> bool {
        match transport {
            Transport::PageMessage | Transport::DeferredCallback => web_sys::window().is_some(),
            _ => self.endpoint(transport).is_some(),
        }
    }

    fn send(&self, transport: Transport, request: Option<Value>) -> Result<Option<Value>, HostError> {
        match transport {
            Transport::DeferredCallback => Ok(None),
            Transport::PageMessage => {
                let window = self.window(transport)?;
                let target = window
                    .parent()
                    .map_err(|e| script_error(transport, e))?
                    .unwrap_or(window);
                let message = to_js(transport, request.as_ref())?;
                target
                    .post_message(&message, "*")
                    .map_err(|e| script_error(transport, e))?;
                Ok(None)
            }
            Transport::SyncAccessor => {
                let (receiver, get_user) = self.endpoint(transport).ok_or(HostError::Unavailable(transport))?;
                let reply = get_user.call0(&receiver).map_err(|e| script_error(transport, e))?;
                from_js(transport, reply).map(Some)
            }
            _ => {
                let (receiver, post) = self.endpoint(transport).ok_or(HostError::Unavailable(transport))?;
                let message = to_js(transport, request.as_ref())?;
                post.call1(&receiver, &message)
                    .map_err(|e| script_error(transport, e))?;
                Ok(None)
            }
        }
    }

    fn listen(&self, transport: Transport, handler: InboundHandler) -> Result<Subscription, HostError> {
        match transport {
            Transport::MessageChannel => {
                let window: JsValue = self.window(transport)?.into();
                let target = lookup(&window, &["flutterObject"]).ok_or(HostError::Unavailable(transport))?;
                let function = |name: &str| {
                    lookup(&target, &[name])
                        .and_then(|f| f.dyn_into::<Function>().ok())
                        .ok_or(HostError::NotListenable(transport))
                };
                let add = function("addEventListener")?;
                let remove = function("removeEventListener")?;

                let closure = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
                    let data = Reflect::get(&event, &JsValue::from_str("data")).unwrap_or(event);
                    if let Ok(payload) = from_js(Transport::MessageChannel, data) {
                        handler(payload);
                    }
                });
                let event = JsValue::from_str("message");
                add.call2(&target, &event, closure.as_ref())
                    .map_err(|e| script_error(transport, e))?;

                Ok(Subscription::new(move || {
                    let _ = remove.call2(&target, &event, closure.as_ref());
                }))
            }
            Transport::PageMessage => {
                let window = self.window(transport)?;
                let closure = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                    if let Ok(payload) = from_js(Transport::PageMessage, event.data()) {
                        handler(payload);
                    }
                });
                window
                    .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
                    .map_err(|e| script_error(transport, e))?;

                Ok(Subscription::new(move || {
                    let _ = window
                        .remove_event_listener_with_callback("message", closure.as_ref().unchecked_ref());
                }))
            }
            Transport::DeferredCallback => {
                let window: JsValue = self.window(transport)?.into();
                let closure = Closure::<dyn FnMut(JsValue)>::new(move |user: JsValue| {
                    if let Ok(payload) = from_js(Transport::DeferredCallback, user) {
                        handler(payload);
                    }
                });
                let slot = JsValue::from_str(DEFERRED_CALLBACK);
                Reflect::set(&window, &slot, closure.as_ref())
                    .map_err(|e| script_error(transport, e))?;

                Ok(Subscription::new(move || {
                    // A newer session may already own the slot.
                    let ours = Reflect::get(&window, &slot)
                        .map(|current| Object::is(&current, closure.as_ref()))
                        .unwrap_or(false);
                    if ours {
                        let _ = Reflect::delete_property(window.unchecked_ref::<Object>(), &slot);
                    }
                }))
            }
            _ => Err(HostError::NotListenable(transport)),
        }
    }
}

/// Walk `path` from `root`, treating `undefined`, `null` and throwing getters as
/// absent.
fn lookup(root: &JsValue, path: &[&str]) -> Option<JsValue> {
    let mut current = root.clone();
    for key in path {
        let next = Reflect::get(&current, &JsValue::from_str(key)).ok()?;
        if next.is_undefined() || next.is_null() {
            return None;
        }
        current = next;
    }
    Some(current)
}

fn to_js(transport: Transport, value: Option<&Value>) -> Result<JsValue, HostError> {
    match value {
        None => Ok(JsValue::UNDEFINED),
        Some(value) => value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| HostError::Script {
                transport,
                message: e.to_string(),
            }),
    }
}

fn from_js(transport: Transport, value: JsValue) -> Result<Value, HostError> {
    if value.is_undefined() {
        return Ok(Value::Null);
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| HostError::Script {
        transport,
        message: e.to_string(),
    })
}

fn script_error(transport: Transport, err: JsValue) -> HostError {
    let message = err
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    HostError::Script { transport, message }
}
