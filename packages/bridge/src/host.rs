//! # Host environment abstraction
//!
//! The bridge never touches globals directly. Everything it needs from the page it
//! is embedded in goes through [`HostEnvironment`]: a capability test, an outbound
//! call, and a way to start listening for replies. Implementations live in sibling
//! modules ([`crate::memory`] for native targets and tests, `crate::browser` for
//! the web platform).
//!
//! Listening hands back a [`Subscription`]. The subscription owns whatever the host
//! registered (an event listener, a closure stored on `window`, ...) and releases it
//! exactly once, either on [`Subscription::release`] or when dropped.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::HostError;
use crate::transport::Transport;

/// Callback the host invokes with every raw inbound payload.
pub type InboundHandler = Rc<dyn Fn(Value)>;

/// The page-level surface the bridge talks through.
pub trait HostEnvironment {
    /// Capability test. Must not block, panic or have side effects; a test
    /// that fails for any reason reports the transport as absent.
    fn is_available(&self, transport: Transport) -> bool;

    /// Exercise the outbound side of `transport`.
    ///
    /// Returns the synchronous reply, if the transport has one (only the
    /// accessor does).
    fn send(&self, transport: Transport, request: Option<Value>) -> Result<Option<Value>, HostError>;

    /// Start delivering raw inbound payloads of `transport` to `handler`.
    fn listen(&self, transport: Transport, handler: InboundHandler) -> Result<Subscription, HostError>;
}

impl<H: HostEnvironment + ?Sized> HostEnvironment for Rc<H> {
    fn is_available(&self, transport: Transport) -> bool {
        (**self).is_available(transport)
    }

    fn send(&self, transport: Transport, request: Option<Value>) -> Result<Option<Value>, HostError> {
        (**self).send(transport, request)
    }

    fn listen(&self, transport: Transport, handler: InboundHandler) -> Result<Subscription, HostError> {
        (**self).listen(transport, handler)
    }
}

/// Owned registration of one listener on the host.
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Remove the listener from the host. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
