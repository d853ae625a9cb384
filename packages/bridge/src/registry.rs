//! Response listener registry: one listener per receiving transport, torn down
//! together.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::HostError;
use crate::host::{HostEnvironment, InboundHandler, Subscription};
use crate::transport::Transport;

/// Listeners attached during one resolution session.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    listeners: BTreeMap<Transport, Subscription>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `handler` to `transport` on `host`.
    ///
    /// A transport holds at most one listener; attaching again releases the
    /// previous one first.
    pub fn attach<H: HostEnvironment + ?Sized>(
        &mut self,
        host: &H,
        transport: Transport,
        handler: InboundHandler,
    ) -> Result<(), HostError> {
        if !transport.listens() {
            return Err(HostError::NotListenable(transport));
        }
        if let Some(mut previous) = self.listeners.remove(&transport) {
            previous.release();
        }
        let subscription = host.listen(transport, handler)?;
        self.listeners.insert(transport, subscription);
        Ok(())
    }

    /// Release every listener of this session. Idempotent.
    pub fn detach_all(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        debug!(count = self.listeners.len(), "Detaching TownPass listeners");
        for (_, mut subscription) in std::mem::take(&mut self.listeners) {
            subscription.release();
        }
    }

    pub fn is_attached(&self, transport: Transport) -> bool {
        self.listeners.contains_key(&transport)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl Drop for ListenerRegistry {
    fn drop(&mut self) {
        self.detach_all();
    }
}
