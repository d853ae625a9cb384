//! # Resolution session
//!
//! One bounded attempt at getting an identity out of the container. A session owns
//! everything it creates on the host, so tearing it down is a single call:
//!
//! - a [`ListenerRegistry`] with the listeners attached for this session,
//! - a [`Mailbox`], the single-slot channel every listener reports into.
//!
//! The mailbox wraps a oneshot sender. The first decodable record takes the sender
//! and fulfils it; anything arriving afterwards finds the slot empty and is dropped.
//! Teardown empties the slot as well, which completes the waiting side with
//! `Canceled` and makes late messages from the container harmless.
//!
//! The deadline is not stored here: it is armed next to the receiver in
//! [`TownPassAuth::request_user`](crate::TownPassAuth::request_user) and dies with
//! that future.

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use serde_json::Value;
use tracing::debug;

use crate::dispatch::{dispatch, DispatchReport};
use crate::error::DecodeError;
use crate::host::{HostEnvironment, InboundHandler};
use crate::identity::IdentityRecord;
use crate::registry::ListenerRegistry;
use crate::transport::Transport;

/// What a settled mailbox hands to the waiting side.
pub type Delivery = (Transport, IdentityRecord);

/// Single-slot mailbox shared by every listener of a session.
#[derive(Clone)]
pub struct Mailbox {
    session: u64,
    debug: bool,
    slot: Rc<RefCell<Option<oneshot::Sender<Delivery>>>>,
}

impl Mailbox {
    pub fn new(session: u64, debug: bool) -> (Self, oneshot::Receiver<Delivery>) {
        let (sender, receiver) = oneshot::channel();
        let mailbox = Self {
            session,
            debug,
            slot: Rc::new(RefCell::new(Some(sender))),
        };
        (mailbox, receiver)
    }

    /// Decode `raw` as a reply on `transport` and, if it is the first valid
    /// identity of the session, deliver it.
    ///
    /// Returns whether this payload settled the session.
    pub fn offer(&self, transport: Transport, raw: Value) -> bool {
        if self.is_settled() {
            diag!(self.debug, session = self.session, %transport, "Ignoring reply after settlement");
            return false;
        }
        match transport.decode(raw) {
            Ok(record) => {
                let Some(sender) = self.slot.borrow_mut().take() else {
                    return false;
                };
                diag!(self.debug, session = self.session, %transport, user = record.id(), "Identity received");
                sender.send((transport, record)).is_ok()
            }
            Err(DecodeError::Unrelated) => false,
            Err(err) => {
                diag!(self.debug, session = self.session, %transport, error = %err, "Discarding malformed reply");
                false
            }
        }
    }

    /// Listener callback feeding this mailbox.
    pub fn handler(&self, transport: Transport) -> InboundHandler {
        let mailbox = self.clone();
        Rc::new(move |raw| {
            mailbox.offer(transport, raw);
        })
    }

    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_none()
    }

    /// Drop the sender without delivering anything.
    pub fn close(&self) {
        self.slot.borrow_mut().take();
    }
}

/// The mutable context of one resolution attempt.
pub struct ResolutionSession {
    id: u64,
    registry: ListenerRegistry,
    mailbox: Mailbox,
    report: DispatchReport,
}

impl ResolutionSession {
    /// Arm listeners and send the identity request on every usable transport.
    pub fn start<H: HostEnvironment + ?Sized>(
        id: u64,
        host: &H,
        debug: bool,
    ) -> (Self, oneshot::Receiver<Delivery>) {
        let (mailbox, receiver) = Mailbox::new(id, debug);
        let mut registry = ListenerRegistry::new();
        let report = dispatch(host, &mut registry, &mailbox, debug);
        debug!(
            session = id,
            listening = report.listening.len(),
            sent = report.sent.len(),
            failed = report.failed.len(),
            "TownPass session started"
        );
        let session = Self {
            id,
            registry,
            mailbox,
            report,
        };
        (session, receiver)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn report(&self) -> &DispatchReport {
        &self.report
    }

    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    /// Release every listener and empty the mailbox. Idempotent.
    pub fn teardown(&mut self) {
        self.mailbox.close();
        self.registry.detach_all();
    }
}

impl Drop for ResolutionSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for ResolutionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionSession")
            .field("id", &self.id)
            .field("listeners", &self.registry.len())
            .field("settled", &self.mailbox.is_settled())
            .finish()
    }
}
