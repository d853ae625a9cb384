//! # TownPass auth facade
//!
//! [`TownPassAuth`] is what the rest of the app holds. It owns the host handle, the
//! current [`ResolutionSession`] (if any), the observable [`AuthState`], and the
//! [`BackendHandoff`] client, and exposes three operations:
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`request_user`](TownPassAuth::request_user) | tears down any previous session, starts a new one, waits for the first identity or the deadline |
//! | [`login`](TownPassAuth::login) | posts an identity to the backend and records whether it was accepted |
//! | [`reset`](TownPassAuth::reset) | tears everything down and returns the state to idle |
//!
//! The handle is cheap to clone and single-threaded (`Rc` inside). Observers
//! registered with [`on_change`](TownPassAuth::on_change) see every state the
//! machine goes through.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{self, Either};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::deadline::Deadline;
use crate::dispatch::DispatchReport;
use crate::error::{BridgeError, BridgeResult};
use crate::handoff::BackendHandoff;
use crate::host::HostEnvironment;
use crate::identity::IdentityRecord;
use crate::session::ResolutionSession;
use crate::state::{AuthState, Phase};
use crate::transport::Transport;

type Observer = Rc<dyn Fn(&AuthState)>;

struct Inner<H> {
    host: H,
    config: BridgeConfig,
    handoff: BackendHandoff,
    state: RefCell<AuthState>,
    phase: Cell<Phase>,
    session: RefCell<Option<ResolutionSession>>,
    last_report: RefCell<DispatchReport>,
    next_session: Cell<u64>,
    generation: Cell<u64>,
    observers: RefCell<Vec<Observer>>,
}

/// Identity bridge between the page and its hosting container.
pub struct TownPassAuth<H> {
    inner: Rc<Inner<H>>,
}

impl<H> Clone for TownPassAuth<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: HostEnvironment> TownPassAuth<H> {
    pub fn new(host: H, config: BridgeConfig) -> BridgeResult<Self> {
        let handoff = BackendHandoff::new(&config)?;
        Ok(Self {
            inner: Rc::new(Inner {
                host,
                config,
                handoff,
                state: RefCell::new(AuthState::default()),
                phase: Cell::new(Phase::Idle),
                session: RefCell::new(None),
                last_report: RefCell::new(DispatchReport::default()),
                next_session: Cell::new(1),
                generation: Cell::new(0),
                observers: RefCell::new(Vec::new()),
            }),
        })
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Snapshot of the observable state.
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    /// Whether a resolution session is currently waiting.
    pub fn is_requesting(&self) -> bool {
        self.inner.session.borrow().is_some()
    }

    /// What the most recent session probed, attached, sent and failed on.
    pub fn last_report(&self) -> DispatchReport {
        self.inner.last_report.borrow().clone()
    }

    /// Listeners held by the active session.
    pub fn active_listeners(&self) -> usize {
        self.inner
            .session
            .borrow()
            .as_ref()
            .map_or(0, ResolutionSession::listener_count)
    }

    /// Call `observer` with every new state.
    pub fn on_change(&self, observer: impl Fn(&AuthState) + 'static) {
        self.inner.observers.borrow_mut().push(Rc::new(observer));
    }

    /// Start a resolution session and wait for its outcome.
    ///
    /// Any session still in flight is torn down first; its caller gets
    /// [`BridgeError::Cancelled`]. The returned future owns the session's
    /// deadline, so it has to be polled for the session to make progress.
    /// Dropping it before it settles ends the session and clears `is_loading`.
    pub async fn request_user(&self) -> BridgeResult<IdentityRecord> {
        self.teardown_session();

        let id = self.inner.next_session.get();
        self.inner.next_session.set(id + 1);

        self.inner.phase.set(Phase::Requesting);
        self.update(AuthState::begin_request);

        let timeout = self.inner.config.timeout();
        let (session, receiver) = ResolutionSession::start(id, &self.inner.host, self.inner.config.debug);
        *self.inner.last_report.borrow_mut() = session.report().clone();
        *self.inner.session.borrow_mut() = Some(session);
        debug!(session = id, timeout_ms = self.inner.config.timeout_ms, "Requesting TownPass user");

        let mut pending = PendingSession { auth: self, id, armed: true };
        let outcome = future::select(receiver, Deadline::arm(timeout)).await;
        pending.armed = false;

        match outcome {
            Either::Left((Ok((transport, record)), _)) => self.settle_resolved(id, transport, record),
            Either::Left((Err(_), _)) => {
                debug!(session = id, "TownPass session superseded");
                Err(BridgeError::Cancelled)
            }
            Either::Right(((), _)) => self.settle_timed_out(id),
        }
    }

    /// Verify `user` with the backend.
    ///
    /// The state reflects the outcome; the outcome is also returned so callers
    /// can react to a rejection. A verification that settles after
    /// [`reset`](Self::reset) leaves the reset state alone.
    pub async fn login(&self, user: &IdentityRecord) -> BridgeResult<Value> {
        let generation = self.inner.generation.get();
        self.update(AuthState::begin_login);

        let result = self.inner.handoff.verify(user).await;

        if self.inner.generation.get() != generation {
            debug!(user = user.id(), "Ignoring TownPass verification finished after reset");
            return result;
        }
        match &result {
            Ok(_) => {
                info!(user = user.id(), "TownPass user authenticated");
                self.update(AuthState::login_succeeded);
            }
            Err(err) => {
                warn!(user = user.id(), error = %err, "TownPass verification failed");
                let message = err.to_string();
                self.update(move |state| state.login_failed(message));
            }
        }
        result
    }

    /// Tear down any session and return to the idle state.
    pub fn reset(&self) {
        self.teardown_session();
        self.inner.generation.set(self.inner.generation.get() + 1);
        self.inner.phase.set(Phase::Idle);
        self.update(|state| *state = AuthState::default());
        debug!("TownPass state reset");
    }

    fn settle_resolved(
        &self,
        id: u64,
        transport: Transport,
        record: IdentityRecord,
    ) -> BridgeResult<IdentityRecord> {
        if !self.end_session(id) {
            return Err(BridgeError::Cancelled);
        }
        info!(session = id, %transport, user = record.id(), "TownPass user resolved");
        self.inner.phase.set(Phase::Resolved);
        let resolved = record.clone();
        self.update(move |state| state.resolve(resolved));
        Ok(record)
    }

    fn settle_timed_out(&self, id: u64) -> BridgeResult<IdentityRecord> {
        if !self.end_session(id) {
            return Err(BridgeError::Cancelled);
        }
        warn!(session = id, timeout_ms = self.inner.config.timeout_ms, "TownPass user request timed out");
        self.inner.phase.set(Phase::TimedOut);
        self.update(AuthState::time_out);
        Err(BridgeError::Timeout)
    }

    /// The future waiting on session `id` went away before it settled.
    fn abandon_session(&self, id: u64) {
        if !self.end_session(id) {
            return;
        }
        debug!(session = id, "TownPass request dropped before settling");
        self.inner.phase.set(Phase::Idle);
        self.update(AuthState::abandon);
    }

    /// Tear down session `id` if it is still the active one.
    fn end_session(&self, id: u64) -> bool {
        let session = {
            let mut slot = self.inner.session.borrow_mut();
            match slot.as_ref() {
                Some(active) if active.id() == id => slot.take(),
                _ => None,
            }
        };
        match session {
            Some(mut session) => {
                session.teardown();
                true
            }
            None => false,
        }
    }

    fn teardown_session(&self) {
        let previous = self.inner.session.borrow_mut().take();
        if let Some(mut session) = previous {
            debug!(session = session.id(), "Tearing down TownPass session");
            session.teardown();
        }
    }

    fn update(&self, change: impl FnOnce(&mut AuthState)) {
        let snapshot = {
            let mut state = self.inner.state.borrow_mut();
            change(&mut state);
            state.clone()
        };
        let observers: Vec<Observer> = self.inner.observers.borrow().clone();
        for observer in observers {
            observer(&snapshot);
        }
    }
}

/// Ends its session when the `request_user` future is dropped mid-wait.
struct PendingSession<'a, H: HostEnvironment> {
    auth: &'a TownPassAuth<H>,
    id: u64,
    armed: bool,
}

impl<H: HostEnvironment> Drop for PendingSession<'_, H> {
    fn drop(&mut self) {
        if self.armed {
            self.auth.abandon_session(self.id);
        }
    }
}

impl<H> std::fmt::Debug for TownPassAuth<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TownPassAuth")
            .field("phase", &self.inner.phase.get())
            .field("state", &self.inner.state.borrow())
            .finish()
    }
}
