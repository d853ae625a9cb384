//! # Observable authentication state
//!
//! [`AuthState`] is the only thing other parts of the app see of the bridge:
//! `{user, is_loading, error, is_authenticated}`. The transition methods below are
//! the whole state machine; [`crate::client`] decides when to call them.
//!
//! ```text
//!          request_user()             first record
//!  Idle ───────────────▶ Requesting ───────────────▶ Resolved
//!   ▲                        │  deadline
//!   │ reset()                └─────────▶ TimedOut
//!   └──────── (from any phase)
//! ```
//!
//! `Resolved` and `TimedOut` accept another `request_user()`. The backend handoff
//! is a separate sub-machine over `is_loading`, `is_authenticated` and `error`
//! that never touches [`Phase`].

use serde::{Deserialize, Serialize};

use crate::error::TIMEOUT_MESSAGE;
use crate::identity::IdentityRecord;

/// Resolution phase of the bridge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Requesting,
    Resolved,
    TimedOut,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<IdentityRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub is_authenticated: bool,
}

impl AuthState {
    /// Entry to `Requesting`.
    pub(crate) fn begin_request(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    /// `Requesting → Resolved`. Authentication is left to the handoff.
    pub(crate) fn resolve(&mut self, user: IdentityRecord) {
        self.user = Some(user);
        self.is_loading = false;
        self.error = None;
    }

    /// `Requesting → TimedOut`.
    pub(crate) fn time_out(&mut self) {
        self.user = None;
        self.is_loading = false;
        self.error = Some(TIMEOUT_MESSAGE.to_string());
    }

    /// `Requesting → Idle` when nobody waits for the session any more.
    pub(crate) fn abandon(&mut self) {
        self.is_loading = false;
    }

    pub(crate) fn begin_login(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    pub(crate) fn login_succeeded(&mut self) {
        self.is_loading = false;
        self.is_authenticated = true;
        self.error = None;
    }

    pub(crate) fn login_failed(&mut self, message: String) {
        self.is_loading = false;
        self.is_authenticated = false;
        self.error = Some(message);
    }

    pub fn is_idle(&self) -> bool {
        *self == AuthState::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let state = AuthState::default();
        assert_eq!(state.user, None);
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
        assert!(!state.is_authenticated);
        assert!(state.is_idle());
    }

    #[test]
    fn test_request_clears_error() {
        let mut state = AuthState::default();
        state.time_out();
        state.begin_request();
        assert!(state.is_loading);
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_resolve_does_not_authenticate() {
        let mut state = AuthState::default();
        state.begin_request();
        state.resolve(IdentityRecord::new("u-1"));
        assert_eq!(state.user.as_ref().map(IdentityRecord::id), Some("u-1"));
        assert!(!state.is_loading);
        assert!(!state.is_authenticated);
    }

    #[test]
    fn test_timeout_drops_user() {
        let mut state = AuthState::default();
        state.resolve(IdentityRecord::new("u-1"));
        state.begin_request();
        state.time_out();
        assert_eq!(state.user, None);
        assert_eq!(state.error.as_deref(), Some("TownPass authentication timeout"));
        assert!(!state.is_loading);
    }

    #[test]
    fn test_login_transitions() {
        let mut state = AuthState::default();
        state.begin_login();
        assert!(state.is_loading);

        state.login_failed("HTTP 500".to_string());
        assert!(!state.is_loading);
        assert!(!state.is_authenticated);
        assert_eq!(state.error.as_deref(), Some("HTTP 500"));

        state.begin_login();
        state.login_succeeded();
        assert!(state.is_authenticated);
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_abandon_only_stops_loading() {
        let mut state = AuthState::default();
        state.resolve(IdentityRecord::new("u-1"));
        state.begin_request();
        state.abandon();
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
        assert_eq!(state.user.as_ref().map(IdentityRecord::id), Some("u-1"));
    }

    #[test]
    fn test_serializes_with_collaborator_names() {
        let value = serde_json::to_value(AuthState::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "user": null,
                "isLoading": false,
                "error": null,
                "isAuthenticated": false,
            })
        );
    }
}
