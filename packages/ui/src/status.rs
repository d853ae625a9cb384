//! Compact TownPass status badge.

use bridge::AuthState;
use dioxus::prelude::*;

use crate::auth::use_townpass;
use crate::icons::{FaSpinner, FaTriangleExclamation, FaUser, FaUserCheck, FaUserSlash};
use crate::Icon;

/// What the badge shows for a given state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Idle,
    Loading,
    Identified,
    Authenticated,
    Failed,
}

impl StatusKind {
    pub fn of(state: &AuthState) -> Self {
        if state.is_loading {
            StatusKind::Loading
        } else if state.is_authenticated {
            StatusKind::Authenticated
        } else if state.error.is_some() {
            StatusKind::Failed
        } else if state.user.is_some() {
            StatusKind::Identified
        } else {
            StatusKind::Idle
        }
    }

    fn class(self) -> &'static str {
        match self {
            StatusKind::Idle => "townpass-status--idle",
            StatusKind::Loading => "townpass-status--loading",
            StatusKind::Identified => "townpass-status--identified",
            StatusKind::Authenticated => "townpass-status--authenticated",
            StatusKind::Failed => "townpass-status--failed",
        }
    }
}

/// A small icon for the current TownPass state, with the user or error as tooltip.
///
/// - **Loading**: spinner
/// - **Authenticated**: checked user
/// - **Resolved, not verified**: plain user
/// - **Error**: warning, titled with the message
/// - **Idle**: slashed user
#[component]
pub fn TownPassStatus() -> Element {
    let townpass = use_townpass();
    let state = townpass.state()();
    let kind = StatusKind::of(&state);

    let title = match (&state.error, &state.user) {
        (Some(error), _) if kind == StatusKind::Failed => error.clone(),
        (_, Some(user)) => user.display_name().to_string(),
        _ => "Not signed in".to_string(),
    };
    let class = format!("townpass-status {}", kind.class());
    let icon = match kind {
        StatusKind::Loading => rsx! { Icon { icon: FaSpinner, width: 14, height: 14 } },
        StatusKind::Authenticated => rsx! { Icon { icon: FaUserCheck, width: 14, height: 14 } },
        StatusKind::Identified => rsx! { Icon { icon: FaUser, width: 14, height: 14 } },
        StatusKind::Failed => rsx! { Icon { icon: FaTriangleExclamation, width: 14, height: 14 } },
        StatusKind::Idle => rsx! { Icon { icon: FaUserSlash, width: 14, height: 14 } },
    };

    rsx! {
        span {
            class: "{class}",
            title: "{title}",
            {icon}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge::IdentityRecord;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(StatusKind::of(&AuthState::default()), StatusKind::Idle);
    }

    #[test]
    fn test_loading_wins() {
        let state = AuthState {
            is_loading: true,
            error: Some("stale".to_string()),
            ..AuthState::default()
        };
        assert_eq!(StatusKind::of(&state), StatusKind::Loading);
    }

    #[test]
    fn test_resolved_user_without_backend() {
        let state = AuthState {
            user: Some(IdentityRecord::new("u-1")),
            ..AuthState::default()
        };
        assert_eq!(StatusKind::of(&state), StatusKind::Identified);
    }

    #[test]
    fn test_rejected_login_keeps_user_but_fails() {
        let state = AuthState {
            user: Some(IdentityRecord::new("u-1")),
            error: Some("Invalid TownPass signature".to_string()),
            ..AuthState::default()
        };
        assert_eq!(StatusKind::of(&state), StatusKind::Failed);
    }

    #[test]
    fn test_authenticated() {
        let state = AuthState {
            user: Some(IdentityRecord::new("u-1")),
            is_authenticated: true,
            ..AuthState::default()
        };
        assert_eq!(StatusKind::of(&state), StatusKind::Authenticated);
    }
}
