//! TownPass authentication context and hooks for the UI.

use bridge::{AuthState, BridgeConfig, IdentityRecord, PlatformHost, TownPassAuth};
use dioxus::prelude::*;

/// The bridge as used by the UI on the current platform.
pub type Bridge = TownPassAuth<PlatformHost>;

/// Handle returned by [`use_townpass`].
///
/// Cheap to copy into event handlers. `state` is a signal mirror of the bridge's
/// own state, so components re-render on every transition. Work is spawned on the
/// root scope: the component that started a request may unmount while it runs.
#[derive(Clone, Copy)]
pub struct TownPassHandle {
    state: Signal<AuthState>,
    bridge: CopyValue<Option<Bridge>>,
    auto_login: bool,
}

impl TownPassHandle {
    pub fn state(&self) -> Signal<AuthState> {
        self.state
    }

    /// Whether a resolved user goes straight to the backend.
    pub fn auto_login(&self) -> bool {
        self.auto_login
    }

    /// Request the user again, logging in as the provider was configured to.
    pub fn retry(&self) {
        self.authenticate(self.auto_login);
    }

    /// Ask the container for the user. The outcome lands in [`state`](Self::state).
    pub fn request_user(&self) {
        self.authenticate(false);
    }

    /// Verify `user` with the backend.
    pub fn login(&self, user: IdentityRecord) {
        let Some(bridge) = self.bridge.cloned() else {
            return;
        };
        spawn_forever(async move {
            if let Err(e) = bridge.login(&user).await {
                tracing::debug!("TownPass login failed: {}", e);
            }
        });
    }

    /// Ask the container for the user and, if `login` is set, verify whoever
    /// comes back.
    pub fn authenticate(&self, login: bool) {
        let Some(bridge) = self.bridge.cloned() else {
            return;
        };
        spawn_forever(async move {
            match bridge.request_user().await {
                Ok(user) if login => {
                    if let Err(e) = bridge.login(&user).await {
                        tracing::debug!("TownPass login failed: {}", e);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("TownPass user request ended: {}", e),
            }
        });
    }

    pub fn reset(&self) {
        if let Some(bridge) = self.bridge.cloned() {
            bridge.reset();
        }
    }
}

/// Get the TownPass handle provided by the nearest [`TownPassProvider`].
pub fn use_townpass() -> TownPassHandle {
    use_context::<TownPassHandle>()
}

/// Provider component that owns the bridge.
///
/// With `auto_request` (the default) the container is asked for the user on
/// mount; with `auto_login` as well, a resolved user is sent straight to the
/// backend.
#[component]
pub fn TownPassProvider(
    #[props(default)] config: BridgeConfig,
    #[props(default = true)] auto_request: bool,
    #[props(default = true)] auto_login: bool,
    children: Element,
) -> Element {
    let created = use_hook(move || {
        TownPassAuth::new(PlatformHost::default(), config).map_err(|e| e.to_string())
    });
    let seed = seed_state(&created);
    let state = use_signal(move || seed);

    let bridge = use_hook(move || {
        let bridge = match created {
            Ok(bridge) => {
                bridge.on_change(move |next| {
                    let mut state = state;
                    state.set(next.clone());
                });
                Some(bridge)
            }
            Err(e) => {
                tracing::error!("Failed to create TownPass bridge: {}", e);
                None
            }
        };
        CopyValue::new(bridge)
    });

    let handle = use_context_provider(|| TownPassHandle {
        state,
        bridge,
        auto_login,
    });

    use_effect(move || {
        if auto_request {
            handle.authenticate(auto_login);
        }
    });

    rsx! {
        {children}
    }
}

/// State the provider starts from: idle, or the reason the bridge could not be
/// built.
fn seed_state(created: &Result<Bridge, String>) -> AuthState {
    match created {
        Ok(_) => AuthState::default(),
        Err(message) => AuthState {
            error: Some(message.clone()),
            ..AuthState::default()
        },
    }
}

/// Button that starts a new request, e.g. after a timeout.
#[component]
pub fn RetryButton(
    #[props(default = "Try again".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let townpass = use_townpass();
    let loading = townpass.state()().is_loading;

    rsx! {
        button {
            class: "{class}",
            disabled: loading,
            onclick: move |_| townpass.retry(),
            if loading {
                "Loading..."
            } else {
                "{label}"
            }
        }
    }
}

/// Button that drops the current identity and returns to idle.
#[component]
pub fn ResetButton(
    #[props(default = "Reset".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let townpass = use_townpass();

    rsx! {
        button {
            class: "{class}",
            onclick: move |_| townpass.reset(),
            "{label}"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dioxus::dioxus_core::VirtualDom;
    use std::cell::Cell;

    thread_local! {
        static SEEN_AUTO_LOGIN: Cell<Option<bool>> = const { Cell::new(None) };
        static SEEN_STATE: std::cell::RefCell<Option<AuthState>> = const { std::cell::RefCell::new(None) };
    }

    #[component]
    fn Capture() -> Element {
        let townpass = use_townpass();
        SEEN_AUTO_LOGIN.with(|seen| seen.set(Some(townpass.auto_login())));
        SEEN_STATE.with(|seen| *seen.borrow_mut() = Some(townpass.state()()));
        rsx! {}
    }

    fn manual_provider() -> Element {
        rsx! {
            TownPassProvider {
                auto_request: false,
                auto_login: false,
                Capture {}
            }
        }
    }

    fn default_provider() -> Element {
        rsx! {
            TownPassProvider {
                auto_request: false,
                Capture {}
            }
        }
    }

    #[test]
    fn test_handle_keeps_auto_login_off() {
        let mut dom = VirtualDom::new(manual_provider);
        dom.rebuild_in_place();
        assert_eq!(SEEN_AUTO_LOGIN.with(Cell::get), Some(false));
        assert_eq!(SEEN_STATE.with(|seen| seen.borrow().clone()), Some(AuthState::default()));
    }

    #[test]
    fn test_handle_defaults_to_auto_login() {
        let mut dom = VirtualDom::new(default_provider);
        dom.rebuild_in_place();
        assert_eq!(SEEN_AUTO_LOGIN.with(Cell::get), Some(true));
    }

    #[test]
    fn test_failed_bridge_seeds_error() {
        let seeded = seed_state(&Err("builder error".to_string()));
        assert_eq!(seeded.error.as_deref(), Some("builder error"));
        assert!(!seeded.is_loading);
        assert_eq!(seeded.user, None);
    }
}
