//! Gate shown until the TownPass user is resolved and verified.

use dioxus::prelude::*;
use ui::{use_townpass, ResetButton, RetryButton, TownPassStatus};

use crate::Route;

/// Layout that only renders its outlet for an authenticated user.
#[component]
pub fn Gate() -> Element {
    let townpass = use_townpass();
    let state = townpass.state()();

    if state.is_authenticated {
        return rsx! {
            header {
                class: "gate-header",
                style: "display: flex; justify-content: flex-end; padding: 0.5rem 1rem;",
                TownPassStatus {}
            }
            Outlet::<Route> {}
        };
    }

    let message = if state.is_loading {
        "Connecting to TownPass...".to_string()
    } else if let Some(error) = &state.error {
        error.clone()
    } else {
        "Open this page from the TownPass app to sign in.".to_string()
    };

    rsx! {
        div {
            class: "gate-container",
            style: "display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; padding: 2rem; background: #ffffff;",

            h1 {
                style: "margin-bottom: 0.5rem; color: #37352f; font-weight: 700; font-size: 1.75rem;",
                "TownPass"
            }

            p {
                class: if state.error.is_some() { "gate-message gate-message--error" } else { "gate-message" },
                "{message}"
            }

            if !state.is_loading {
                div {
                    class: "gate-buttons",
                    style: "display: flex; flex-direction: column; gap: 0.75rem; width: 100%; max-width: 320px;",

                    RetryButton { class: "gate-btn gate-btn--primary" }
                    if state.user.is_some() || state.error.is_some() {
                        ResetButton { class: "gate-btn" }
                    }
                }
            }
        }

        style {
            r#"
            .gate-message {{
                margin-bottom: 2rem;
                color: #787774;
                font-size: 0.9375rem;
            }}

            .gate-message--error {{
                color: #eb5757;
            }}

            .gate-btn {{
                display: flex;
                align-items: center;
                justify-content: center;
                padding: 0.625rem 1.25rem;
                border: 1px solid #e9e9e7;
                border-radius: 4px;
                background: #ffffff;
                font-size: 0.9375rem;
                font-weight: 500;
                cursor: pointer;
                font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
            }}

            .gate-btn--primary {{
                background-color: #2383e2;
                border-color: #2383e2;
                color: #ffffff;
            }}

            .gate-btn:disabled {{
                opacity: 0.5;
                cursor: not-allowed;
            }}
            "#
        }
    }
}
