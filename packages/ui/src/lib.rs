//! This crate contains all shared UI for the workspace.

// Re-export icon library
pub use dioxus_free_icons::Icon;
pub mod icons {
    pub use dioxus_free_icons::icons::fa_solid_icons::*;
}

mod auth;
pub use auth::{use_townpass, Bridge, ResetButton, RetryButton, TownPassHandle, TownPassProvider};

mod status;
pub use status::{StatusKind, TownPassStatus};
