//! Identity bridge between a web page and the TownPass container hosting it.
//!
//! The page does not know which container it runs in, so [`TownPassAuth::request_user`]
//! asks every transport the host exposes at once and takes the first identity that
//! comes back, bounded by a deadline. [`TownPassAuth::login`] then hands that
//! identity to the backend for verification.

/// Per-attempt diagnostics, only emitted with [`BridgeConfig::debug`] set.
macro_rules! diag {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            ::tracing::debug!($($arg)+);
        }
    };
}

pub mod client;
pub mod config;
pub mod deadline;
pub mod dispatch;
pub mod error;
pub mod handoff;
pub mod host;
pub mod identity;
pub mod probe;
pub mod registry;
pub mod session;
pub mod state;
pub mod transport;

mod memory;
pub use memory::SimulatedHost;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod browser;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use browser::BrowserHost;

pub use client::TownPassAuth;
pub use config::BridgeConfig;
pub use dispatch::{plan, DispatchReport};
pub use error::{BridgeError, BridgeResult, DecodeError, HostError, TIMEOUT_MESSAGE};
pub use handoff::BackendHandoff;
pub use host::{HostEnvironment, InboundHandler, Subscription};
pub use identity::IdentityRecord;
pub use probe::probe;
pub use state::{AuthState, Phase};
pub use transport::Transport;

/// The host the current target talks to.
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub type PlatformHost = BrowserHost;
#[cfg(not(all(target_arch = "wasm32", feature = "web")))]
pub type PlatformHost = SimulatedHost;
