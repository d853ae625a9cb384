use bridge::BridgeConfig;
use dioxus::prelude::*;

use ui::TownPassProvider;
use views::{Gate, Home};

mod views;

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[layout(Gate)]
        #[route("/")]
        Home {},
}

const TOWNPASS_TOML: &str = include_str!("../townpass.toml");

fn main() {
    dioxus::launch(App);
}

fn load_config() -> BridgeConfig {
    match BridgeConfig::from_toml(TOWNPASS_TOML) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid townpass.toml, using defaults: {}", e);
            BridgeConfig::default()
        }
    }
}

#[component]
fn App() -> Element {
    let config = use_hook(load_config);

    rsx! {
        TownPassProvider {
            config,
            Router::<Route> {}
        }
    }
}
