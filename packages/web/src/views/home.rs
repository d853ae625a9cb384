use dioxus::prelude::*;
use ui::use_townpass;

/// Landing page for a verified TownPass user.
#[component]
pub fn Home() -> Element {
    let townpass = use_townpass();
    let state = townpass.state()();
    let name = state
        .user
        .as_ref()
        .map(|user| user.display_name().to_string())
        .unwrap_or_default();

    rsx! {
        main {
            style: "padding: 2rem; color: #37352f;",
            h2 { "Welcome, {name}" }
            if let Some(email) = state.user.as_ref().and_then(|user| user.email()) {
                p { style: "color: #787774;", "{email}" }
            }
        }
    }
}
