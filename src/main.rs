//! Entry point of the dashboard: creates the services once and mounts the
//! Yew tree.

use std::rc::Rc;
use track_dashboard::components::{Dashboard, LocationProvider};
use track_dashboard::config::LOG_LEVEL;
use track_dashboard::hooks::RemoteHandle;
use track_dashboard::{LocationStore, RemoteData};
use yew::prelude::*;

/// Owns the location store and the remote data service for the page.
#[function_component]
pub fn App() -> Html {
    let store = use_state(|| Rc::new(LocationStore::browser()));
    let remote = use_state(|| RemoteHandle(Rc::new(RemoteData::browser())));

    html! {
        <ContextProvider<RemoteHandle> context={(*remote).clone()}>
            <LocationProvider store={(*store).clone()}>
                <Dashboard />
            </LocationProvider>
        </ContextProvider<RemoteHandle>>
    }
}

fn main() {
    console_error_panic_hook::set_once();
    // Fails only when a logger is already installed
    let _ = console_log::init_with_level(LOG_LEVEL);
    log::info!("Starting track dashboard");
    yew::Renderer::<App>::new().render();
}
