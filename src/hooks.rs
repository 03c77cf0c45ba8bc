//! Yew hooks over the location store and the remote data service.
//!
//! Both services are created once by the application root and reach
//! components through context; see [`crate::components::LocationProvider`].

use crate::cache::Remote;
use crate::location::{Entry, Location, LocationStore};
use crate::parse::{CanonicalList, TrackConfig};
use crate::remote::{Companion, RemoteData, Resource};
use crate::url_state::{self, AppState, Branch, HideExercise, StateUpdate};
use log::{info, warn};
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Deref;
use std::rc::Rc;
use yew::prelude::*;

/// Shared handle to the remote data service; equal when it is the same
/// service.
#[derive(Debug, Clone)]
pub struct RemoteHandle(pub Rc<RemoteData>);

impl PartialEq for RemoteHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for RemoteHandle {
    type Target = RemoteData;

    fn deref(&self) -> &RemoteData {
        &self.0
    }
}

/// The location store plus the snapshot the current render is based on.
#[derive(Clone)]
pub struct LocationContext {
    pub store: Rc<LocationStore>,
    pub location: Location,
}

impl PartialEq for LocationContext {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store) && self.location == other.location
    }
}

#[hook]
pub fn use_remote() -> RemoteHandle {
    use_context::<RemoteHandle>().expect("use_remote needs a RemoteHandle context")
}

#[hook]
pub fn use_location() -> LocationContext {
    use_context::<LocationContext>().expect("use_location needs a LocationProvider")
}

/// Decoded state of the current location and a way to change it.
#[derive(Clone, PartialEq)]
pub struct UrlState {
    pub state: AppState,
    pub navigate: Callback<StateUpdate>,
}

fn navigate_callback(store: Rc<LocationStore>, remote: RemoteHandle) -> Callback<StateUpdate> {
    Callback::from(move |update: StateUpdate| {
        // Encode against the live location; the render may be stale
        let location = store.snapshot();
        let current = url_state::decode(&location.path, remote.tracks());
        let navigation = url_state::encode(&current, &update, remote.tracks());
        if navigation.href == location.path {
            return;
        }

        info!("Navigating to {}", navigation.href);
        let state = serde_json::to_value(&navigation.state)
            .map_err(|err| warn!("Could not serialise history state: {}", err))
            .ok();
        store.push(&Entry {
            href: navigation.href,
            title: navigation.title,
            state,
        });
    })
}

#[hook]
pub fn use_url_state() -> UrlState {
    let context = use_location();
    let remote = use_remote();
    let state = url_state::decode(&context.location.path, remote.tracks());

    let navigate = {
        let store = context.store.clone();
        use_memo(remote, move |remote| navigate_callback(store, remote.clone()))
    };

    UrlState {
        state,
        navigate: (*navigate).clone(),
    }
}

/// Target of a link applying `update` to the current state.
#[hook]
pub fn use_href(update: &StateUpdate) -> String {
    let UrlState { state, .. } = use_url_state();
    let remote = use_remote();
    url_state::href_for(&state, update, remote.tracks())
}

/// Closes the exercise details, going back when the previous entry is for
/// the same track.
#[hook]
pub fn use_hide_exercise() -> Callback<()> {
    let context = use_location();
    let UrlState { state, navigate } = use_url_state();
    let store = context.store.clone();

    Callback::from(move |_| {
        let Some(track_id) = state.track_id.as_deref() else {
            return;
        };
        match url_state::hide_exercise(&store.snapshot(), track_id) {
            HideExercise::Back => store.back(),
            HideExercise::Navigate(update) => navigate.emit(update),
        }
    })
}

/// Subscribes the component to one resource.
///
/// Cached and absent resources render immediately. Otherwise the fetch is
/// joined or started when the key changes, and the delivery is aborted when
/// the component unmounts or moves to another key; the fetch itself keeps
/// running for everybody else.
#[hook]
pub fn use_resource<K, T>(resource: Resource<K, T>) -> Remote<T>
where
    K: Eq + Hash + Clone + Debug + 'static,
    T: Clone + 'static,
{
    let peeked = resource.peek();
    let key = resource.key().clone();
    let delivered = use_state(|| None::<(K, Remote<T>)>);

    {
        let delivered = delivered.clone();
        use_effect_with(key.clone(), move |key| {
            let handle = if resource.peek().done() {
                None
            } else {
                let key = key.clone();
                resource.subscribe(move |remote| delivered.set(Some((key, remote))))
            };
            move || {
                if let Some(handle) = handle {
                    handle.abort();
                }
            }
        });
    }

    if peeked.done() {
        return peeked;
    }
    match &*delivered {
        Some((delivered_key, remote)) if *delivered_key == key => remote.clone(),
        _ => peeked,
    }
}

#[hook]
pub fn use_track_config(track_id: &str) -> Remote<Rc<TrackConfig>> {
    let remote = use_remote();
    use_resource(remote.track_config(track_id))
}

#[hook]
pub fn use_remote_version(track_id: &str, slug: &str) -> Remote<String> {
    let remote = use_remote();
    use_resource(remote.remote_version(track_id, slug))
}

#[hook]
pub fn use_canonical_version(slug: &str, branch: Branch) -> Remote<String> {
    let remote = use_remote();
    use_resource(remote.canonical_version(slug, branch))
}

#[hook]
pub fn use_canonical_list(branch: Branch) -> Remote<Rc<CanonicalList>> {
    let remote = use_remote();
    use_resource(remote.canonical_list(branch))
}

#[hook]
pub fn use_stub(track_id: &str, slug: &str) -> Remote<usize> {
    let remote = use_remote();
    use_resource(remote.stub(track_id, slug))
}

#[hook]
pub fn use_topics(branch: Branch) -> Remote<Rc<Vec<String>>> {
    let remote = use_remote();
    use_resource(remote.topics(branch))
}

#[hook]
pub fn use_file_exists(repository: &str, branch: Option<&str>, path: &str) -> Remote<bool> {
    let remote = use_remote();
    use_resource(remote.file_exists(repository, branch, path))
}

#[hook]
pub fn use_companion(track_id: &str, companion: Companion) -> Remote<bool> {
    let remote = use_remote();
    use_resource(remote.companion(track_id, companion))
}
