//! Navigation service: the single path through which the location changes.
//!
//! [`LocationStore`] owns a [`HistoryBackend`] and turns every navigation,
//! whether requested by the application (`push`, `replace`, `back`,
//! `forward`) or by the host (the browser's back button), into exactly one
//! notification carrying a fresh [`Location`] snapshot. Nothing in the host
//! is patched: the backend only registers a pop listener, and dropping the
//! store removes it again.

use gloo_utils::format::JsValueSerdeExt;
use log::{debug, warn};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Immutable snapshot of the host location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub path: String,
    /// Opaque blob attached to the history entry
    pub state: Option<Value>,
}

impl Location {
    pub fn new(path: &str, state: Option<Value>) -> Self {
        Self {
            path: path.to_string(),
            state,
        }
    }
}

/// One history entry to write.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub href: String,
    pub title: String,
    pub state: Option<Value>,
}

/// Host navigation primitives.
///
/// `push` and `replace` take effect synchronously and do not report back.
/// `back` and `forward` may complete later; the backend reports them (and
/// any navigation the user performs) through the callback given to `watch`.
pub trait HistoryBackend {
    fn snapshot(&self) -> Location;
    fn push(&self, entry: &Entry);
    fn replace(&self, entry: &Entry);
    fn back(&self);
    fn forward(&self);
    /// Registers `on_pop`; calling the returned closure unregisters it.
    fn watch(&self, on_pop: Rc<dyn Fn()>) -> Box<dyn FnOnce()>;
}

type Listener = Rc<dyn Fn(&Location)>;

struct Shared {
    backend: Rc<dyn HistoryBackend>,
    snapshot: RefCell<Location>,
    listeners: RefCell<Vec<(usize, Listener)>>,
    next_id: Cell<usize>,
}

impl Shared {
    fn refresh(&self) {
        let location = self.backend.snapshot();
        debug!("Location changed to {}", location.path);
        *self.snapshot.borrow_mut() = location.clone();

        // Listeners may subscribe or unsubscribe while being notified
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&location);
        }
    }
}

pub struct LocationStore {
    shared: Rc<Shared>,
    teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl LocationStore {
    pub fn new(backend: Rc<dyn HistoryBackend>) -> Self {
        let shared = Rc::new(Shared {
            snapshot: RefCell::new(backend.snapshot()),
            backend: backend.clone(),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        });

        let weak: Weak<Shared> = Rc::downgrade(&shared);
        let teardown = backend.watch(Rc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.refresh();
            }
        }));

        Self {
            shared,
            teardown: RefCell::new(Some(teardown)),
        }
    }

    /// A store over the browser's `window.history`.
    pub fn browser() -> Self {
        Self::new(Rc::new(BrowserHistory))
    }

    pub fn snapshot(&self) -> Location {
        self.shared.snapshot.borrow().clone()
    }

    /// Calls `listener` after every navigation until the subscription drops.
    pub fn subscribe(&self, listener: impl Fn(&Location) + 'static) -> Subscription {
        let id = self.shared.next_id.get();
        self.shared.next_id.set(id + 1);
        self.shared
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        Subscription {
            shared: Rc::downgrade(&self.shared),
            id,
        }
    }

    pub fn push(&self, entry: &Entry) {
        self.shared.backend.push(entry);
        self.shared.refresh();
    }

    pub fn replace(&self, entry: &Entry) {
        self.shared.backend.replace(entry);
        self.shared.refresh();
    }

    /// Notification arrives once the backend reports the pop.
    pub fn back(&self) {
        self.shared.backend.back();
    }

    pub fn forward(&self) {
        self.shared.backend.forward();
    }
}

impl Drop for LocationStore {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.borrow_mut().take() {
            teardown();
        }
    }
}

/// Keeps a listener registered; dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    shared: Weak<Shared>,
    id: usize,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

/// In-memory history stack. Used by tests and anywhere without a browser.
pub struct MemoryHistory {
    entries: RefCell<Vec<(Location, String)>>,
    index: Cell<usize>,
    watchers: RefCell<Vec<(usize, Rc<dyn Fn()>)>>,
    next_id: Rc<Cell<usize>>,
}

impl MemoryHistory {
    pub fn new(initial_path: &str) -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(vec![(Location::new(initial_path, None), String::new())]),
            index: Cell::new(0),
            watchers: RefCell::new(Vec::new()),
            next_id: Rc::new(Cell::new(0)),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn title(&self) -> String {
        self.entries.borrow()[self.index.get()].1.clone()
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.borrow().len()
    }

    fn go(&self, delta: isize) {
        let target = self.index.get() as isize + delta;
        if target < 0 || target as usize >= self.len() {
            return;
        }
        self.index.set(target as usize);

        let watchers: Vec<Rc<dyn Fn()>> = self
            .watchers
            .borrow()
            .iter()
            .map(|(_, watcher)| watcher.clone())
            .collect();
        for watcher in watchers {
            watcher();
        }
    }
}

impl HistoryBackend for Rc<MemoryHistory> {
    fn snapshot(&self) -> Location {
        self.entries.borrow()[self.index.get()].0.clone()
    }

    fn push(&self, entry: &Entry) {
        let mut entries = self.entries.borrow_mut();
        entries.truncate(self.index.get() + 1);
        entries.push((Location::new(&entry.href, entry.state.clone()), entry.title.clone()));
        self.index.set(entries.len() - 1);
    }

    fn replace(&self, entry: &Entry) {
        self.entries.borrow_mut()[self.index.get()] =
            (Location::new(&entry.href, entry.state.clone()), entry.title.clone());
    }

    fn back(&self) {
        self.go(-1);
    }

    fn forward(&self) {
        self.go(1);
    }

    fn watch(&self, on_pop: Rc<dyn Fn()>) -> Box<dyn FnOnce()> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.watchers.borrow_mut().push((id, on_pop));

        let history = Rc::downgrade(self);
        Box::new(move || {
            if let Some(history) = history.upgrade() {
                history.watchers.borrow_mut().retain(|(watcher, _)| *watcher != id);
            }
        })
    }
}

/// `window.history` and the `popstate` event.
pub struct BrowserHistory;

impl BrowserHistory {
    fn write(&self, entry: &Entry, replace: bool) {
        let state = entry
            .state
            .as_ref()
            .and_then(|state| JsValue::from_serde(state).ok())
            .unwrap_or(JsValue::NULL);

        let history = gloo_utils::history();
        let result = if replace {
            history.replace_state_with_url(&state, &entry.title, Some(&entry.href))
        } else {
            history.push_state_with_url(&state, &entry.title, Some(&entry.href))
        };
        if let Err(err) = result {
            warn!("Could not write history entry {}: {:?}", entry.href, err);
        }

        gloo_utils::document().set_title(&entry.title);
    }
}

impl HistoryBackend for BrowserHistory {
    fn snapshot(&self) -> Location {
        let window = gloo_utils::window();
        let path = window
            .location()
            .pathname()
            .unwrap_or_else(|_| "/".to_string());
        let state = window
            .history()
            .and_then(|history| history.state())
            .ok()
            .filter(|state| !state.is_null() && !state.is_undefined())
            .and_then(|state| state.into_serde::<Value>().ok());

        Location { path, state }
    }

    fn push(&self, entry: &Entry) {
        self.write(entry, false);
    }

    fn replace(&self, entry: &Entry) {
        self.write(entry, true);
    }

    fn back(&self) {
        if let Err(err) = gloo_utils::history().back() {
            warn!("history.back() failed: {:?}", err);
        }
    }

    fn forward(&self) {
        if let Err(err) = gloo_utils::history().forward() {
            warn!("history.forward() failed: {:?}", err);
        }
    }

    fn watch(&self, on_pop: Rc<dyn Fn()>) -> Box<dyn FnOnce()> {
        let closure = Closure::<dyn Fn(web_sys::PopStateEvent)>::new(move |_| on_pop());
        let window = gloo_utils::window();
        if let Err(err) =
            window.add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref())
        {
            warn!("Could not listen for popstate: {:?}", err);
        }

        Box::new(move || {
            if let Err(err) = window
                .remove_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref())
            {
                warn!("Could not stop listening for popstate: {:?}", err);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(href: &str) -> Entry {
        Entry {
            href: href.to_string(),
            title: format!("title of {}", href),
            state: Some(serde_json::json!({ "href": href })),
        }
    }

    fn recording(store: &LocationStore) -> (Rc<RefCell<Vec<String>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let subscription = store.subscribe(move |location| sink.borrow_mut().push(location.path.clone()));
        (seen, subscription)
    }

    #[test]
    fn every_navigation_notifies_once() {
        let history = MemoryHistory::new("/");
        let store = LocationStore::new(Rc::new(history.clone()));
        let (seen, _subscription) = recording(&store);

        store.push(&entry("/ruby"));
        store.push(&entry("/ruby/master/topics"));
        store.back();
        store.forward();
        store.replace(&entry("/ruby/master/stubs"));

        assert_eq!(
            *seen.borrow(),
            vec!["/ruby", "/ruby/master/topics", "/ruby", "/ruby/master/topics", "/ruby/master/stubs"]
        );
        assert_eq!(store.snapshot().path, "/ruby/master/stubs");
        assert_eq!(history.title(), "title of /ruby/master/stubs");
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn back_past_the_first_entry_is_ignored() {
        let history = MemoryHistory::new("/");
        let store = LocationStore::new(Rc::new(history.clone()));
        let (seen, _subscription) = recording(&store);

        store.back();
        assert!(seen.borrow().is_empty());
        assert_eq!(store.snapshot(), Location::new("/", None));
    }

    #[test]
    fn push_after_back_drops_forward_entries() {
        let history = MemoryHistory::new("/");
        let store = LocationStore::new(Rc::new(history.clone()));

        store.push(&entry("/a"));
        store.push(&entry("/b"));
        store.back();
        store.push(&entry("/c"));
        store.forward();

        assert_eq!(store.snapshot().path, "/c");
        assert_eq!(history.len(), 3);
        assert_eq!(store.snapshot().state, Some(serde_json::json!({ "href": "/c" })));
    }

    #[test]
    fn dropped_subscriptions_stop_receiving() {
        let history = MemoryHistory::new("/");
        let store = LocationStore::new(Rc::new(history.clone()));
        let (seen, subscription) = recording(&store);

        store.push(&entry("/a"));
        subscription.unsubscribe();
        store.push(&entry("/b"));

        assert_eq!(*seen.borrow(), vec!["/a"]);
    }

    #[test]
    fn disposing_the_store_restores_the_backend() {
        let history = MemoryHistory::new("/");
        for _ in 0..3 {
            let store = LocationStore::new(Rc::new(history.clone()));
            assert_eq!(history.watcher_count(), 1);
            store.push(&entry("/a"));
            drop(store);
            assert_eq!(history.watcher_count(), 0);
        }
        // Host-driven navigation with no store alive notifies nobody
        history.back();
        assert_eq!(history.snapshot().path, "/a");
    }
}
