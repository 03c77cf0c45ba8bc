//! Process-wide cache for remote data.
//!
//! One [`RemoteCache`] exists per kind of resource and is shared, by
//! reference, with every consumer for the lifetime of the page. For each key
//! it guarantees:
//!
//! - a cached value is returned synchronously, without scheduling work;
//! - at most one fetch is in flight, and every concurrent caller joins it;
//! - a success (including a structural absence) is stored forever;
//! - a failure is handed to the callers waiting at that moment and then
//!   forgotten, so the next request tries the network again.
//!
//! The in-flight fetch runs on its own task. A consumer that goes away only
//! stops listening; the request still completes and fills the cache for
//! everybody else.

use crate::error::{FetchError, FetchResult};
use futures::future::{self, AbortHandle, Abortable, LocalBoxFuture, Shared};
use futures::task::{LocalFutureObj, LocalSpawn, LocalSpawnExt, SpawnError};
use futures::FutureExt;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// Where a request for one key stands, from a consumer's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum Status<T> {
    Loading,
    /// Finished, and there is structurally nothing to show
    Absent,
    /// Finished with an error; not cached
    Failed(FetchError),
    Resolved(T),
}

/// A [`Status`] together with the URL it was (or would be) fetched from.
#[derive(Debug, Clone, PartialEq)]
pub struct Remote<T> {
    pub status: Status<T>,
    pub url: Option<String>,
}

impl<T> Remote<T> {
    pub fn loading(url: Option<String>) -> Self {
        Self {
            status: Status::Loading,
            url,
        }
    }

    pub fn absent(url: Option<String>) -> Self {
        Self {
            status: Status::Absent,
            url,
        }
    }

    pub fn from_result(result: FetchResult<T>, url: Option<String>) -> Self {
        let status = match result {
            Ok(Some(value)) => Status::Resolved(value),
            Ok(None) => Status::Absent,
            Err(err) => Status::Failed(err),
        };
        Self { status, url }
    }

    pub fn done(&self) -> bool {
        !matches!(self.status, Status::Loading)
    }

    pub fn value(&self) -> Option<&T> {
        match &self.status {
            Status::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.status {
            Status::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error().is_some()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Remote<U> {
        let status = match self.status {
            Status::Loading => Status::Loading,
            Status::Absent => Status::Absent,
            Status::Failed(err) => Status::Failed(err),
            Status::Resolved(value) => Status::Resolved(f(value)),
        };
        Remote {
            status,
            url: self.url,
        }
    }
}

type Flight<T> = Shared<LocalBoxFuture<'static, FetchResult<T>>>;

struct Inner<K, T> {
    resolved: HashMap<K, Option<T>>,
    in_flight: HashMap<K, Flight<T>>,
    /// Consecutive failures per key, cleared on success
    failures: HashMap<K, u32>,
    fetches: usize,
}

pub struct RemoteCache<K, T> {
    name: &'static str,
    inner: Rc<RefCell<Inner<K, T>>>,
    spawner: Rc<dyn LocalSpawn>,
}

impl<K, T> Clone for RemoteCache<K, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: self.inner.clone(),
            spawner: self.spawner.clone(),
        }
    }
}

impl<K, T> RemoteCache<K, T>
where
    K: Eq + Hash + Clone + Debug + 'static,
    T: Clone + 'static,
{
    pub fn new(name: &'static str, spawner: Rc<dyn LocalSpawn>) -> Self {
        Self {
            name,
            inner: Rc::new(RefCell::new(Inner {
                resolved: HashMap::new(),
                in_flight: HashMap::new(),
                failures: HashMap::new(),
                fetches: 0,
            })),
            spawner,
        }
    }

    /// The stored outcome for `key`: `Some(None)` is a cached absence.
    pub fn cached(&self, key: &K) -> Option<Option<T>> {
        self.inner.borrow().resolved.get(key).cloned()
    }

    /// `Loading` unless the key has been settled successfully.
    pub fn status(&self, key: &K) -> Status<T> {
        match self.cached(key) {
            Some(Some(value)) => Status::Resolved(value),
            Some(None) => Status::Absent,
            None => Status::Loading,
        }
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.inner.borrow().in_flight.contains_key(key)
    }

    pub fn failures(&self, key: &K) -> u32 {
        self.inner.borrow().failures.get(key).copied().unwrap_or(0)
    }

    /// Number of fetches started so far.
    pub fn fetches(&self) -> usize {
        self.inner.borrow().fetches
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves `key`, calling `fetch` only when the key is neither cached
    /// nor already being fetched.
    ///
    /// Registration happens before this returns, so callers that ask for the
    /// same key before the returned future is first polled still share one
    /// fetch.
    pub fn load<F>(&self, key: K, fetch: F) -> LocalBoxFuture<'static, FetchResult<T>>
    where
        F: FnOnce() -> LocalBoxFuture<'static, FetchResult<T>>,
    {
        if let Some(value) = self.cached(&key) {
            debug!("{}: cache hit for {:?}", self.name, key);
            return future::ready(Ok(value)).boxed_local();
        }

        if let Some(flight) = self.inner.borrow().in_flight.get(&key) {
            debug!("{}: joining in-flight fetch for {:?}", self.name, key);
            return flight.clone().boxed_local();
        }

        let failures = self.failures(&key);
        if failures > 0 {
            info!(
                "{}: retrying {:?} after {} failed attempt(s)",
                self.name, key, failures
            );
        }

        let cache = self.clone();
        let settle_key = key.clone();
        let request = fetch();
        let flight: Flight<T> = async move {
            let result = request.await;
            cache.settle(&settle_key, &result);
            result
        }
        .boxed_local()
        .shared();

        {
            let mut inner = self.inner.borrow_mut();
            inner.fetches += 1;
            inner.in_flight.insert(key.clone(), flight.clone());
        }

        // Drive the fetch independently of whoever is waiting on it
        if let Err(err) = self.spawner.spawn_local(flight.clone().map(|_| ())) {
            warn!(
                "{}: could not spawn fetch for {:?} ({}); waiters will drive it",
                self.name, key, err
            );
        }

        flight.boxed_local()
    }

    /// Loads `key` and hands the outcome to `deliver` unless the returned
    /// handle is aborted first. Aborting never cancels the fetch itself.
    ///
    /// A cached key is delivered before this returns.
    pub fn subscribe<F, D>(&self, key: K, fetch: F, deliver: D) -> AbortHandle
    where
        F: FnOnce() -> LocalBoxFuture<'static, FetchResult<T>>,
        D: FnOnce(FetchResult<T>) + 'static,
    {
        let (handle, registration) = AbortHandle::new_pair();

        if let Some(value) = self.cached(&key) {
            deliver(Ok(value));
            return handle;
        }

        let result = self.load(key.clone(), fetch);
        let delivery = Abortable::new(result.map(deliver), registration).map(|_| ());
        if let Err(err) = self.spawner.spawn_local(delivery) {
            warn!("{}: could not deliver {:?}: {}", self.name, key, err);
        }
        handle
    }

    fn settle(&self, key: &K, result: &FetchResult<T>) {
        let mut inner = self.inner.borrow_mut();
        inner.in_flight.remove(key);

        match result {
            Ok(value) => {
                info!(
                    "{}: resolved {:?}{}",
                    self.name,
                    key,
                    if value.is_some() { "" } else { " (absent)" }
                );
                inner.failures.remove(key);
                inner.resolved.insert(key.clone(), value.clone());
            }
            Err(err) => {
                warn!("{}: fetch for {:?} failed: {}", self.name, key, err);
                *inner.failures.entry(key.clone()).or_insert(0) += 1;
            }
        }
    }
}

/// Runs tasks on the browser's microtask queue.
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use std::cell::Cell;

    fn cache(pool: &LocalPool) -> RemoteCache<&'static str, String> {
        RemoteCache::new("test", Rc::new(pool.spawner()))
    }

    /// A fetch whose completion the test controls, counting invocations.
    fn gated(
        calls: &Rc<Cell<usize>>,
    ) -> (
        impl FnOnce() -> LocalBoxFuture<'static, FetchResult<String>>,
        oneshot::Sender<FetchResult<String>>,
    ) {
        let (sender, receiver) = oneshot::channel();
        let calls = calls.clone();
        let fetch = move || {
            calls.set(calls.get() + 1);
            receiver
                .map(|result| result.unwrap_or_else(|_| Ok(None)))
                .boxed_local()
        };
        (fetch, sender)
    }

    fn immediate(
        calls: &Rc<Cell<usize>>,
        result: FetchResult<String>,
    ) -> impl FnOnce() -> LocalBoxFuture<'static, FetchResult<String>> {
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            future::ready(result).boxed_local()
        }
    }

    fn offline() -> FetchError {
        FetchError::Network {
            url: "https://example.test".into(),
            message: "offline".into(),
        }
    }

    #[test]
    fn concurrent_requests_share_one_fetch() {
        let mut pool = LocalPool::new();
        let cache = cache(&pool);
        let calls = Rc::new(Cell::new(0));

        let (first_fetch, sender) = gated(&calls);
        let mut waiters = vec![cache.load("leap", first_fetch)];
        for _ in 0..4 {
            let (fetch, _unused) = gated(&calls);
            waiters.push(cache.load("leap", fetch));
        }
        assert!(cache.is_in_flight(&"leap"));

        sender.send(Ok(Some("1.2.0".into()))).unwrap();
        let results = pool.run_until(future::join_all(waiters));

        assert_eq!(calls.get(), 1);
        assert!(results.iter().all(|r| r == &Ok(Some("1.2.0".to_string()))));
        assert!(!cache.is_in_flight(&"leap"));
        assert_eq!(cache.fetches(), 1);
    }

    #[test]
    fn resolved_keys_are_served_without_fetching() {
        let mut pool = LocalPool::new();
        let cache = cache(&pool);
        let calls = Rc::new(Cell::new(0));

        let first = pool.run_until(cache.load("leap", immediate(&calls, Ok(Some("1.0.0".into())))));
        assert_eq!(first, Ok(Some("1.0.0".into())));

        let again = pool.run_until(cache.load("leap", immediate(&calls, Ok(Some("9.9.9".into())))));
        assert_eq!(again, Ok(Some("1.0.0".into())));
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.status(&"leap"), Status::Resolved("1.0.0".into()));
    }

    #[test]
    fn absence_is_cached_like_a_value() {
        let mut pool = LocalPool::new();
        let cache = cache(&pool);
        let calls = Rc::new(Cell::new(0));

        pool.run_until(cache.load("leap", immediate(&calls, Ok(None)))).unwrap();
        pool.run_until(cache.load("leap", immediate(&calls, Ok(None)))).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.status(&"leap"), Status::Absent);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut pool = LocalPool::new();
        let cache = cache(&pool);
        let calls = Rc::new(Cell::new(0));

        let failed = pool.run_until(cache.load("leap", immediate(&calls, Err(offline()))));
        assert_eq!(failed, Err(offline()));
        assert_eq!(cache.status(&"leap"), Status::Loading);
        assert_eq!(cache.failures(&"leap"), 1);

        let retried = pool.run_until(cache.load("leap", immediate(&calls, Ok(Some("2.0.0".into())))));
        assert_eq!(retried, Ok(Some("2.0.0".into())));
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.failures(&"leap"), 0);
    }

    #[test]
    fn aborted_subscribers_still_fill_the_cache() {
        let mut pool = LocalPool::new();
        let cache = cache(&pool);
        let calls = Rc::new(Cell::new(0));
        let delivered = Rc::new(Cell::new(false));

        let (fetch, sender) = gated(&calls);
        let flag = delivered.clone();
        let handle = cache.subscribe("leap", fetch, move |_| flag.set(true));
        pool.run_until_stalled();

        handle.abort();
        sender.send(Ok(Some("1.5.0".into()))).unwrap();
        pool.run_until_stalled();

        assert!(!delivered.get());
        assert_eq!(cache.status(&"leap"), Status::Resolved("1.5.0".into()));
    }

    #[test]
    fn subscribe_delivers_cached_values_synchronously() {
        let mut pool = LocalPool::new();
        let cache = cache(&pool);
        let calls = Rc::new(Cell::new(0));
        pool.run_until(cache.load("leap", immediate(&calls, Ok(Some("1.0.0".into())))))
            .unwrap();

        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        let _handle = cache.subscribe("leap", immediate(&calls, Ok(None)), move |result| {
            *sink.borrow_mut() = Some(result)
        });

        assert_eq!(*seen.borrow(), Some(Ok(Some("1.0.0".to_string()))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn remote_reports_done_and_value() {
        let loading: Remote<u32> = Remote::loading(None);
        assert!(!loading.done());

        let absent: Remote<u32> = Remote::from_result(Ok(None), Some("u".into()));
        assert!(absent.done());
        assert_eq!(absent.value(), None);
        assert!(!absent.is_failed());

        let failed: Remote<u32> = Remote::from_result(Err(offline()), None);
        assert!(failed.done() && failed.is_failed());

        let resolved = Remote::from_result(Ok(Some(3u32)), None).map(|n| n * 2);
        assert_eq!(resolved.value(), Some(&6));
    }
}
