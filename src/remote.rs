//! The remote data service: one keyed cache per kind of document, plus the
//! URL building and parsing that turns each key into a request.
//!
//! A [`RemoteData`] is created once at start-up and shared by reference.
//! Every accessor returns a [`Resource`], a cheap description of one key
//! that can be peeked synchronously, awaited, or subscribed to.

use crate::cache::{BrowserSpawner, Remote, RemoteCache};
use crate::config::{Endpoints, MINIMUM_STUB_LENGTH, PROBE_DEFAULT_BRANCH, REQUEST_TIMEOUT_MS};
use crate::error::{FetchError, FetchResult};
use crate::parse::{self, CanonicalList, TrackConfig};
use crate::pattern;
use crate::tracks::{TrackData, TrackRegistry};
use crate::transport::{BrowserTransport, HttpResponse, Transport};
use crate::url_state::Branch;
use futures::future::{self, AbortHandle, LocalBoxFuture};
use futures::task::LocalSpawn;
use futures::FutureExt;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::Rc;

type Fetch<T> = Box<dyn FnOnce() -> LocalBoxFuture<'static, FetchResult<T>>>;

/// One key of one cache, ready to be resolved.
///
/// A resource without a fetch is structurally absent: it resolves to
/// [`Remote::absent`] immediately and never touches the network.
pub struct Resource<K, T> {
    cache: RemoteCache<K, T>,
    key: K,
    url: Option<String>,
    html_url: Option<String>,
    fetch: Option<Fetch<T>>,
}

impl<K, T> Resource<K, T>
where
    K: Eq + Hash + Clone + Debug + 'static,
    T: Clone + 'static,
{
    fn new<F>(cache: &RemoteCache<K, T>, key: K, url: String, fetch: F) -> Self
    where
        F: FnOnce() -> LocalBoxFuture<'static, FetchResult<T>> + 'static,
    {
        Self {
            cache: cache.clone(),
            key,
            url: Some(url),
            html_url: None,
            fetch: Some(Box::new(fetch)),
        }
    }

    fn absent(cache: &RemoteCache<K, T>, key: K) -> Self {
        Self {
            cache: cache.clone(),
            key,
            url: None,
            html_url: None,
            fetch: None,
        }
    }

    fn with_html_url(mut self, html_url: String) -> Self {
        self.html_url = Some(html_url);
        self
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Human-facing page for the requested file, when there is one.
    pub fn html_url(&self) -> Option<&str> {
        self.html_url.as_deref()
    }

    /// What is known right now, without scheduling any work.
    pub fn peek(&self) -> Remote<T> {
        if self.fetch.is_none() {
            return Remote::absent(None);
        }
        Remote {
            status: self.cache.status(&self.key),
            url: self.url.clone(),
        }
    }

    pub fn load(self) -> LocalBoxFuture<'static, Remote<T>> {
        let Resource {
            cache,
            key,
            url,
            fetch,
            ..
        } = self;
        match fetch {
            None => future::ready(Remote::absent(None)).boxed_local(),
            Some(fetch) => cache
                .load(key, fetch)
                .map(move |result| Remote::from_result(result, url))
                .boxed_local(),
        }
    }

    /// Hands the settled outcome to `deliver`; see [`RemoteCache::subscribe`].
    ///
    /// Absent and cached resources are delivered before this returns.
    pub fn subscribe<D>(self, deliver: D) -> Option<AbortHandle>
    where
        D: FnOnce(Remote<T>) + 'static,
    {
        let Resource {
            cache,
            key,
            url,
            fetch,
            ..
        } = self;
        match fetch {
            None => {
                deliver(Remote::absent(None));
                None
            }
            Some(fetch) => Some(cache.subscribe(key, fetch, move |result| {
                deliver(Remote::from_result(result, url))
            })),
        }
    }
}

/// Identity of a generic file probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeKey {
    pub repository: String,
    pub branch: String,
    pub path: String,
    /// Separates different checks against the same file
    pub discriminator: String,
}

/// Repositories that accompany a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Companion {
    TestRunner,
    Analyzer,
    Representer,
}

impl Companion {
    pub const ALL: [Companion; 3] = [
        Companion::TestRunner,
        Companion::Analyzer,
        Companion::Representer,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            Companion::TestRunner => "test-runner",
            Companion::Analyzer => "analyzer",
            Companion::Representer => "representer",
        }
    }

    pub fn repository(self, track_id: &str) -> String {
        format!("{}-{}", track_id, self.suffix())
    }
}

pub type VersionKey = (String, String);
pub type CanonicalVersionKey = (String, Branch);

async fn get_ok(transport: Rc<dyn Transport>, url: &str) -> Result<HttpResponse, FetchError> {
    transport.get(url).await?.error_for_status()
}

pub struct RemoteData {
    endpoints: Endpoints,
    transport: Rc<dyn Transport>,
    tracks: TrackRegistry,
    configs: RemoteCache<String, Rc<TrackConfig>>,
    versions: RemoteCache<VersionKey, String>,
    canonical_versions: RemoteCache<CanonicalVersionKey, String>,
    canonical_lists: RemoteCache<Branch, Rc<CanonicalList>>,
    stubs: RemoteCache<VersionKey, usize>,
    topics: RemoteCache<Branch, Rc<Vec<String>>>,
    probes: RemoteCache<ProbeKey, bool>,
}

impl fmt::Debug for RemoteData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteData")
            .field("endpoints", &self.endpoints)
            .field("tracks", &self.tracks.len())
            .finish_non_exhaustive()
    }
}

impl RemoteData {
    pub fn new(
        endpoints: Endpoints,
        transport: Rc<dyn Transport>,
        spawner: Rc<dyn LocalSpawn>,
        tracks: TrackRegistry,
    ) -> Self {
        Self {
            endpoints,
            transport,
            tracks,
            configs: RemoteCache::new("track config", spawner.clone()),
            versions: RemoteCache::new("remote version", spawner.clone()),
            canonical_versions: RemoteCache::new("canonical version", spawner.clone()),
            canonical_lists: RemoteCache::new("canonical list", spawner.clone()),
            stubs: RemoteCache::new("stub", spawner.clone()),
            topics: RemoteCache::new("topics", spawner.clone()),
            probes: RemoteCache::new("file probe", spawner),
        }
    }

    /// GitHub endpoints, `window.fetch` and the embedded track list.
    pub fn browser() -> Self {
        Self::new(
            Endpoints::default(),
            Rc::new(BrowserTransport::new(REQUEST_TIMEOUT_MS)),
            Rc::new(BrowserSpawner),
            TrackRegistry::builtin().clone(),
        )
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn tracks(&self) -> &TrackRegistry {
        &self.tracks
    }

    /// Static metadata for `track_id`; unknown tracks have no patterns.
    pub fn track_data(&self, track_id: &str) -> TrackData {
        self.tracks
            .get(track_id)
            .cloned()
            .unwrap_or_else(|| TrackData::bare(track_id, track_id))
    }

    pub fn track_config(&self, track_id: &str) -> Resource<String, Rc<TrackConfig>> {
        let url = self.endpoints.track_raw(track_id, "config.json");
        let transport = self.transport.clone();
        let request_url = url.clone();

        Resource::new(&self.configs, track_id.to_string(), url, move || {
            async move {
                let response = get_ok(transport, &request_url).await?;
                parse::track_config(&request_url, &response.body).map(|config| Some(Rc::new(config)))
            }
            .boxed_local()
        })
        .with_html_url(self.endpoints.blob(track_id, &self.endpoints.track_branch, "config.json"))
    }

    /// Version recorded by the track for one exercise.
    pub fn remote_version(&self, track_id: &str, slug: &str) -> Resource<VersionKey, String> {
        let key = (track_id.to_string(), slug.to_string());
        let Some(path) = pattern::version_path(&self.track_data(track_id), slug) else {
            return Resource::absent(&self.versions, key);
        };

        let url = self.endpoints.track_raw(track_id, &path);
        let transport = self.transport.clone();
        let request_url = url.clone();

        Resource::new(&self.versions, key, url, move || {
            async move {
                let response = get_ok(transport, &request_url).await?;
                parse::track_version(&request_url, &response.body).map(Some)
            }
            .boxed_local()
        })
        .with_html_url(self.endpoints.blob(track_id, &self.endpoints.track_branch, &path))
    }

    pub fn canonical_version(&self, slug: &str, branch: Branch) -> Resource<CanonicalVersionKey, String> {
        let path = format!("exercises/{}/canonical-data.json", slug);
        let url = self.endpoints.spec_raw(branch.problem_spec_ref(), &path);
        let transport = self.transport.clone();
        let request_url = url.clone();

        Resource::new(&self.canonical_versions, (slug.to_string(), branch), url, move || {
            async move {
                match get_ok(transport, &request_url).await {
                    Ok(response) => Ok(parse::canonical_version(&request_url, &response.body)),
                    Err(err) if err.is_not_found() => Ok(None),
                    Err(err) => Err(err),
                }
            }
            .boxed_local()
        })
        .with_html_url(self.endpoints.blob(
            &self.endpoints.problem_specifications,
            branch.problem_spec_ref(),
            &path,
        ))
    }

    /// Every canonical exercise, read in two steps: the root listing
    /// points at the recursive tree of `exercises/`.
    pub fn canonical_list(&self, branch: Branch) -> Resource<Branch, Rc<CanonicalList>> {
        let url = self.endpoints.spec_contents(branch.problem_spec_ref());
        let transport = self.transport.clone();
        let request_url = url.clone();

        Resource::new(&self.canonical_lists, branch, url, move || {
            async move {
                let listing = get_ok(transport.clone(), &request_url).await?;
                let tree_url = parse::exercises_tree_url(&request_url, &listing.body)?;
                let tree = get_ok(transport, &tree_url).await?;
                parse::canonical_list(&tree_url, &tree.body).map(|list| Some(Rc::new(list)))
            }
            .boxed_local()
        })
    }

    /// Length of the exercise's stub; too short counts as no stub.
    pub fn stub(&self, track_id: &str, slug: &str) -> Resource<VersionKey, usize> {
        let key = (track_id.to_string(), slug.to_string());
        let Some(path) = pattern::stub_path(&self.track_data(track_id), slug) else {
            return Resource::absent(&self.stubs, key);
        };

        let url = self.endpoints.track_raw(track_id, &path);
        let transport = self.transport.clone();
        let request_url = url.clone();

        Resource::new(&self.stubs, key, url, move || {
            async move {
                let response = get_ok(transport, &request_url).await?;
                let length = response.body.chars().count();
                Ok((length >= MINIMUM_STUB_LENGTH).then_some(length))
            }
            .boxed_local()
        })
        .with_html_url(self.endpoints.blob(track_id, &self.endpoints.track_branch, &path))
    }

    pub fn topics(&self, branch: Branch) -> Resource<Branch, Rc<Vec<String>>> {
        let url = self.endpoints.spec_raw(branch.problem_spec_ref(), "TOPICS.txt");
        let transport = self.transport.clone();
        let request_url = url.clone();

        Resource::new(&self.topics, branch, url, move || {
            async move {
                let response = get_ok(transport, &request_url).await?;
                Ok(Some(Rc::new(parse::topics(&response.body))))
            }
            .boxed_local()
        })
        .with_html_url(self.endpoints.blob(
            &self.endpoints.problem_specifications,
            branch.problem_spec_ref(),
            "TOPICS.txt",
        ))
    }

    fn probe_key(&self, repository: &str, branch: Option<&str>, path: &str, discriminator: &str) -> ProbeKey {
        ProbeKey {
            repository: repository.to_string(),
            branch: branch.unwrap_or(PROBE_DEFAULT_BRANCH).to_string(),
            path: path.to_string(),
            discriminator: discriminator.to_string(),
        }
    }

    /// HEAD probe; a request that never gets a response counts as missing.
    pub fn file_exists(&self, repository: &str, branch: Option<&str>, path: &str) -> Resource<ProbeKey, bool> {
        let key = self.probe_key(repository, branch, path, "exists");
        let url = self.endpoints.raw(&key.repository, &key.branch, &key.path);
        let html_url = self.endpoints.blob(&key.repository, &key.branch, &key.path);
        let transport = self.transport.clone();
        let request_url = url.clone();

        Resource::new(&self.probes, key, url, move || {
            async move {
                match transport.head(&request_url).await {
                    Ok(response) => Ok(Some(response.is_success())),
                    Err(err) => {
                        log::debug!("treating {} as missing: {}", request_url, err);
                        Ok(Some(false))
                    }
                }
            }
            .boxed_local()
        })
        .with_html_url(html_url)
    }

    /// GET probe testing the file body with `predicate`.
    ///
    /// `discriminator` must uniquely name the predicate, since the outcome
    /// is cached under it.
    pub fn file_matches<P>(
        &self,
        repository: &str,
        branch: Option<&str>,
        path: &str,
        discriminator: &str,
        predicate: P,
    ) -> Resource<ProbeKey, bool>
    where
        P: FnOnce(&str) -> bool + 'static,
    {
        let key = self.probe_key(repository, branch, path, &format!("~{}", discriminator));
        let url = self.endpoints.raw(&key.repository, &key.branch, &key.path);
        let html_url = self.endpoints.blob(&key.repository, &key.branch, &key.path);
        let transport = self.transport.clone();
        let request_url = url.clone();

        Resource::new(&self.probes, key, url, move || {
            async move {
                let response = get_ok(transport, &request_url).await?;
                Ok(Some(predicate(&response.body)))
            }
            .boxed_local()
        })
        .with_html_url(html_url)
    }

    pub fn file_does_not_contain(
        &self,
        repository: &str,
        branch: Option<&str>,
        path: &str,
        refute: &str,
    ) -> Resource<ProbeKey, bool> {
        let needle = refute.to_string();
        self.file_matches(repository, branch, path, &format!("!{}", refute), move |body| {
            !body.contains(&needle)
        })
    }

    /// Whether the companion repository ships a `Dockerfile`.
    pub fn companion(&self, track_id: &str, companion: Companion) -> Resource<ProbeKey, bool> {
        self.file_exists(&companion.repository(track_id), None, "Dockerfile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Status;
    use crate::transport::MemoryTransport;
    use futures::executor::LocalPool;

    const TRACKS: &str = r#"[
        { "slug": "demo", "name": "Demo" },
        {
            "slug": "ruby", "name": "Ruby",
            "versioning": "exercises/{slug}/.meta/.version",
            "stub_file": "exercises/{slug}/{slug_}.rb"
        }
    ]"#;

    fn endpoints() -> Endpoints {
        Endpoints {
            raw_base: "https://raw.test".into(),
            api_base: "https://api.test".into(),
            html_base: "https://html.test".into(),
            ..Endpoints::default()
        }
    }

    fn service(pool: &LocalPool, transport: &Rc<MemoryTransport>) -> RemoteData {
        RemoteData::new(
            endpoints(),
            transport.clone(),
            Rc::new(pool.spawner()),
            TrackRegistry::from_json(TRACKS).unwrap(),
        )
    }

    #[test]
    fn missing_versioning_pattern_is_absent_without_a_request() {
        let pool = LocalPool::new();
        let transport = Rc::new(MemoryTransport::new());
        let remote = service(&pool, &transport);

        let version = remote.remote_version("demo", "two-fer");
        assert_eq!(version.url(), None);
        assert_eq!(version.peek(), Remote::absent(None));
        assert_eq!(transport.total_calls(), 0);
    }

    #[test]
    fn remote_version_substitutes_the_slug() {
        let mut pool = LocalPool::new();
        let transport = Rc::new(MemoryTransport::new());
        let url = "https://raw.test/exercism/ruby/main/exercises/two-fer/.meta/.version";
        transport.ok(url, "1.2.0\n");
        let remote = service(&pool, &transport);

        let resource = remote.remote_version("ruby", "two-fer");
        assert_eq!(
            resource.html_url(),
            Some("https://html.test/exercism/ruby/blob/main/exercises/two-fer/.meta/.version")
        );
        let version = pool.run_until(resource.load());
        assert_eq!(version.value().map(String::as_str), Some("1.2.0"));
        assert_eq!(version.url.as_deref(), Some(url));
    }

    #[test]
    fn canonical_version_404_is_absent_but_500_fails() {
        let mut pool = LocalPool::new();
        let transport = Rc::new(MemoryTransport::new());
        transport.respond(
            "https://raw.test/exercism/problem-specifications/trackanatomy/exercises/leap/canonical-data.json",
            500,
            "",
        );
        let remote = service(&pool, &transport);

        let missing = pool.run_until(remote.canonical_version("leap", Branch::Master).load());
        assert_eq!(missing.status, Status::Absent);

        let failed = pool.run_until(remote.canonical_version("leap", Branch::TrackAnatomy).load());
        assert!(failed.is_failed());
    }

    #[test]
    fn canonical_list_follows_the_tree_url() {
        let mut pool = LocalPool::new();
        let transport = Rc::new(MemoryTransport::new());
        transport
            .ok(
                "https://api.test/repos/exercism/problem-specifications/contents?ref=master",
                r#"[{ "path": "exercises", "git_url": "https://api.test/trees/abc" }]"#,
            )
            .ok(
                "https://api.test/trees/abc?recursive=1",
                r#"{ "tree": [{ "path": "leap" }, { "path": "two-fer/description.md" }] }"#,
            );
        let remote = service(&pool, &transport);

        let list = pool.run_until(remote.canonical_list(Branch::Master).load());
        let list = list.value().unwrap();
        assert_eq!(list.slugs().collect::<Vec<_>>(), vec!["leap", "two-fer"]);
        assert!(list.get("two-fer").unwrap().description);
    }

    #[test]
    fn short_stubs_are_absent() {
        let mut pool = LocalPool::new();
        let transport = Rc::new(MemoryTransport::new());
        transport
            .ok("https://raw.test/exercism/ruby/main/exercises/two-fer/two_fer.rb", "class TwoFer\nend\n")
            .ok("https://raw.test/exercism/ruby/main/exercises/rna-transcription/rna_transcription.rb", "");
        let remote = service(&pool, &transport);

        let stub = pool.run_until(remote.stub("ruby", "two-fer").load());
        assert_eq!(stub.value(), Some(&17));

        let empty = pool.run_until(remote.stub("ruby", "rna-transcription").load());
        assert_eq!(empty.status, Status::Absent);
    }

    #[test]
    fn probes_map_network_errors_to_missing() {
        let mut pool = LocalPool::new();
        let transport = Rc::new(MemoryTransport::new());
        transport
            .ok("https://raw.test/exercism/ruby-analyzer/master/Dockerfile", "FROM ruby")
            .fail("https://raw.test/exercism/ruby-representer/master/Dockerfile", "offline");
        let remote = service(&pool, &transport);

        let analyzer = pool.run_until(remote.companion("ruby", Companion::Analyzer).load());
        let representer = pool.run_until(remote.companion("ruby", Companion::Representer).load());
        let test_runner = pool.run_until(remote.companion("ruby", Companion::TestRunner).load());

        assert_eq!(analyzer.value(), Some(&true));
        assert_eq!(representer.value(), Some(&false));
        assert_eq!(test_runner.value(), Some(&false));
    }

    #[test]
    fn content_probes_are_cached_per_predicate() {
        let mut pool = LocalPool::new();
        let transport = Rc::new(MemoryTransport::new());
        let url = "https://raw.test/exercism/ruby/main/README.md";
        transport.ok(url, "Ruby track\nTODO: write docs\n");
        let remote = service(&pool, &transport);

        let no_todo = pool.run_until(remote.file_does_not_contain("ruby", Some("main"), "README.md", "TODO").load());
        let no_fixme = pool.run_until(remote.file_does_not_contain("ruby", Some("main"), "README.md", "FIXME").load());
        let again = pool.run_until(remote.file_does_not_contain("ruby", Some("main"), "README.md", "TODO").load());

        assert_eq!(no_todo.value(), Some(&false));
        assert_eq!(no_fixme.value(), Some(&true));
        assert_eq!(again.value(), Some(&false));
        assert_eq!(transport.calls(url), 2);
    }

    #[test]
    fn malformed_config_fails_and_is_retried() {
        let mut pool = LocalPool::new();
        let transport = Rc::new(MemoryTransport::new());
        let url = "https://raw.test/exercism/ruby/main/config.json";
        transport.ok(url, "{ nope");
        let remote = service(&pool, &transport);

        let failed = pool.run_until(remote.track_config("ruby").load());
        assert!(matches!(failed.error(), Some(FetchError::Parse { .. })));

        transport.ok(url, r#"{ "language": "Ruby", "exercises": [] }"#);
        let config = pool.run_until(remote.track_config("ruby").load());
        assert_eq!(config.value().unwrap().language, "Ruby");
        assert_eq!(transport.calls(url), 2);
    }
}
