//! Track maintenance dashboard.
//!
//! The core is platform-free: a keyed remote cache with per-key
//! de-duplication ([`cache`]), a bidirectional codec between the browser
//! path and the dashboard state ([`url_state`]), a navigation service
//! ([`location`]) and the specialised fetchers built on the cache
//! ([`remote`]). [`hooks`] and [`components`] bind them to Yew.

pub mod cache;
pub mod components;
pub mod config;
pub mod derived;
pub mod error;
pub mod hooks;
pub mod location;
pub mod parse;
pub mod pattern;
pub mod remote;
pub mod tracks;
pub mod transport;
pub mod url_state;
pub mod utils;

pub use cache::{Remote, RemoteCache, Status};
pub use error::{FetchError, FetchResult};
pub use location::{Location, LocationStore};
pub use remote::{RemoteData, Resource};
pub use url_state::{AppState, Branch, StateUpdate, View};
