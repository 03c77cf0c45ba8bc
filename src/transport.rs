//! HTTP access behind a trait so the cache and fetchers stay host-agnostic.

use crate::error::FetchError;
use futures::future::{self, Either, LocalBoxFuture};
use futures::FutureExt;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx response into [`FetchError::Status`].
    pub fn error_for_status(self) -> Result<HttpResponse, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                url: self.url,
                status: self.status,
            })
        }
    }
}

/// Unauthenticated GET/HEAD requests.
///
/// `Err` is reserved for requests that never produced a response; any
/// HTTP status comes back as `Ok`.
pub trait Transport {
    fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<HttpResponse, FetchError>>;

    /// Like `get` but the body is always empty.
    fn head(&self, url: &str) -> LocalBoxFuture<'static, Result<HttpResponse, FetchError>>;
}

/// `window.fetch` with a per-request timeout.
pub struct BrowserTransport {
    timeout_ms: u32,
}

impl BrowserTransport {
    pub fn new(timeout_ms: u32) -> Self {
        Self { timeout_ms }
    }

    fn request(
        &self,
        url: &str,
        method: &'static str,
    ) -> LocalBoxFuture<'static, Result<HttpResponse, FetchError>> {
        let url = url.to_string();
        let timeout_ms = self.timeout_ms;

        async move {
            debug!("{} {}", method, url);
            let exchange = Box::pin(send(url.clone(), method));
            let timeout = Box::pin(gloo_timers::future::TimeoutFuture::new(timeout_ms));

            match future::select(exchange, timeout).await {
                Either::Left((result, _)) => result,
                Either::Right(_) => Err(FetchError::Timeout { url, timeout_ms }),
            }
        }
        .boxed_local()
    }
}

impl Transport for BrowserTransport {
    fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<HttpResponse, FetchError>> {
        self.request(url, "GET")
    }

    fn head(&self, url: &str) -> LocalBoxFuture<'static, Result<HttpResponse, FetchError>> {
        self.request(url, "HEAD")
    }
}

async fn send(url: String, method: &'static str) -> Result<HttpResponse, FetchError> {
    let network = |err: JsValue| FetchError::Network {
        url: url.clone(),
        message: err.as_string().unwrap_or_else(|| format!("{:?}", err)),
    };

    let init = web_sys::RequestInit::new();
    init.set_method(method);
    let request = web_sys::Request::new_with_str_and_init(&url, &init).map_err(network)?;

    let response: web_sys::Response = JsFuture::from(gloo_utils::window().fetch_with_request(&request))
        .await
        .map_err(network)?
        .dyn_into()
        .map_err(network)?;

    let body = if method == "HEAD" {
        String::new()
    } else {
        JsFuture::from(response.text().map_err(network)?)
            .await
            .map_err(network)?
            .as_string()
            .unwrap_or_default()
    };

    Ok(HttpResponse {
        url: response.url(),
        status: response.status(),
        body,
    })
}

#[derive(Debug, Clone)]
enum Route {
    Respond { status: u16, body: String },
    Fail(String),
}

/// Canned responses keyed by exact URL; unknown URLs answer 404.
///
/// Counts every request so callers can assert how often the network
/// would have been hit.
#[derive(Default)]
pub struct MemoryTransport {
    routes: RefCell<HashMap<String, Route>>,
    calls: RefCell<HashMap<String, usize>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) -> &Self {
        self.routes.borrow_mut().insert(
            url.to_string(),
            Route::Respond {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    pub fn ok(&self, url: &str, body: &str) -> &Self {
        self.respond(url, 200, body)
    }

    /// Requests to `url` fail before any response arrives.
    pub fn fail(&self, url: &str, message: &str) -> &Self {
        self.routes
            .borrow_mut()
            .insert(url.to_string(), Route::Fail(message.to_string()));
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.borrow().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().values().sum()
    }

    fn answer(&self, url: &str, with_body: bool) -> Result<HttpResponse, FetchError> {
        *self.calls.borrow_mut().entry(url.to_string()).or_insert(0) += 1;

        match self.routes.borrow().get(url).cloned() {
            Some(Route::Respond { status, body }) => Ok(HttpResponse {
                url: url.to_string(),
                status,
                body: if with_body { body } else { String::new() },
            }),
            Some(Route::Fail(message)) => Err(FetchError::Network {
                url: url.to_string(),
                message,
            }),
            None => Ok(HttpResponse {
                url: url.to_string(),
                status: 404,
                body: String::new(),
            }),
        }
    }
}

impl Transport for MemoryTransport {
    fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<HttpResponse, FetchError>> {
        future::ready(self.answer(url, true)).boxed_local()
    }

    fn head(&self, url: &str) -> LocalBoxFuture<'static, Result<HttpResponse, FetchError>> {
        future::ready(self.answer(url, false)).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn memory_transport_serves_routes_and_counts_calls() {
        let transport = MemoryTransport::new();
        transport
            .ok("https://example.test/a", "hello")
            .fail("https://example.test/b", "offline");

        let response = block_on(transport.get("https://example.test/a")).unwrap();
        assert!(response.is_success());
        assert_eq!(response.body, "hello");

        let head = block_on(transport.head("https://example.test/a")).unwrap();
        assert_eq!(head.body, "");

        let missing = block_on(transport.get("https://example.test/c")).unwrap();
        assert_eq!(
            missing.error_for_status(),
            Err(FetchError::Status {
                url: "https://example.test/c".into(),
                status: 404
            })
        );

        assert!(matches!(
            block_on(transport.get("https://example.test/b")),
            Err(FetchError::Network { .. })
        ));
        assert_eq!(transport.calls("https://example.test/a"), 2);
        assert_eq!(transport.total_calls(), 4);
    }
}
