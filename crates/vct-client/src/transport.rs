//! # HTTP Transport
//!
//! The client never talks to reqwest directly. It hands an [`HttpRequest`] to
//! an injected [`HttpTransport`] and interprets the [`HttpResponse`], which
//! keeps request construction testable without a network.
//!
//! Two implementations ship with the crate:
//!
//! - [`ReqwestTransport`]: a plain reqwest client with the platform TLS roots.
//! - [`TlsTransport`]: trusts exactly the pool served by a shared
//!   [`TrustStore`], rebuilding its reqwest client only when the store hands
//!   out a new pool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use rustls::RootCertStore;
use url::Url;
use vct_tls::TrustStore;

use crate::error::TransportError;

/// An outgoing request, fully resolved.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: Url,
    /// Request headers, bearer token included.
    pub headers: HeaderMap,
    /// Raw body, `None` for requests without one.
    pub body: Option<Vec<u8>>,
}

/// A complete response with its body read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// The whole response body.
    pub body: Vec<u8>,
}

/// Sends one request and returns one response. No retries.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and read the full response. Non-2xx statuses are
    /// responses, not errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by a single reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        execute(&self.http, request).await
    }
}

/// Transport whose trusted roots come from a [`TrustStore`].
pub struct TlsTransport {
    store: Arc<TrustStore>,
    timeout: Duration,
    cached: Mutex<Option<(Arc<RootCertStore>, reqwest::Client)>>,
}

impl std::fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsTransport")
            .field("store", &self.store)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TlsTransport {
    /// Build a transport over `store`. The reqwest client is built lazily on
    /// the first request.
    pub fn new(store: Arc<TrustStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            cached: Mutex::new(None),
        }
    }

    /// The shared store this transport trusts.
    pub fn store(&self) -> &Arc<TrustStore> {
        &self.store
    }

    fn client(&self) -> Result<reqwest::Client, TransportError> {
        let pool = self.store.get()?;

        let mut cached = self.cached.lock();
        if let Some((current, http)) = cached.as_ref() {
            if Arc::ptr_eq(current, &pool) {
                return Ok(http.clone());
            }
        }

        let http = build_client(Arc::clone(&pool), self.timeout)?;
        tracing::debug!(roots = pool.len(), "rebuilt TLS client");
        *cached = Some((pool, http.clone()));
        Ok(http)
    }
}

#[async_trait]
impl HttpTransport for TlsTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let http = self.client()?;
        execute(&http, request).await
    }
}

fn build_client(
    roots: Arc<RootCertStore>,
    timeout: Duration,
) -> Result<reqwest::Client, TransportError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let tls = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Other(format!("TLS configuration: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(reqwest::Client::builder()
        .use_preconfigured_tls(tls)
        .timeout(timeout)
        .build()?)
}

async fn execute(
    http: &reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, TransportError> {
    let mut builder = http
        .request(request.method, request.url)
        .headers(request.headers);
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let resp = builder.send().await?;
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.bytes().await?.to_vec();
    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}
