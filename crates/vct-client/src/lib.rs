//! # vct-client -- Typed async client for credential transparency logs
//!
//! One method per log operation. Each builds a request, sends it through the
//! injected [`HttpTransport`], and decodes the JSON answer:
//!
//! | Method | Path | Query |
//! |--------|------|-------|
//! | POST | `/v1/add-vc` | body = raw credential |
//! | GET  | `/healthcheck` | |
//! | GET  | `/v1/get-issuers` | |
//! | GET  | `/.well-known/webfinger` | |
//! | GET  | `/v1/get-sth` | |
//! | GET  | `/v1/get-sth-consistency` | `first`, `second` |
//! | GET  | `/v1/get-proof-by-hash` | `hash`, `tree_size` |
//! | GET  | `/v1/get-entries` | `start`, `end` |
//! | GET  | `/v1/get-entry-and-proof` | `leaf_index`, `tree_size` |
//!
//! Paths are appended to the configured endpoint, so an endpoint with a
//! path prefix (`https://vct.example/maple2020`) keeps it.
//!
//! ## Authentication
//!
//! The write token goes on `add-vc`, the read token on everything else, both
//! as `Authorization: Bearer`. Tokens are never logged.
//!
//! ## Errors
//!
//! A non-2xx answer with a `{"message": ...}` body fails with
//! [`ClientError::Server`], displayed as `"<operation>: <message>"`. There
//! are no retries.

pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, TransportError};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TlsTransport};
pub use types::{
    AddVcResponse, GetEntriesResponse, GetEntryAndProofResponse, GetProofByHashResponse,
    GetSthConsistencyResponse, GetSthResponse, LeafEntry, WebFingerLink, WebFingerResponse,
};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;
use vct_tls::TrustStore;

use crate::types::ErrorResponse;

const ADD_VC: &str = "add VC";
const HEALTH_CHECK: &str = "health check";
const GET_ISSUERS: &str = "get issuers";
const WEBFINGER: &str = "webfinger";
const GET_STH: &str = "get STH";
const GET_STH_CONSISTENCY: &str = "get STH consistency";
const GET_PROOF_BY_HASH: &str = "get proof by hash";
const GET_ENTRIES: &str = "get entries";
const GET_ENTRY_AND_PROOF: &str = "get entry and proof";

#[derive(Clone, Copy)]
enum Token {
    Read,
    Write,
}

/// Client for one transparency log.
///
/// Cheap to clone; clones share the transport and configuration.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client using a plain reqwest transport.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))
            .map_err(|source| ClientError::Transport {
                operation: "client init",
                source,
            })?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client that trusts the roots held by `store`.
    pub fn with_trust_store(config: ClientConfig, store: Arc<TrustStore>) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self::with_transport(config, Arc::new(TlsTransport::new(store, timeout)))
    }

    /// Create a client over any transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submit a credential to the log.
    ///
    /// `credential` is sent as-is; the log canonicalizes it. Check the
    /// returned signature with `vct_crypto::verify_vc_timestamp_signature`.
    pub async fn add_vc(&self, credential: &[u8]) -> Result<AddVcResponse, ClientError> {
        let body = self
            .call(
                ADD_VC,
                Method::POST,
                "/v1/add-vc",
                &[],
                Some(credential.to_vec()),
                Token::Write,
            )
            .await?;
        decode(ADD_VC, &body)
    }

    /// Succeeds on any 2xx answer from `/healthcheck`.
    pub async fn health_check(&self) -> Result<(), ClientError> {
        self.call(HEALTH_CHECK, Method::GET, "/healthcheck", &[], None, Token::Read)
            .await
            .map(|_| ())
    }

    /// Issuers the log accepts credentials from.
    pub async fn get_issuers(&self) -> Result<Vec<String>, ClientError> {
        let body = self
            .call(GET_ISSUERS, Method::GET, "/v1/get-issuers", &[], None, Token::Read)
            .await?;
        decode(GET_ISSUERS, &body)
    }

    /// The log's discovery document, including its public key.
    pub async fn webfinger(&self) -> Result<WebFingerResponse, ClientError> {
        let body = self
            .call(
                WEBFINGER,
                Method::GET,
                "/.well-known/webfinger",
                &[],
                None,
                Token::Read,
            )
            .await?;
        decode(WEBFINGER, &body)
    }

    /// Latest signed tree head.
    pub async fn get_sth(&self) -> Result<GetSthResponse, ClientError> {
        let body = self
            .call(GET_STH, Method::GET, "/v1/get-sth", &[], None, Token::Read)
            .await?;
        decode(GET_STH, &body)
    }

    /// Consistency proof between tree sizes `first` and `second`.
    pub async fn get_sth_consistency(
        &self,
        first: u64,
        second: u64,
    ) -> Result<GetSthConsistencyResponse, ClientError> {
        let body = self
            .call(
                GET_STH_CONSISTENCY,
                Method::GET,
                "/v1/get-sth-consistency",
                &[("first", first.to_string()), ("second", second.to_string())],
                None,
                Token::Read,
            )
            .await?;
        decode(GET_STH_CONSISTENCY, &body)
    }

    /// Audit path for the leaf whose base64 leaf hash is `hash`.
    pub async fn get_proof_by_hash(
        &self,
        hash: &str,
        tree_size: u64,
    ) -> Result<GetProofByHashResponse, ClientError> {
        let body = self
            .call(
                GET_PROOF_BY_HASH,
                Method::GET,
                "/v1/get-proof-by-hash",
                &[("hash", hash.to_string()), ("tree_size", tree_size.to_string())],
                None,
                Token::Read,
            )
            .await?;
        decode(GET_PROOF_BY_HASH, &body)
    }

    /// Entries `start..=end`.
    pub async fn get_entries(&self, start: u64, end: u64) -> Result<GetEntriesResponse, ClientError> {
        let body = self
            .call(
                GET_ENTRIES,
                Method::GET,
                "/v1/get-entries",
                &[("start", start.to_string()), ("end", end.to_string())],
                None,
                Token::Read,
            )
            .await?;
        decode(GET_ENTRIES, &body)
    }

    /// One entry with its audit path in a tree of `tree_size`.
    pub async fn get_entry_and_proof(
        &self,
        leaf_index: u64,
        tree_size: u64,
    ) -> Result<GetEntryAndProofResponse, ClientError> {
        let body = self
            .call(
                GET_ENTRY_AND_PROOF,
                Method::GET,
                "/v1/get-entry-and-proof",
                &[
                    ("leaf_index", leaf_index.to_string()),
                    ("tree_size", tree_size.to_string()),
                ],
                None,
                Token::Read,
            )
            .await?;
        decode(GET_ENTRY_AND_PROOF, &body)
    }

    async fn call(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
        token: Token,
    ) -> Result<Vec<u8>, ClientError> {
        let url = self.url(path, query)?;
        let headers = self.headers(token)?;

        tracing::debug!(operation, method = %method, path = url.path(), "sending log request");
        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };
        let resp = self
            .transport
            .send(request)
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        tracing::debug!(operation, status = resp.status.as_u16(), "log response");

        if !resp.status.is_success() {
            return Err(match serde_json::from_slice::<ErrorResponse>(&resp.body) {
                Ok(err) => ClientError::Server {
                    operation,
                    message: err.message,
                },
                Err(_) => ClientError::Status {
                    operation,
                    status: resp.status.as_u16(),
                    body: String::from_utf8_lossy(&resp.body).into_owned(),
                },
            });
        }
        Ok(resp.body)
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ClientError> {
        let base = self.config.endpoint.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{path}"))
            .map_err(|e| ClientError::InvalidRequest(format!("{path}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn headers(&self, token: Token) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        let token = match token {
            Token::Read => self.config.read_token.as_ref(),
            Token::Write => self.config.write_token.as_ref(),
        };
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| ClientError::InvalidRequest("bearer token is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

fn decode<T: DeserializeOwned>(operation: &'static str, body: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|source| ClientError::Decode { operation, source })
}

/// Run `fut` unless `signal` completes first.
///
/// Dropping the losing future aborts its in-flight request.
///
/// ```no_run
/// # async fn demo(client: vct_client::Client) -> Result<(), vct_client::ClientError> {
/// let sth = vct_client::cancellable("get STH", tokio::signal::ctrl_c(), client.get_sth()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn cancellable<T, S, F>(
    operation: &'static str,
    signal: S,
    fut: F,
) -> Result<T, ClientError>
where
    S: Future,
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        biased;
        _ = signal => Err(ClientError::Cancelled { operation }),
        result = fut => result,
    }
}
