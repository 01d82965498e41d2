//! Log client configuration.
//!
//! Built explicitly with [`ClientConfig::new`] or loaded from the
//! environment with [`ClientConfig::from_env`].

use url::Url;
use zeroize::Zeroizing;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for one transparency log endpoint.
///
/// Custom `Debug` implementation redacts both bearer tokens.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the log. Operation paths are appended to it.
    pub endpoint: Url,
    /// Bearer token attached to every read operation.
    pub read_token: Option<Zeroizing<String>>,
    /// Bearer token attached to `add-vc`.
    pub write_token: Option<Zeroizing<String>>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Seed trust stores with the platform roots.
    pub use_system_roots: bool,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("read_token", &self.read_token.as_ref().map(|_| "[REDACTED]"))
            .field("write_token", &self.write_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("use_system_roots", &self.use_system_roots)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration with no tokens and default timeouts.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            read_token: None,
            write_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            use_system_roots: true,
        }
    }

    /// Set the read token.
    pub fn with_read_token(mut self, token: impl Into<String>) -> Self {
        self.read_token = Some(Zeroizing::new(token.into()));
        self
    }

    /// Set the write token.
    pub fn with_write_token(mut self, token: impl Into<String>) -> Self {
        self.write_token = Some(Zeroizing::new(token.into()));
        self
    }

    /// A new trust store, seeded with the platform roots when
    /// `use_system_roots` is set. Share it with [`Client::with_trust_store`](crate::Client::with_trust_store).
    pub fn trust_store(&self) -> Result<vct_tls::TrustStore, vct_tls::TlsError> {
        vct_tls::TrustStore::new(self.use_system_roots)
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `VCT_ENDPOINT` (required)
    /// - `VCT_READ_TOKEN`, `VCT_WRITE_TOKEN` (optional)
    /// - `VCT_TIMEOUT_SECS` (default: 30)
    /// - `VCT_USE_SYSTEM_ROOTS` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw = lookup("VCT_ENDPOINT").ok_or(ConfigError::MissingEndpoint)?;
        let endpoint = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidUrl("VCT_ENDPOINT".to_string(), e.to_string()))?;

        let timeout_secs = match lookup("VCT_TIMEOUT_SECS") {
            Some(s) => s
                .parse()
                .map_err(|_| ConfigError::InvalidValue("VCT_TIMEOUT_SECS".to_string(), s))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let use_system_roots = match lookup("VCT_USE_SYSTEM_ROOTS") {
            Some(s) => parse_bool(&s)
                .ok_or_else(|| ConfigError::InvalidValue("VCT_USE_SYSTEM_ROOTS".to_string(), s))?,
            None => true,
        };

        Ok(Self {
            endpoint,
            read_token: lookup("VCT_READ_TOKEN").map(Zeroizing::new),
            write_token: lookup("VCT_WRITE_TOKEN").map(Zeroizing::new),
            timeout_secs,
            use_system_roots,
        })
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `VCT_ENDPOINT` is not set.
    #[error("VCT_ENDPOINT environment variable is required")]
    MissingEndpoint,
    /// A URL variable does not parse. Holds the variable and the parse error.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    /// A variable holds a value of the wrong form. Holds the variable and the value.
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}
