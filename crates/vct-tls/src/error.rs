//! Trust store errors.

use thiserror::Error;

/// Errors loading certificates or building the trust pool.
#[derive(Error, Debug)]
pub enum TlsError {
    /// The DER bytes are not a usable trust anchor certificate.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// PEM input could not be read.
    #[error("read PEM: {0}")]
    Pem(#[from] std::io::Error),

    /// PEM input held no `CERTIFICATE` blocks.
    #[error("no certificates found in PEM input")]
    NoCertificates,

    /// The platform root store could not be loaded.
    #[error("load system cert pool: {0}")]
    SystemRoots(String),

    /// A previously accepted anchor was rejected while rebuilding the pool.
    #[error("rebuild cert pool: {0}")]
    Rebuild(#[from] rustls::Error),
}
