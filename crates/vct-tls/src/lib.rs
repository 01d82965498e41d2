//! # vct-tls -- Trust Anchors for the Log Transport
//!
//! [`TrustStore`] is a thread-safe pool of X.509 trust anchors, optionally
//! seeded from the platform's native root store. Anchors can be added at any
//! time; the `rustls` [`RootCertStore`](rustls::RootCertStore) handed to
//! transports is rebuilt lazily on the next [`TrustStore::get`] and swapped
//! in whole, so readers never see a half-built pool.

pub mod anchor;
pub mod error;
pub mod store;

pub use anchor::TrustAnchor;
pub use error::TlsError;
pub use store::TrustStore;
