//! # vct-crypto -- Log Signature Verification
//!
//! Checks the signatures a credential transparency log hands out:
//!
//! - **Timestamp signatures** over a credential's leaf hash, proving the log
//!   committed to the credential at the stated time.
//! - **Signed tree head signatures** over `(tree size, timestamp, root)`.
//!
//! Both arrive as a JSON [`DigitallySigned`] envelope naming the algorithm.
//! Dispatch goes through the [`algorithm`] table; supporting a new scheme
//! means adding one entry there.
//!
//! ## Crate Policy
//!
//! - Depends only on `vct-core` internally.
//! - No mocking of cryptographic operations in tests: real P-256 and Ed25519
//!   keys, real leaf hashes.
//! - Verification failures are returned, never logged.

pub mod algorithm;
pub mod envelope;
pub mod error;
pub mod verify;

pub use algorithm::{Algorithm, PublicKeyHandle, ALGORITHMS};
pub use envelope::{DigitallySigned, SignatureAndHashAlgorithm};
pub use error::{CryptoError, VerifyError};
pub use verify::{tree_head_signature_input, verify_sth_signature, verify_vc_timestamp_signature};
