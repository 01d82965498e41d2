//! Wire types for the log's REST API.
//!
//! Field order follows the log's JSON output so a decoded response
//! re-serializes to the same bytes. Binary fields are standard base64;
//! fields the log may leave nil are `Option` and keep their `null`.

use serde::{Deserialize, Serialize};
use vct_core::encoding::{base64_bytes, base64_list, base64_option};
use vct_core::{MerkleError, SignedTreeHead};

/// Receipt returned by `add-vc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddVcResponse {
    /// Receipt format version.
    pub svct_version: u64,
    /// Log identifier.
    #[serde(with = "base64_bytes")]
    pub id: Vec<u8>,
    /// Milliseconds since the Unix epoch, as assigned by the log.
    pub timestamp: u64,
    /// Opaque extension data, empty for current logs.
    pub extensions: String,
    /// JSON signature envelope, see `vct_crypto::DigitallySigned`.
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

/// Discovery document served at `/.well-known/webfinger`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebFingerResponse {
    /// The log resource the document describes.
    pub subject: String,
    /// Property IRIs mapped to values, including [`PUBLIC_KEY_PROPERTY`].
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    /// Related resources such as mirrors and the ledger type.
    #[serde(default)]
    pub links: Vec<WebFingerLink>,
}

/// Public key property advertised in [`WebFingerResponse::properties`].
pub const PUBLIC_KEY_PROPERTY: &str = "https://trustbloc.dev/ns/public-key";

impl WebFingerResponse {
    /// The log's base64 DER public key, if advertised.
    pub fn public_key(&self) -> Option<&str> {
        self.properties.get(PUBLIC_KEY_PROPERTY)?.as_str()
    }
}

/// One link of a [`WebFingerResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebFingerLink {
    /// Relation type, such as `self` or `alternate`.
    pub rel: String,
    /// Media or ledger type of the target, when given.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    /// Target URL.
    pub href: String,
}

/// Latest signed tree head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSthResponse {
    /// Number of leaves in the tree.
    pub tree_size: u64,
    /// Milliseconds since the Unix epoch at which the head was signed.
    pub timestamp: u64,
    /// Merkle tree root.
    #[serde(with = "base64_bytes")]
    pub sha256_root_hash: Vec<u8>,
    /// JSON signature envelope over the head.
    #[serde(with = "base64_bytes")]
    pub tree_head_signature: Vec<u8>,
}

impl GetSthResponse {
    /// Convert to a [`SignedTreeHead`], checking the root is a SHA-256 digest.
    pub fn signed_tree_head(&self) -> Result<SignedTreeHead, MerkleError> {
        let sha256_root_hash = self
            .sha256_root_hash
            .as_slice()
            .try_into()
            .map_err(|_| MerkleError::InvalidHashLength(self.sha256_root_hash.len()))?;
        Ok(SignedTreeHead {
            tree_size: self.tree_size,
            timestamp: self.timestamp,
            sha256_root_hash,
            tree_head_signature: self.tree_head_signature.clone(),
        })
    }
}

/// Consistency proof between two tree sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSthConsistencyResponse {
    /// Proof nodes, `None` when the log sends `null`.
    #[serde(with = "base64_list")]
    pub consistency: Option<Vec<Vec<u8>>>,
}

impl GetSthConsistencyResponse {
    /// The proof nodes, empty when absent.
    pub fn proof(&self) -> &[Vec<u8>] {
        self.consistency.as_deref().unwrap_or_default()
    }
}

/// Inclusion proof for a leaf hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProofByHashResponse {
    /// Zero-based index of the leaf.
    pub leaf_index: u64,
    /// Audit path from the leaf to the root, `None` when the log sends `null`.
    #[serde(with = "base64_list")]
    pub audit_path: Option<Vec<Vec<u8>>>,
}

impl GetProofByHashResponse {
    /// The audit path, empty when absent.
    pub fn proof(&self) -> &[Vec<u8>] {
        self.audit_path.as_deref().unwrap_or_default()
    }
}

/// A range of log entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetEntriesResponse {
    /// Entries in index order.
    pub entries: Vec<LeafEntry>,
}

/// One log entry: the Merkle leaf input plus opaque extra data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafEntry {
    /// Encoded `MerkleTreeLeaf`.
    #[serde(with = "base64_bytes")]
    pub leaf_input: Vec<u8>,
    /// Log-specific data, `None` when the log sends `null`.
    #[serde(with = "base64_option")]
    pub extra_data: Option<Vec<u8>>,
}

/// One entry together with its inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetEntryAndProofResponse {
    /// Encoded `MerkleTreeLeaf`.
    #[serde(with = "base64_bytes")]
    pub leaf_input: Vec<u8>,
    /// Log-specific data, `None` when the log sends `null`.
    #[serde(with = "base64_option")]
    pub extra_data: Option<Vec<u8>>,
    /// Audit path from the leaf to the root, `None` when the log sends `null`.
    #[serde(with = "base64_list")]
    pub audit_path: Option<Vec<Vec<u8>>>,
}

impl GetEntryAndProofResponse {
    /// The audit path, empty when absent.
    pub fn proof(&self) -> &[Vec<u8>] {
        self.audit_path.as_deref().unwrap_or_default()
    }
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sth_with_short_root_is_rejected() {
        let resp = GetSthResponse {
            tree_size: 1,
            timestamp: 2,
            sha256_root_hash: vec![0; 31],
            tree_head_signature: Vec::new(),
        };
        assert_eq!(
            resp.signed_tree_head().unwrap_err(),
            MerkleError::InvalidHashLength(31)
        );
    }

    #[test]
    fn webfinger_link_type_is_optional() {
        let link: WebFingerLink =
            serde_json::from_str(r#"{"rel":"self","href":"https://log.example"}"#).unwrap();
        assert!(link.link_type.is_none());
        assert_eq!(
            serde_json::to_string(&link).unwrap(),
            r#"{"rel":"self","href":"https://log.example"}"#
        );

        let link: WebFingerLink = serde_json::from_str(
            r#"{"rel":"alternate","type":"https://trustbloc.dev/ns/ledger-type","href":"x"}"#,
        )
        .unwrap();
        assert_eq!(
            link.link_type.as_deref(),
            Some("https://trustbloc.dev/ns/ledger-type")
        );
    }

    #[test]
    fn nil_proof_fields_round_trip_as_null() {
        let json = r#"{"leaf_input":"bGVhZg==","extra_data":null,"audit_path":null}"#;
        let resp: GetEntryAndProofResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.extra_data, None);
        assert!(resp.proof().is_empty());
        assert_eq!(serde_json::to_string(&resp).unwrap(), json);

        let json = r#"{"leaf_index":0,"audit_path":[]}"#;
        let resp: GetProofByHashResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.audit_path, Some(Vec::new()));
        assert_eq!(serde_json::to_string(&resp).unwrap(), json);

        let json = r#"{"consistency":null}"#;
        let resp: GetSthConsistencyResponse = serde_json::from_str(json).unwrap();
        assert!(resp.proof().is_empty());
        assert_eq!(serde_json::to_string(&resp).unwrap(), json);
    }

    #[test]
    fn empty_extra_data_stays_a_string() {
        let json = r#"{"leaf_input":"bGVhZg==","extra_data":""}"#;
        let entry: LeafEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.extra_data, Some(Vec::new()));
        assert_eq!(serde_json::to_string(&entry).unwrap(), json);
    }

    #[test]
    fn webfinger_exposes_public_key_property() {
        let resp: WebFingerResponse = serde_json::from_str(
            r#"{"subject":"s","properties":{"https://trustbloc.dev/ns/public-key":"cHVi"},"links":[]}"#,
        )
        .unwrap();
        assert_eq!(resp.public_key(), Some("cHVi"));
    }
}
