//! # JSON-LD Document Loading
//!
//! The canonicalizer never fetches contexts itself. It asks an injected
//! [`DocumentLoader`] for each remote context URL, which keeps canonicalization
//! pure and testable without a live context registry.
//!
//! [`StaticDocumentLoader`] is an in-memory implementation. Built with
//! [`StaticDocumentLoader::with_builtin_contexts`] it resolves the contexts
//! that transparency-logged credentials commonly reference.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::LoaderError;

/// W3C Verifiable Credentials Data Model v1 context.
pub const CREDENTIALS_V1_URL: &str = "https://www.w3.org/2018/credentials/v1";
/// Ed25519 Signature 2020 cryptographic suite context.
pub const ED25519_2020_V1_URL: &str = "https://w3id.org/security/suites/ed25519-2020/v1";
/// W3C credentials examples context (used by test vectors and demos).
pub const CREDENTIALS_EXAMPLES_V1_URL: &str = "https://www.w3.org/2018/credentials/examples/v1";
/// ODRL context, imported by the examples context.
pub const ODRL_URL: &str = "https://www.w3.org/ns/odrl.jsonld";

const BUILTIN_CONTEXTS: &[(&str, &str)] = &[
    (CREDENTIALS_V1_URL, include_str!("../contexts/credentials-v1.jsonld")),
    (ED25519_2020_V1_URL, include_str!("../contexts/ed25519-2020-v1.jsonld")),
    (
        CREDENTIALS_EXAMPLES_V1_URL,
        include_str!("../contexts/credentials-examples-v1.jsonld"),
    ),
    (ODRL_URL, include_str!("../contexts/odrl.jsonld")),
];

/// A resolved JSON-LD document.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    /// The URL the document was resolved from (after any redirects).
    pub document_url: String,
    /// The parsed JSON document.
    pub document: Value,
}

/// Capability resolving a JSON-LD context URL to its document.
pub trait DocumentLoader: Send + Sync {
    /// Resolve `url`.
    ///
    /// Implementations return [`LoaderError::NotFound`] when no document exists
    /// for the URL and [`LoaderError::Malformed`] when one exists but cannot be
    /// used.
    fn load(&self, url: &str) -> Result<RemoteDocument, LoaderError>;
}

impl<T: DocumentLoader + ?Sized> DocumentLoader for &T {
    fn load(&self, url: &str) -> Result<RemoteDocument, LoaderError> {
        (**self).load(url)
    }
}

impl<T: DocumentLoader + ?Sized> DocumentLoader for std::sync::Arc<T> {
    fn load(&self, url: &str) -> Result<RemoteDocument, LoaderError> {
        (**self).load(url)
    }
}

/// In-memory document loader keyed by exact URL.
#[derive(Debug, Clone, Default)]
pub struct StaticDocumentLoader {
    documents: HashMap<String, Value>,
}

impl StaticDocumentLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader preloaded with the embedded credential contexts.
    pub fn with_builtin_contexts() -> Self {
        let mut loader = Self::new();
        for (url, text) in BUILTIN_CONTEXTS {
            match serde_json::from_str(text) {
                Ok(doc) => {
                    loader.documents.insert((*url).to_string(), doc);
                }
                Err(e) => tracing::error!(url, "embedded context is not valid JSON: {e}"),
            }
        }
        loader
    }

    /// Register a parsed document for `url`, replacing any previous one.
    pub fn insert(&mut self, url: impl Into<String>, document: Value) {
        self.documents.insert(url.into(), document);
    }

    /// Register a document from its JSON text.
    pub fn insert_str(&mut self, url: impl Into<String>, text: &str) -> Result<(), LoaderError> {
        let url = url.into();
        let document = serde_json::from_str(text).map_err(|e| LoaderError::Malformed {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        self.documents.insert(url, document);
        Ok(())
    }

    /// Whether a document is registered for `url`.
    pub fn contains(&self, url: &str) -> bool {
        self.documents.contains_key(url)
    }
}

impl DocumentLoader for StaticDocumentLoader {
    fn load(&self, url: &str) -> Result<RemoteDocument, LoaderError> {
        let document = self
            .documents
            .get(url)
            .ok_or_else(|| LoaderError::NotFound(url.to_string()))?;
        if !document.is_object() {
            return Err(LoaderError::Malformed {
                url: url.to_string(),
                reason: "document is not a JSON object".into(),
            });
        }
        Ok(RemoteDocument {
            document_url: url.to_string(),
            document: document.clone(),
        })
    }
}
