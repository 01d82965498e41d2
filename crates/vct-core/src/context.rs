//! # JSON-LD Active Context
//!
//! Context processing for the subset of JSON-LD 1.1 that credentials use:
//! remote and inline contexts, `null` resets, `@vocab`, compact IRIs, keyword
//! aliases, and expanded term definitions carrying `@id`, `@type`,
//! `@container` and scoped `@context` entries.
//!
//! `@protected` is accepted but not enforced: a later context redefining a
//! protected term simply wins. Canonicalization only needs the resulting IRI
//! mappings, and two credentials that differ by an extra suite context must
//! still expand to the same graph.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{CanonicalizationError, LoaderError};
use crate::loader::DocumentLoader;

/// Upper bound on nested remote context inclusion.
const MAX_REMOTE_DEPTH: usize = 16;

const KEYWORDS: &[&str] = &[
    "@base",
    "@container",
    "@context",
    "@direction",
    "@graph",
    "@id",
    "@import",
    "@included",
    "@index",
    "@json",
    "@language",
    "@list",
    "@nest",
    "@none",
    "@prefix",
    "@propagate",
    "@protected",
    "@reverse",
    "@set",
    "@type",
    "@value",
    "@version",
    "@vocab",
];

/// Whether `s` is a JSON-LD keyword.
pub(crate) fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// Whether `s` looks like an absolute IRI (has a scheme).
pub(crate) fn is_absolute_iri(s: &str) -> bool {
    match s.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// A single term definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TermDefinition {
    /// Expanded IRI or keyword. `None` when the term is explicitly mapped to null.
    pub iri: Option<String>,
    /// `@id`, `@vocab`, `@json`, `@none`, or an absolute datatype IRI.
    pub type_mapping: Option<String>,
    pub containers: Vec<String>,
    pub scoped_context: Option<Value>,
}

/// The active context used while expanding a node.
#[derive(Debug, Clone, Default)]
pub(crate) struct Context {
    terms: HashMap<String, TermDefinition>,
    vocab: Option<String>,
}

impl Context {
    pub fn term(&self, term: &str) -> Option<&TermDefinition> {
        self.terms.get(term)
    }

    /// Apply a local context (string URL, object, array, or null) on top of this one.
    pub fn process(
        &self,
        local: &Value,
        loader: &dyn DocumentLoader,
    ) -> Result<Context, CanonicalizationError> {
        self.process_with_stack(local, loader, &mut Vec::new())
    }

    fn process_with_stack(
        &self,
        local: &Value,
        loader: &dyn DocumentLoader,
        remote_stack: &mut Vec<String>,
    ) -> Result<Context, CanonicalizationError> {
        let mut result = self.clone();
        let entries: Vec<&Value> = match local {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        for entry in entries {
            match entry {
                Value::Null => result = Context::default(),
                Value::String(url) => {
                    if remote_stack.iter().any(|seen| seen == url)
                        || remote_stack.len() >= MAX_REMOTE_DEPTH
                    {
                        return Err(LoaderError::Other {
                            url: url.clone(),
                            reason: "recursive context inclusion".into(),
                        }
                        .into());
                    }
                    let remote = loader.load(url)?;
                    let inner = remote.document.get("@context").ok_or_else(|| {
                        LoaderError::Malformed {
                            url: url.clone(),
                            reason: "document has no @context entry".into(),
                        }
                    })?;
                    remote_stack.push(url.clone());
                    result = result.process_with_stack(inner, loader, remote_stack)?;
                    remote_stack.pop();
                }
                Value::Object(map) => result.apply_definitions(map)?,
                other => {
                    return Err(CanonicalizationError::MalformedDocument(format!(
                        "invalid context entry: {other}"
                    )))
                }
            }
        }
        Ok(result)
    }

    fn apply_definitions(&mut self, local: &Map<String, Value>) -> Result<(), CanonicalizationError> {
        if local.contains_key("@import") {
            return Err(CanonicalizationError::Unsupported("@import".into()));
        }

        match local.get("@vocab") {
            None => {}
            Some(Value::Null) => self.vocab = None,
            Some(Value::String(vocab)) => {
                let expanded = self.expand_iri(vocab, true).unwrap_or_else(|| vocab.clone());
                self.vocab = Some(expanded);
            }
            Some(other) => {
                return Err(CanonicalizationError::MalformedDocument(format!(
                    "invalid @vocab: {other}"
                )))
            }
        }

        let mut defined = HashMap::new();
        for term in local.keys() {
            if term.starts_with('@') {
                continue;
            }
            self.create_term(local, term, &mut defined)?;
        }
        Ok(())
    }

    /// Define `term` from `local`, first defining any terms its IRI depends on.
    ///
    /// `defined` tracks terms being defined (`false`) or done (`true`) so that
    /// cyclic definitions are rejected instead of recursing forever.
    fn create_term(
        &mut self,
        local: &Map<String, Value>,
        term: &str,
        defined: &mut HashMap<String, bool>,
    ) -> Result<(), CanonicalizationError> {
        match defined.get(term) {
            Some(true) => return Ok(()),
            Some(false) => {
                return Err(CanonicalizationError::MalformedDocument(format!(
                    "cyclic IRI mapping for term {term}"
                )))
            }
            None => {}
        }
        defined.insert(term.to_string(), false);

        let definition = match local.get(term) {
            None | Some(Value::Null) => TermDefinition::default(),
            Some(Value::String(iri)) => TermDefinition {
                iri: Some(self.expand_for_definition(iri, local, defined)?),
                ..TermDefinition::default()
            },
            Some(Value::Object(expanded)) => self.expanded_definition(term, expanded, local, defined)?,
            Some(other) => {
                return Err(CanonicalizationError::MalformedDocument(format!(
                    "invalid definition for term {term}: {other}"
                )))
            }
        };

        self.terms.insert(term.to_string(), definition);
        defined.insert(term.to_string(), true);
        Ok(())
    }

    fn expanded_definition(
        &mut self,
        term: &str,
        expanded: &Map<String, Value>,
        local: &Map<String, Value>,
        defined: &mut HashMap<String, bool>,
    ) -> Result<TermDefinition, CanonicalizationError> {
        if expanded.contains_key("@reverse") {
            return Err(CanonicalizationError::Unsupported(format!(
                "@reverse in definition of {term}"
            )));
        }

        let iri = match expanded.get("@id") {
            Some(Value::Null) => None,
            Some(Value::String(id)) => Some(self.expand_for_definition(id, local, defined)?),
            Some(other) => {
                return Err(CanonicalizationError::MalformedDocument(format!(
                    "invalid @id for term {term}: {other}"
                )))
            }
            None => Some(self.default_term_iri(term, local, defined)?),
        };

        let type_mapping = match expanded.get("@type") {
            None => None,
            Some(Value::String(t)) if matches!(t.as_str(), "@id" | "@vocab" | "@json" | "@none") => {
                Some(t.clone())
            }
            Some(Value::String(t)) => {
                let datatype = self.expand_for_definition(t, local, defined)?;
                if !is_absolute_iri(&datatype) {
                    return Err(CanonicalizationError::MalformedDocument(format!(
                        "invalid type mapping for term {term}: {t}"
                    )));
                }
                Some(datatype)
            }
            Some(other) => {
                return Err(CanonicalizationError::MalformedDocument(format!(
                    "invalid @type for term {term}: {other}"
                )))
            }
        };

        let containers = match expanded.get("@container") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(c)) => vec![c.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .map(|c| {
                    c.as_str().map(str::to_string).ok_or_else(|| {
                        CanonicalizationError::MalformedDocument(format!(
                            "invalid @container for term {term}"
                        ))
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(CanonicalizationError::MalformedDocument(format!(
                    "invalid @container for term {term}: {other}"
                )))
            }
        };

        Ok(TermDefinition {
            iri,
            type_mapping,
            containers,
            scoped_context: expanded.get("@context").cloned(),
        })
    }

    /// IRI for an expanded definition that omits `@id`.
    fn default_term_iri(
        &mut self,
        term: &str,
        local: &Map<String, Value>,
        defined: &mut HashMap<String, bool>,
    ) -> Result<String, CanonicalizationError> {
        if term.contains(':') {
            return self.expand_for_definition(term, local, defined);
        }
        match &self.vocab {
            Some(vocab) => Ok(format!("{vocab}{term}")),
            None => Err(CanonicalizationError::MalformedDocument(format!(
                "term {term} has no IRI mapping"
            ))),
        }
    }

    /// Expand an IRI appearing inside a context definition. Terms and prefixes
    /// declared in the same local context are defined first.
    fn expand_for_definition(
        &mut self,
        value: &str,
        local: &Map<String, Value>,
        defined: &mut HashMap<String, bool>,
    ) -> Result<String, CanonicalizationError> {
        if is_keyword(value) {
            return Ok(value.to_string());
        }
        if local.contains_key(value) && defined.get(value) != Some(&false) {
            self.create_term(local, value, defined)?;
        }
        if let Some(def) = self.terms.get(value) {
            if let Some(iri) = &def.iri {
                return Ok(iri.clone());
            }
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return Ok(value.to_string());
            }
            if local.contains_key(prefix) {
                self.create_term(local, prefix, defined)?;
            }
            if let Some(iri) = self.terms.get(prefix).and_then(|d| d.iri.as_ref()) {
                return Ok(format!("{iri}{suffix}"));
            }
            return Ok(value.to_string());
        }
        match &self.vocab {
            Some(vocab) => Ok(format!("{vocab}{value}")),
            None => Err(CanonicalizationError::MalformedDocument(format!(
                "cannot expand {value} to an absolute IRI"
            ))),
        }
    }

    /// Expand a key or value to an IRI, keyword or blank node identifier.
    ///
    /// With `vocab` set, terms and `@vocab` apply (keys, types, `@vocab`
    /// coercion). Without it the value is document-relative and, absent a
    /// base IRI, kept as written. Returns `None` when a vocabulary-relative
    /// value has no mapping, which drops it from the graph.
    pub fn expand_iri(&self, value: &str, vocab: bool) -> Option<String> {
        if is_keyword(value) {
            return Some(value.to_string());
        }
        if vocab {
            if let Some(def) = self.terms.get(value) {
                return def.iri.clone();
            }
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return Some(value.to_string());
            }
            if let Some(iri) = self.terms.get(prefix).and_then(|d| d.iri.as_ref()) {
                return Some(format!("{iri}{suffix}"));
            }
            return Some(value.to_string());
        }
        if vocab {
            return self.vocab.as_ref().map(|v| format!("{v}{value}"));
        }
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticDocumentLoader;
    use serde_json::json;

    fn process(local: Value) -> Context {
        Context::default()
            .process(&local, &StaticDocumentLoader::new())
            .unwrap()
    }

    #[test]
    fn compact_iri_uses_prefix_from_same_context() {
        let ctx = process(json!({
            "name": "schema:name",
            "schema": "http://schema.org/"
        }));
        assert_eq!(ctx.expand_iri("name", true).as_deref(), Some("http://schema.org/name"));
        assert_eq!(
            ctx.expand_iri("schema:givenName", false).as_deref(),
            Some("http://schema.org/givenName")
        );
    }

    #[test]
    fn keyword_alias_expands_to_keyword() {
        let ctx = process(json!({"id": "@id", "type": "@type"}));
        assert_eq!(ctx.expand_iri("id", true).as_deref(), Some("@id"));
        assert_eq!(ctx.expand_iri("type", true).as_deref(), Some("@type"));
    }

    #[test]
    fn vocab_applies_to_undefined_terms_only() {
        let ctx = process(json!({"@vocab": "https://example.org/#", "x": "urn:x"}));
        assert_eq!(ctx.expand_iri("x", true).as_deref(), Some("urn:x"));
        assert_eq!(ctx.expand_iri("y", true).as_deref(), Some("https://example.org/#y"));
        assert_eq!(ctx.expand_iri("y", false).as_deref(), Some("y"));
    }

    #[test]
    fn undefined_term_without_vocab_is_dropped() {
        let ctx = process(json!({}));
        assert_eq!(ctx.expand_iri("degree", true), None);
    }

    #[test]
    fn null_context_resets() {
        let ctx = process(json!([{"x": "urn:x"}, null]));
        assert_eq!(ctx.expand_iri("x", true), None);
    }

    #[test]
    fn expanded_definition_records_coercion_and_container() {
        let ctx = process(json!({
            "xsd": "http://www.w3.org/2001/XMLSchema#",
            "when": {"@id": "urn:when", "@type": "xsd:dateTime"},
            "items": {"@id": "urn:items", "@container": ["@list"]}
        }));
        let when = ctx.term("when").unwrap();
        assert_eq!(
            when.type_mapping.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#dateTime")
        );
        assert_eq!(ctx.term("items").unwrap().containers, vec!["@list".to_string()]);
    }

    #[test]
    fn cyclic_definition_is_rejected() {
        let err = Context::default()
            .process(&json!({"a": "b:x", "b": "a:y"}), &StaticDocumentLoader::new())
            .unwrap_err();
        assert!(matches!(err, CanonicalizationError::MalformedDocument(_)));
    }

    #[test]
    fn remote_context_not_found_is_resolution_error() {
        let err = Context::default()
            .process(&json!("https://example.com/missing"), &StaticDocumentLoader::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CanonicalizationError::ContextResolution(LoaderError::NotFound(_))
        ));
    }

    #[test]
    fn recursive_remote_context_is_rejected() {
        let mut loader = StaticDocumentLoader::new();
        loader.insert("urn:a", json!({"@context": "urn:b"}));
        loader.insert("urn:b", json!({"@context": "urn:a"}));
        let err = Context::default().process(&json!("urn:a"), &loader).unwrap_err();
        assert!(matches!(
            err,
            CanonicalizationError::ContextResolution(LoaderError::Other { .. })
        ));
    }

    #[test]
    fn absolute_iri_detection() {
        assert!(is_absolute_iri("https://example.com"));
        assert!(is_absolute_iri("did:key:123"));
        assert!(is_absolute_iri("urn:uuid:1"));
        assert!(!is_absolute_iri("relative/path"));
        assert!(!is_absolute_iri("1x:y"));
    }
}
