//! # Canonical Serialization
//!
//! Produces [`CanonicalBytes`]: the sorted, canonically labelled N-Quads of a
//! credential's expanded JSON-LD graph.
//!
//! ## Security Invariant
//!
//! The only constructor is [`CanonicalBytes::from_credential`]. Everything the
//! log hashes about a credential flows through this type, so two credentials
//! that differ only in their proofs, in the order of their JSON members, or in
//! extra contexts that define no used term produce identical bytes.
//!
//! Expansion covers the JSON-LD features credentials use. Language, index,
//! id and type maps, `@reverse`, `@included` and `@nest` are rejected with
//! [`CanonicalizationError::Unsupported`] rather than silently hashed wrong.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::context::{is_absolute_iri, Context, TermDefinition};
use crate::error::CanonicalizationError;
use crate::loader::DocumentLoader;
use crate::rdf::{
    self, Quad, Term, RDF_FIRST, RDF_JSON, RDF_NIL, RDF_REST, RDF_TYPE, XSD_BOOLEAN, XSD_DOUBLE,
    XSD_INTEGER, XSD_STRING,
};

/// Expanded IRI of the credential `proof` property.
pub const SECURITY_PROOF_IRI: &str = "https://w3id.org/security#proof";

/// Canonical N-Quads bytes of a credential, with proofs removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBytes(String);

impl CanonicalBytes {
    /// Canonicalize a credential document.
    ///
    /// The top-level `proof` member is dropped before expansion, as is any
    /// property of the credential node that expands to [`SECURITY_PROOF_IRI`].
    pub fn from_credential(
        credential: &Value,
        loader: &dyn DocumentLoader,
    ) -> Result<Self, CanonicalizationError> {
        let Value::Object(members) = credential else {
            return Err(CanonicalizationError::MalformedDocument(
                "credential must be a JSON object".into(),
            ));
        };
        let mut members = members.clone();
        members.remove("proof");

        let mut expander = Expander::new(loader);
        expander.node(&members, &Context::default(), None, true)?;
        expander.quads.retain(Quad::is_well_formed);
        if expander.quads.is_empty() {
            return Err(CanonicalizationError::MalformedDocument(
                "credential expands to an empty graph".into(),
            ));
        }

        let nquads = rdf::canonical_nquads(&expander.quads);
        tracing::debug!(
            quads = expander.quads.len(),
            bytes = nquads.len(),
            "canonicalized credential"
        );
        Ok(Self(nquads))
    }

    /// The canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The canonical N-Quads as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical form is empty. Never true for a constructed value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct Expander<'a> {
    loader: &'a dyn DocumentLoader,
    quads: Vec<Quad>,
    next_blank: usize,
    named_blanks: HashMap<String, usize>,
}

impl<'a> Expander<'a> {
    fn new(loader: &'a dyn DocumentLoader) -> Self {
        Self {
            loader,
            quads: Vec::new(),
            next_blank: 0,
            named_blanks: HashMap::new(),
        }
    }

    fn fresh(&mut self) -> Term {
        let id = self.next_blank;
        self.next_blank += 1;
        Term::Blank(id)
    }

    fn named_blank(&mut self, label: &str) -> Term {
        if let Some(id) = self.named_blanks.get(label) {
            return Term::Blank(*id);
        }
        let term = self.fresh();
        if let Term::Blank(id) = term {
            self.named_blanks.insert(label.to_string(), id);
        }
        term
    }

    fn emit(&mut self, subject: &Term, predicate: &str, object: Term, graph: Option<&Term>) {
        self.quads.push(Quad {
            subject: subject.clone(),
            predicate: predicate.to_string(),
            object,
            graph: graph.cloned(),
        });
    }

    /// Resolve a node reference. `None` means the reference has no IRI and is
    /// dropped. Relative IRIs are kept here and their quads removed once
    /// expansion finishes.
    fn reference(&mut self, value: &str, ctx: &Context, vocab: bool) -> Option<Term> {
        let iri = ctx.expand_iri(value, vocab)?;
        if iri.starts_with("_:") {
            Some(self.named_blank(&iri))
        } else if iri.starts_with('@') {
            None
        } else {
            Some(Term::Iri(iri))
        }
    }

    /// Expand a node object, returning its subject term.
    fn node(
        &mut self,
        members: &Map<String, Value>,
        active: &Context,
        graph: Option<&Term>,
        is_credential: bool,
    ) -> Result<Term, CanonicalizationError> {
        let base = match members.get("@context") {
            Some(local) => active.process(local, self.loader)?,
            None => active.clone(),
        };

        let mut types = Vec::new();
        for (key, value) in members {
            if base.expand_iri(key, true).as_deref() == Some("@type") {
                for item in flatten(value) {
                    let t = item.as_str().ok_or_else(|| {
                        CanonicalizationError::MalformedDocument(format!("invalid @type value: {item}"))
                    })?;
                    types.push(t.to_string());
                }
            }
        }

        // Type-scoped contexts apply to this node only, in lexical order of the type terms.
        let mut scoped_types = types.clone();
        scoped_types.sort();
        let mut typed = base.clone();
        for t in &scoped_types {
            if let Some(local) = base.term(t).and_then(|d| d.scoped_context.as_ref()) {
                typed = typed.process(local, self.loader)?;
            }
        }

        let mut subject = None;
        for (key, value) in members {
            if typed.expand_iri(key, true).as_deref() == Some("@id") {
                let id = value.as_str().ok_or_else(|| {
                    CanonicalizationError::MalformedDocument(format!("invalid @id value: {value}"))
                })?;
                subject = self.reference(id, &typed, false);
            }
        }
        let subject = match subject {
            Some(subject) => subject,
            None => self.fresh(),
        };

        for t in &types {
            if let Some(object) = self.reference(t, &typed, true) {
                self.emit(&subject, RDF_TYPE, object, graph);
            }
        }

        let mut keys: Vec<&String> = members.keys().collect();
        keys.sort();
        for key in keys {
            if key == "@context" {
                continue;
            }
            let value = &members[key];
            let Some(property) = typed.expand_iri(key, true) else {
                continue;
            };
            match property.as_str() {
                "@id" | "@type" | "@index" => continue,
                "@graph" => {
                    for item in flatten(value) {
                        let Value::Object(inner) = item else {
                            return Err(CanonicalizationError::MalformedDocument(
                                "@graph entries must be node objects".into(),
                            ));
                        };
                        self.node(inner, &base, Some(&subject), false)?;
                    }
                    continue;
                }
                "@reverse" | "@included" | "@nest" => {
                    return Err(CanonicalizationError::Unsupported(property));
                }
                "@value" | "@list" | "@set" | "@language" | "@json" => {
                    return Err(CanonicalizationError::MalformedDocument(format!(
                        "{property} is not valid in a node object"
                    )));
                }
                k if k.starts_with('@') => continue,
                _ => {}
            }
            if !is_absolute_iri(&property) {
                continue;
            }
            if is_credential && property == SECURITY_PROOF_IRI {
                continue;
            }

            let definition = typed.term(key);
            let nested = match definition.and_then(|d| d.scoped_context.as_ref()) {
                Some(local) => base.process(local, self.loader)?,
                None => base.clone(),
            };
            self.property(&subject, &property, value, definition, &nested, graph)?;
        }

        Ok(subject)
    }

    fn property(
        &mut self,
        subject: &Term,
        predicate: &str,
        value: &Value,
        definition: Option<&TermDefinition>,
        ctx: &Context,
        graph: Option<&Term>,
    ) -> Result<(), CanonicalizationError> {
        if let Some(def) = definition {
            if def.type_mapping.as_deref() == Some("@json") {
                self.emit(subject, predicate, json_literal(value)?, graph);
                return Ok(());
            }
            for container in &def.containers {
                match container.as_str() {
                    "@list" => {
                        let items = flatten_one(value);
                        let head = self.list(&items, definition, ctx, graph)?;
                        self.emit(subject, predicate, head, graph);
                        return Ok(());
                    }
                    "@graph" => {
                        for item in flatten(value) {
                            let Value::Object(inner) = item else {
                                return Err(CanonicalizationError::MalformedDocument(format!(
                                    "graph container {predicate} holds a non-object"
                                )));
                            };
                            let name = self.fresh();
                            self.emit(subject, predicate, name.clone(), graph);
                            self.node(inner, ctx, Some(&name), false)?;
                        }
                        return Ok(());
                    }
                    "@set" => {}
                    other => {
                        return Err(CanonicalizationError::Unsupported(format!(
                            "{other} container on {predicate}"
                        )))
                    }
                }
            }
        }

        for item in flatten(value) {
            for object in self.object(item, definition, ctx, graph)? {
                self.emit(subject, predicate, object, graph);
            }
        }
        Ok(())
    }

    /// Expand one (non-array) value into zero or more object terms.
    fn object(
        &mut self,
        value: &Value,
        definition: Option<&TermDefinition>,
        ctx: &Context,
        graph: Option<&Term>,
    ) -> Result<Vec<Term>, CanonicalizationError> {
        let coercion = definition.and_then(|d| d.type_mapping.as_deref());
        if coercion == Some("@json") {
            return Ok(vec![json_literal(value)?]);
        }
        let datatype = coercion.filter(|c| !c.starts_with('@'));

        let term = match value {
            Value::Null => None,
            Value::String(s) => match coercion {
                Some("@id") => self.reference(s, ctx, false),
                Some("@vocab") => self.reference(s, ctx, true),
                _ => Some(Term::literal(s.as_str(), datatype.unwrap_or(XSD_STRING))),
            },
            Value::Bool(b) => Some(Term::literal(b.to_string(), datatype.unwrap_or(XSD_BOOLEAN))),
            Value::Number(n) => Some(number_literal(n, datatype)),
            Value::Array(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.extend(self.object(item, definition, ctx, graph)?);
                }
                return Ok(out);
            }
            Value::Object(members) => {
                if let Some(inner) = keyword_entry(members, ctx, "@value") {
                    value_object(members, inner, ctx)?
                } else if let Some(items) = keyword_entry(members, ctx, "@list") {
                    let items = flatten_one(items);
                    Some(self.list(&items, definition, ctx, graph)?)
                } else if let Some(items) = keyword_entry(members, ctx, "@set") {
                    let mut out = Vec::new();
                    for item in flatten(items) {
                        out.extend(self.object(item, definition, ctx, graph)?);
                    }
                    return Ok(out);
                } else {
                    Some(self.node(members, ctx, graph, false)?)
                }
            }
        };
        Ok(term.into_iter().collect())
    }

    /// Build an RDF collection and return its head.
    fn list(
        &mut self,
        items: &[&Value],
        definition: Option<&TermDefinition>,
        ctx: &Context,
        graph: Option<&Term>,
    ) -> Result<Term, CanonicalizationError> {
        let mut elements = Vec::new();
        for item in items {
            if item.is_array() {
                return Err(CanonicalizationError::Unsupported("list of lists".into()));
            }
            elements.extend(self.object(item, definition, ctx, graph)?);
        }
        if elements.is_empty() {
            return Ok(Term::Iri(RDF_NIL.to_string()));
        }

        let nodes: Vec<Term> = elements.iter().map(|_| self.fresh()).collect();
        for (i, element) in elements.into_iter().enumerate() {
            self.emit(&nodes[i], RDF_FIRST, element, graph);
            let rest = nodes
                .get(i + 1)
                .cloned()
                .unwrap_or_else(|| Term::Iri(RDF_NIL.to_string()));
            self.emit(&nodes[i], RDF_REST, rest, graph);
        }
        Ok(nodes[0].clone())
    }
}

fn value_object(
    members: &Map<String, Value>,
    value: &Value,
    ctx: &Context,
) -> Result<Option<Term>, CanonicalizationError> {
    let datatype = match keyword_entry(members, ctx, "@type") {
        Some(Value::String(t)) => Some(ctx.expand_iri(t, true).ok_or_else(|| {
            CanonicalizationError::MalformedDocument(format!("undefined value type {t}"))
        })?),
        Some(other) => {
            return Err(CanonicalizationError::MalformedDocument(format!(
                "invalid value object @type: {other}"
            )))
        }
        None => None,
    };
    if datatype.as_deref() == Some("@json") {
        return json_literal(value).map(Some);
    }
    let language = match keyword_entry(members, ctx, "@language") {
        Some(Value::String(lang)) => Some(lang.to_ascii_lowercase()),
        Some(other) => {
            return Err(CanonicalizationError::MalformedDocument(format!(
                "invalid @language: {other}"
            )))
        }
        None => None,
    };

    let term = match value {
        Value::Null => return Ok(None),
        Value::String(s) => match (&datatype, language) {
            (Some(dt), _) => Term::literal(s.as_str(), dt),
            (None, Some(lang)) => Term::lang_literal(s.as_str(), lang),
            (None, None) => Term::literal(s.as_str(), XSD_STRING),
        },
        Value::Bool(b) => Term::literal(b.to_string(), datatype.as_deref().unwrap_or(XSD_BOOLEAN)),
        Value::Number(n) => number_literal(n, datatype.as_deref()),
        other => {
            return Err(CanonicalizationError::MalformedDocument(format!(
                "invalid @value: {other}"
            )))
        }
    };
    Ok(Some(term))
}

fn json_literal(value: &Value) -> Result<Term, CanonicalizationError> {
    Ok(Term::literal(serde_jcs::to_string(value)?, RDF_JSON))
}

/// Integers stay `xsd:integer`; anything with a fraction (or coerced to
/// `xsd:double`) uses the canonical double form such as `1.5E0`.
fn number_literal(n: &serde_json::Number, datatype: Option<&str>) -> Term {
    if let Some(i) = n.as_i64() {
        if datatype != Some(XSD_DOUBLE) {
            return Term::literal(i.to_string(), datatype.unwrap_or(XSD_INTEGER));
        }
    }
    if let Some(u) = n.as_u64() {
        if datatype != Some(XSD_DOUBLE) {
            return Term::literal(u.to_string(), datatype.unwrap_or(XSD_INTEGER));
        }
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    if f.fract() == 0.0 && f.abs() < 1e21 && datatype != Some(XSD_DOUBLE) {
        return Term::literal(format!("{f:.0}"), datatype.unwrap_or(XSD_INTEGER));
    }
    Term::literal(canonical_double(f), datatype.unwrap_or(XSD_DOUBLE))
}

fn canonical_double(f: f64) -> String {
    let formatted = format!("{f:E}");
    match formatted.split_once('E') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => {
            format!("{mantissa}.0E{exponent}")
        }
        _ => formatted,
    }
}

/// Find a member whose key is `keyword` or an alias of it.
fn keyword_entry<'v>(members: &'v Map<String, Value>, ctx: &Context, keyword: &str) -> Option<&'v Value> {
    members
        .iter()
        .find(|(key, _)| key.as_str() == keyword || ctx.expand_iri(key, true).as_deref() == Some(keyword))
        .map(|(_, value)| value)
}

/// Recursively flatten nested arrays.
fn flatten(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten).collect(),
        other => vec![other],
    }
}

/// Flatten one level: the items of an array, or the value itself.
fn flatten_one(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}
