//! # RDF Dataset and Canonical N-Quads
//!
//! The expanded form of a credential is a list of quads. This module owns the
//! quad model, N-Quads serialization, and URDNA2015 relabelling of blank
//! nodes to `_:c14n0`, `_:c14n1`, ...
//!
//! ## Blank node labelling
//!
//! Every blank node first gets a hash of the quads that mention it, with the
//! node itself written as `_:a` and any other blank node as `_:z`. Nodes
//! with a unique hash are labelled in ascending hash order. Nodes that share
//! a hash are told apart by hashing their blank neighbourhood recursively,
//! and the winning path decides their labels.

use std::collections::{BTreeMap, HashMap, HashSet};

use sha2::{Digest, Sha256};

use crate::context::is_absolute_iri;

pub(crate) const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub(crate) const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
pub(crate) const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
pub(crate) const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
pub(crate) const RDF_JSON: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#JSON";
pub(crate) const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub(crate) const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub(crate) const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub(crate) const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub(crate) const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Literal {
    pub value: String,
    pub datatype: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Term {
    Iri(String),
    /// Blank node, numbered in discovery order by the expander.
    Blank(usize),
    Literal(Literal),
}

impl Term {
    pub fn literal(value: impl Into<String>, datatype: &str) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            datatype: datatype.to_string(),
            language: None,
        })
    }

    pub fn lang_literal(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            datatype: RDF_LANG_STRING.to_string(),
            language: Some(language.into()),
        })
    }

    fn blank_id(&self) -> Option<usize> {
        match self {
            Term::Blank(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Quad {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
    pub graph: Option<Term>,
}

impl Quad {
    /// Whether every IRI in the quad is absolute. Quads that would carry a
    /// relative IRI are not part of the dataset.
    pub fn is_well_formed(&self) -> bool {
        let absolute = |term: &Term| match term {
            Term::Iri(iri) => is_absolute_iri(iri),
            _ => true,
        };
        absolute(&self.subject)
            && is_absolute_iri(&self.predicate)
            && absolute(&self.object)
            && self.graph.as_ref().map_or(true, absolute)
    }
}

/// Serialize `quads` as sorted, deduplicated canonical N-Quads.
pub(crate) fn canonical_nquads(quads: &[Quad]) -> String {
    let mut seen = HashSet::new();
    let dataset: Vec<&Quad> = quads.iter().filter(|q| seen.insert(*q)).collect();
    let labels = Canonicalizer::new(&dataset).labels();
    let label = |id: usize| labels.get(id).map_or_else(|| format!("_:{id}"), str::to_string);

    let mut lines: Vec<String> = dataset.iter().map(|q| nquad_line(q, &label)).collect();
    lines.sort();
    lines.concat()
}

fn nquad_line(quad: &Quad, label: &dyn Fn(usize) -> String) -> String {
    let mut line = String::new();
    line.push_str(&term_text(&quad.subject, label));
    line.push(' ');
    line.push('<');
    line.push_str(&quad.predicate);
    line.push('>');
    line.push(' ');
    line.push_str(&term_text(&quad.object, label));
    if let Some(graph) = &quad.graph {
        line.push(' ');
        line.push_str(&term_text(graph, label));
    }
    line.push_str(" .\n");
    line
}

fn term_text(term: &Term, label: &dyn Fn(usize) -> String) -> String {
    match term {
        Term::Iri(iri) => format!("<{iri}>"),
        Term::Blank(id) => label(*id),
        Term::Literal(lit) => {
            let mut out = format!("\"{}\"", escape_literal(&lit.value));
            if let Some(lang) = &lit.language {
                out.push('@');
                out.push_str(lang);
            } else if lit.datatype != XSD_STRING {
                out.push_str("^^<");
                out.push_str(&lit.datatype);
                out.push('>');
            }
            out
        }
    }
}

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Sort `lines` and hash their concatenation.
fn hex_digest(lines: &mut [String]) -> String {
    lines.sort();
    sha256_hex(lines.concat().as_bytes())
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Issues sequential labels (`<prefix>0`, `<prefix>1`, ...) and remembers
/// the order it issued them in.
#[derive(Debug, Clone)]
struct IdentifierIssuer {
    prefix: &'static str,
    issued: Vec<usize>,
    labels: HashMap<usize, String>,
}

impl IdentifierIssuer {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            issued: Vec::new(),
            labels: HashMap::new(),
        }
    }

    fn issue(&mut self, id: usize) -> String {
        if let Some(label) = self.labels.get(&id) {
            return label.clone();
        }
        let label = format!("{}{}", self.prefix, self.issued.len());
        self.issued.push(id);
        self.labels.insert(id, label.clone());
        label
    }

    fn get(&self, id: usize) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }
}

/// URDNA2015 canonical labelling state for one dataset.
struct Canonicalizer<'a> {
    quads: &'a [&'a Quad],
    /// Blank nodes in discovery order.
    order: Vec<usize>,
    /// Quads mentioning each blank node, once per mention.
    mentions: HashMap<usize, Vec<usize>>,
    first_degree: HashMap<usize, String>,
    canonical: IdentifierIssuer,
}

impl<'a> Canonicalizer<'a> {
    fn new(quads: &'a [&'a Quad]) -> Self {
        let mut order = Vec::new();
        let mut mentions: HashMap<usize, Vec<usize>> = HashMap::new();
        for (index, quad) in quads.iter().enumerate() {
            let components = [Some(&quad.subject), Some(&quad.object), quad.graph.as_ref()];
            for id in components.into_iter().flatten().filter_map(Term::blank_id) {
                let entry = mentions.entry(id).or_default();
                if entry.is_empty() {
                    order.push(id);
                }
                entry.push(index);
            }
        }

        Self {
            quads,
            order,
            mentions,
            first_degree: HashMap::new(),
            canonical: IdentifierIssuer::new("_:c14n"),
        }
    }

    fn labels(mut self) -> IdentifierIssuer {
        let mut by_hash: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for id in self.order.clone() {
            let hash = self.first_degree_hash(id);
            by_hash.entry(hash).or_default().push(id);
        }

        for ids in by_hash.values() {
            if let [id] = ids.as_slice() {
                self.canonical.issue(*id);
            }
        }

        for ids in by_hash.values().filter(|ids| ids.len() > 1) {
            let mut results = Vec::with_capacity(ids.len());
            for &id in ids {
                if self.canonical.get(id).is_some() {
                    continue;
                }
                let mut scratch = IdentifierIssuer::new("_:b");
                scratch.issue(id);
                results.push(self.n_degree_hash(id, scratch));
            }
            results.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, issuer) in results {
                for id in issuer.issued {
                    self.canonical.issue(id);
                }
            }
        }

        self.canonical
    }

    /// Hash of the quads mentioning `id`, with `id` written as `_:a` and
    /// every other blank node as `_:z`.
    fn first_degree_hash(&mut self, id: usize) -> String {
        if let Some(hash) = self.first_degree.get(&id) {
            return hash.clone();
        }
        let label = |other: usize| (if other == id { "_:a" } else { "_:z" }).to_string();
        let mut lines: Vec<String> = self
            .mentions
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&index| nquad_line(self.quads[index], &label))
            .collect();
        let hash = hex_digest(&mut lines);
        self.first_degree.insert(id, hash.clone());
        hash
    }

    fn related_hash(
        &mut self,
        related: usize,
        predicate: &str,
        issuer: &IdentifierIssuer,
        position: char,
    ) -> String {
        let known = self
            .canonical
            .get(related)
            .or_else(|| issuer.get(related))
            .map(str::to_string);
        let identifier = match known {
            Some(label) => label,
            None => self.first_degree_hash(related),
        };

        let mut input = String::from(position);
        if position != 'g' {
            input.push('<');
            input.push_str(predicate);
            input.push('>');
        }
        input.push_str(&identifier);
        sha256_hex(input.as_bytes())
    }

    /// Hash `id` together with its blank neighbourhood, trying every order
    /// of equally-hashed neighbours and keeping the lexicographically least
    /// labelling path.
    fn n_degree_hash(&mut self, id: usize, mut issuer: IdentifierIssuer) -> (String, IdentifierIssuer) {
        let quads = self.quads;
        let mut related: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for index in self.mentions.get(&id).cloned().unwrap_or_default() {
            let quad = quads[index];
            let components = [
                (Some(&quad.subject), 's'),
                (Some(&quad.object), 'o'),
                (quad.graph.as_ref(), 'g'),
            ];
            for (term, position) in components {
                match term.and_then(Term::blank_id) {
                    Some(other) if other != id => {
                        let hash = self.related_hash(other, &quad.predicate, &issuer, position);
                        related.entry(hash).or_default().push(other);
                    }
                    _ => {}
                }
            }
        }

        let mut data = String::new();
        for (hash, nodes) in related {
            data.push_str(&hash);

            let mut chosen: Option<(String, IdentifierIssuer)> = None;
            'permutation: for permutation in permutations(&nodes) {
                let mut candidate = issuer.clone();
                let mut path = String::new();
                let mut recursion = Vec::new();

                for node in permutation {
                    match self.canonical.get(node) {
                        Some(label) => path.push_str(label),
                        None => {
                            if candidate.get(node).is_none() {
                                recursion.push(node);
                            }
                            path.push_str(&candidate.issue(node));
                        }
                    }
                    if exceeds(&path, chosen.as_ref()) {
                        continue 'permutation;
                    }
                }

                for node in recursion {
                    let label = candidate.issue(node);
                    let (result, next) = self.n_degree_hash(node, candidate);
                    candidate = next;
                    path.push_str(&label);
                    path.push('<');
                    path.push_str(&result);
                    path.push('>');
                    if exceeds(&path, chosen.as_ref()) {
                        continue 'permutation;
                    }
                }

                if chosen.as_ref().map_or(true, |(best, _)| path < *best) {
                    chosen = Some((path, candidate));
                }
            }

            if let Some((path, next)) = chosen {
                data.push_str(&path);
                issuer = next;
            }
        }

        (sha256_hex(data.as_bytes()), issuer)
    }
}

/// Whether `path` can no longer beat the best path found so far.
fn exceeds(path: &str, chosen: Option<&(String, IdentifierIssuer)>) -> bool {
    match chosen {
        Some((best, _)) => path.len() >= best.len() && path > best.as_str(),
        None => false,
    }
}

/// Every ordering of `items`, duplicates included.
fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..items.len()).collect();
    let mut out = vec![indices.iter().map(|&i| items[i]).collect::<Vec<_>>()];
    loop {
        let Some(pivot) = (1..indices.len()).rev().find(|&i| indices[i - 1] < indices[i]) else {
            return out;
        };
        let pivot = pivot - 1;
        let Some(swap) = (pivot + 1..indices.len()).rev().find(|&j| indices[j] > indices[pivot]) else {
            return out;
        };
        indices.swap(pivot, swap);
        indices[pivot + 1..].reverse();
        out.push(indices.iter().map(|&i| items[i]).collect());
    }
}
