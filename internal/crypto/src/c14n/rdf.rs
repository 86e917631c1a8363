// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Universal RDF Dataset Normalization Algorithm 2015 (URDNA2015).
//!
//! This is far from a complete implementation of the full spec; it covers
//! exactly what reproducing the DIVOC signed byte sequence needs. The graph
//! component of a quad is not modeled (always the default graph).

use std::collections::{BTreeMap, HashMap};

use sha2::{Digest, Sha256};

/// The kind of an RDF term.
///
/// The declaration order defines the canonical sort order.
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub enum TermType {
    /// Placeholder for values the conversion could not classify.
    #[default]
    Undefined,
    /// An IRI reference.
    Iri,
    /// A literal, optionally typed.
    Literal,
    /// A blank node label.
    BlankNode,
}

/// One term of an RDF quad.
///
/// Terms order lexicographically by (type, value, literal type); that
/// ordering drives both the canonical sort and deduplication.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct Term {
    /// The term kind.
    pub term_type: TermType,
    /// IRI, literal value, or blank node label, depending on type.
    pub value: String,
    /// Datatype IRI for typed literals, empty otherwise.
    pub literal_type: String,
}

impl Term {
    /// An IRI term.
    pub fn iri(value: impl Into<String>) -> Self {
        Self {
            term_type: TermType::Iri,
            value: value.into(),
            literal_type: String::new(),
        }
    }

    /// An untyped literal term.
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            term_type: TermType::Literal,
            value: value.into(),
            literal_type: String::new(),
        }
    }

    /// A typed literal term.
    pub fn typed_literal(value: impl Into<String>, literal_type: impl Into<String>) -> Self {
        Self {
            term_type: TermType::Literal,
            value: value.into(),
            literal_type: literal_type.into(),
        }
    }

    /// A blank node term.
    pub fn blank_node(value: impl Into<String>) -> Self {
        Self {
            term_type: TermType::BlankNode,
            value: value.into(),
            literal_type: String::new(),
        }
    }
}

/// An RDF triple in the default graph.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct Quad {
    /// Subject term.
    pub subject: Term,
    /// Predicate term.
    pub predicate: Term,
    /// Object term.
    pub object: Term,
}

fn serialize_term(out: &mut Vec<u8>, term: &Term) {
    match term.term_type {
        TermType::Iri => {
            out.push(b'<');
            out.extend_from_slice(term.value.as_bytes());
            out.push(b'>');
        }
        TermType::BlankNode => {
            out.extend_from_slice(b"_:");
            out.extend_from_slice(term.value.as_bytes());
        }
        TermType::Literal => {
            out.push(b'"');
            out.extend_from_slice(term.value.as_bytes());
            out.push(b'"');
            if !term.literal_type.is_empty() {
                out.extend_from_slice(b"^^<");
                out.extend_from_slice(term.literal_type.as_bytes());
                out.push(b'>');
            }
        }
        TermType::Undefined => {
            out.extend_from_slice(term.value.as_bytes());
        }
    }
}

/// Write a list of RDF quads in N-Quads-like text form.
pub fn serialize(quads: &[Quad]) -> Vec<u8> {
    let mut out = Vec::new();
    for quad in quads {
        serialize_term(&mut out, &quad.subject);
        out.push(b' ');
        serialize_term(&mut out, &quad.predicate);
        out.push(b' ');
        serialize_term(&mut out, &quad.object);
        out.extend_from_slice(b" .\n");
    }
    out
}

// see https://json-ld.github.io/rdf-dataset-canonicalization/spec/#hash-first-degree-quads
fn hash_first_degree_quads(quads: &[Quad], ref_blank_node: &str) -> String {
    let rename = |term: &Term| -> Term {
        if term.term_type == TermType::BlankNode {
            if term.value == ref_blank_node {
                Term::blank_node("a")
            } else {
                Term::blank_node("z")
            }
        } else {
            term.clone()
        }
    };

    let mut to_hash: Vec<Quad> = quads
        .iter()
        .map(|quad| Quad {
            subject: rename(&quad.subject),
            predicate: rename(&quad.predicate),
            object: rename(&quad.object),
        })
        .collect();
    to_hash.sort();

    hex::encode(Sha256::digest(serialize(&to_hash)))
}

/// Apply the URDNA2015 normalization algorithm to `quads`: relabel blank
/// nodes deterministically, sort, and deduplicate.
// see https://json-ld.github.io/rdf-dataset-canonicalization/spec/#algorithm
pub fn normalize(quads: &mut Vec<Quad>) {
    // ignores predicates and repeated blank nodes within one quad, neither
    // of which occurs in the credentials this feeds on
    let mut blank_node_to_quads: HashMap<String, Vec<Quad>> = HashMap::new();
    for quad in quads.iter() {
        if quad.subject.term_type == TermType::BlankNode {
            blank_node_to_quads
                .entry(quad.subject.value.clone())
                .or_default()
                .push(quad.clone());
        }
        if quad.object.term_type == TermType::BlankNode {
            blank_node_to_quads
                .entry(quad.object.value.clone())
                .or_default()
                .push(quad.clone());
        }
    }

    let mut hash_to_blank_node: BTreeMap<String, String> = BTreeMap::new();
    for (blank_node, incident) in &blank_node_to_quads {
        hash_to_blank_node.insert(
            hash_first_degree_quads(incident, blank_node),
            blank_node.clone(),
        );
    }

    let mut c14n_map: HashMap<String, String> = HashMap::new();
    for (counter, blank_node) in hash_to_blank_node.into_values().enumerate() {
        c14n_map.insert(blank_node, format!("c14n{counter}"));
    }

    let translate = |term: &mut Term| {
        if term.term_type == TermType::BlankNode {
            if let Some(canonical) = c14n_map.get(&term.value) {
                term.value = canonical.clone();
            }
        }
    };
    for quad in quads.iter_mut() {
        translate(&mut quad.subject);
        translate(&mut quad.predicate);
        translate(&mut quad.object);
    }

    quads.sort();
    quads.dedup();
}
