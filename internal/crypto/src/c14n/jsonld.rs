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

//! Reduced JSON-LD to RDF quad conversion.
//!
//! This covers the subset of JSON-LD context processing that the DIVOC
//! credential schemas use: `@context` objects, arrays, and string references
//! resolved through a caller-provided document loader, CURIE prefixes,
//! `@id`/`@vocab` typed properties, and nested typed objects.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::c14n::rdf::{Quad, Term};

const RDF_TYPE_IRI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const XSD_INTEGER_IRI: &str = "http://www.w3.org/2001/XMLSchema#integer";

type CurieMap = HashMap<String, String>;

/// Resolves `@context` references to their schema documents.
///
/// Returns `None` for unknown documents; the affected properties then stay
/// unresolved and produce no quads, mirroring the reference behavior.
pub type DocumentLoader<'a> = &'a dyn Fn(&str) -> Option<String>;

#[derive(Clone, Debug, Default)]
struct JsonLdProperty {
    name: String,
    qualified_name: String,
    prop_type: String,
    prefix: String,
    meta_type: JsonLdMetaType,
}

impl JsonLdProperty {
    fn from_json(name: &str, value: &Value) -> Self {
        let mut prop = JsonLdProperty::default();
        if name == "id" {
            return prop;
        }
        prop.name = name.to_owned();
        match value {
            Value::String(s) => prop.qualified_name = s.clone(),
            Value::Object(obj) => {
                prop.qualified_name = string_value(obj.get("@id"));
                prop.prop_type = string_value(obj.get("@type"));
                if prop.prop_type == "@vocab" {
                    let prefix_len = prop
                        .qualified_name
                        .find(':')
                        .map(|idx| idx + 1)
                        .unwrap_or(0);
                    prop.prefix = prop.qualified_name[..prefix_len].to_owned();
                }
            }
            _ => {}
        }
        prop
    }
}

#[derive(Clone, Debug, Default)]
struct JsonLdMetaType {
    name: String,
    qualified_name: String,
    properties: Vec<JsonLdProperty>,
}

impl JsonLdMetaType {
    fn load(&mut self, obj: &Map<String, Value>) {
        self.qualified_name = string_value(obj.get("@id"));
        let mut curie_map = CurieMap::new();
        if let Some(Value::Object(context)) = obj.get("@context") {
            for (key, value) in context {
                match value {
                    Value::Object(prop_obj) => {
                        let mut prop = JsonLdProperty::from_json(key, value);
                        if prop_obj.contains_key("@context") {
                            prop.meta_type.load(prop_obj);
                        }
                        self.add_property(prop);
                    }
                    Value::String(_) => {
                        if read_curie(key, value, &mut curie_map) {
                            continue;
                        }
                        self.add_property(JsonLdProperty::from_json(key, value));
                    }
                    _ => {}
                }
            }
        }

        resolve_curie_meta_type(self, &curie_map);
    }

    fn add_property(&mut self, property: JsonLdProperty) {
        if property.name.is_empty() {
            return;
        }
        match self
            .properties
            .binary_search_by(|p| p.name.cmp(&property.name))
        {
            Ok(_) => {}
            Err(idx) => self.properties.insert(idx, property),
        }
    }
}

fn string_value(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default()
}

fn read_curie(key: &str, value: &Value, curie_map: &mut CurieMap) -> bool {
    let Some(prefix) = value.as_str() else {
        return false;
    };
    if !prefix.starts_with("http") {
        return false;
    }
    let Some(last) = prefix.chars().last() else {
        return false;
    };
    if !":/?#[]@".contains(last) {
        return false;
    }
    curie_map.insert(key.to_owned(), prefix.to_owned());
    true
}

fn resolve_curie_str(s: &mut String, curie_map: &CurieMap) {
    let Some(idx) = s.find(':') else {
        return;
    };
    let Some(full_prefix) = curie_map.get(&s[..idx]) else {
        return;
    };
    *s = format!("{}{}", full_prefix, &s[idx + 1..]);
}

fn resolve_curie_property(prop: &mut JsonLdProperty, curie_map: &CurieMap) {
    resolve_curie_str(&mut prop.qualified_name, curie_map);
    resolve_curie_str(&mut prop.prop_type, curie_map);
    resolve_curie_meta_type(&mut prop.meta_type, curie_map);
    resolve_curie_str(&mut prop.prefix, curie_map);
}

fn resolve_curie_meta_type(mt: &mut JsonLdMetaType, curie_map: &CurieMap) {
    resolve_curie_str(&mut mt.qualified_name, curie_map);
    for prop in &mut mt.properties {
        resolve_curie_property(prop, curie_map);
    }
}

#[derive(Debug, Default)]
struct JsonLdContext {
    meta_types: Vec<JsonLdMetaType>,
    global_properties: Vec<JsonLdProperty>,
    curie_map: CurieMap,
}

impl JsonLdContext {
    fn load_document(&mut self, document: &str, loader: DocumentLoader<'_>) {
        let Ok(doc) = serde_json::from_str::<Value>(document) else {
            return;
        };
        match doc.get("@context") {
            Some(Value::Object(context)) => self.load_object(context),
            Some(Value::Array(parts)) => {
                for part in parts {
                    match part {
                        Value::Object(context) => self.load_object(context),
                        Value::String(reference) => {
                            if let Some(referenced) = loader(reference) {
                                self.load_document(&referenced, loader);
                            } else {
                                log::warn!("failed to provide requested document: {reference}");
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn load_object(&mut self, context: &Map<String, Value>) {
        for (key, value) in context {
            let starts_upper = key.chars().next().is_some_and(|c| c.is_uppercase());
            match value {
                Value::Object(sub_obj) => {
                    if starts_upper || sub_obj.contains_key("@context") {
                        let mut meta_type = JsonLdMetaType {
                            name: key.clone(),
                            ..Default::default()
                        };
                        meta_type.load(sub_obj);
                        self.meta_types.push(meta_type);
                    } else {
                        self.global_properties
                            .push(JsonLdProperty::from_json(key, value));
                    }
                }
                Value::String(s) => {
                    if read_curie(key, value, &mut self.curie_map) {
                        continue;
                    }
                    if starts_upper {
                        self.meta_types.push(JsonLdMetaType {
                            name: key.clone(),
                            qualified_name: s.clone(),
                            ..Default::default()
                        });
                    } else {
                        self.global_properties
                            .push(JsonLdProperty::from_json(key, value));
                    }
                }
                _ => {}
            }
        }
    }

    fn resolve(&mut self) {
        for mt in &mut self.meta_types {
            for prop in self.global_properties.clone() {
                mt.add_property(prop);
            }
        }

        for mt in &mut self.meta_types {
            resolve_curie_meta_type(mt, &self.curie_map);
        }

        self.meta_types.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
    }

    fn meta_type(&self, type_name: &str) -> JsonLdMetaType {
        match self
            .meta_types
            .binary_search_by(|mt| mt.name.as_str().cmp(type_name))
        {
            Ok(idx) => self.meta_types[idx].clone(),
            Err(_) => JsonLdMetaType::default(),
        }
    }
}

/// Converts JSON-LD documents to RDF quads.
///
/// The blank node counter lives here, scoped to one converter value; a
/// single credential and its proof options must use separate converters to
/// start both counters at zero.
pub struct JsonLdToRdf<'a> {
    loader: DocumentLoader<'a>,
    blank_node_counter: usize,
}

impl<'a> JsonLdToRdf<'a> {
    /// Create a converter resolving `@context` references through `loader`.
    pub fn new(loader: DocumentLoader<'a>) -> Self {
        Self {
            loader,
            blank_node_counter: 0,
        }
    }

    /// Convert a JSON-LD document to RDF quads.
    pub fn to_rdf(&mut self, obj: &Map<String, Value>) -> Vec<Quad> {
        let mut context = JsonLdContext::default();
        match obj.get("@context") {
            Some(Value::Array(parts)) => {
                for part in parts {
                    if let Some(reference) = part.as_str() {
                        if let Some(document) = (self.loader)(reference) {
                            context.load_document(&document, self.loader);
                        } else {
                            log::warn!("failed to provide requested document: {reference}");
                        }
                    }
                }
            }
            Some(Value::String(reference)) => {
                if let Some(document) = (self.loader)(reference) {
                    context.load_document(&document, self.loader);
                } else {
                    log::warn!("failed to provide requested document: {reference}");
                }
            }
            _ => {}
        }
        context.resolve();

        let mut quads = Vec::new();
        self.convert_object(&context, obj, &mut quads);
        quads
    }

    fn convert_object(
        &mut self,
        context: &JsonLdContext,
        obj: &Map<String, Value>,
        quads: &mut Vec<Quad>,
    ) -> Term {
        let id = self.id_for_object(obj);

        match obj.get("type") {
            Some(Value::Array(types)) => {
                for type_value in types {
                    if let Some(type_name) = type_value.as_str() {
                        let mt = context.meta_type(type_name);
                        self.convert_with_meta_type(context, &mt, &id, obj, quads);
                    }
                }
            }
            Some(Value::String(type_name)) => {
                let mt = context.meta_type(type_name);
                self.convert_with_meta_type(context, &mt, &id, obj, quads);
            }
            _ => {}
        }

        id
    }

    fn convert_with_meta_type(
        &mut self,
        context: &JsonLdContext,
        mt: &JsonLdMetaType,
        id: &Term,
        obj: &Map<String, Value>,
        quads: &mut Vec<Quad>,
    ) {
        if mt.name.is_empty() && mt.properties.is_empty() {
            // meta type not found
            return;
        }

        for property in &mt.properties {
            let Some(value) = obj.get(&property.name) else {
                continue;
            };

            if let Value::Array(items) = value {
                if property.name == "type" {
                    // already iterating over the type array
                    self.emit_quad(context, mt, property, id, &Value::String(mt.name.clone()), quads);
                } else {
                    for item in items {
                        self.emit_quad(context, mt, property, id, item, quads);
                    }
                }
            } else {
                self.emit_quad(context, mt, property, id, value, quads);
            }
        }
    }

    fn emit_quad(
        &mut self,
        context: &JsonLdContext,
        mt: &JsonLdMetaType,
        property: &JsonLdProperty,
        id: &Term,
        value: &Value,
        quads: &mut Vec<Quad>,
    ) {
        let mut quad = Quad {
            subject: id.clone(),
            predicate: Term::iri(property.qualified_name.clone()),
            ..Default::default()
        };

        match value {
            Value::String(s) => {
                quad.object.value = s.clone();
                if property.prop_type == "@id" {
                    quad.object = Term::iri(s.clone());
                } else if property.qualified_name == "@type" {
                    quad.predicate = Term::iri(RDF_TYPE_IRI);
                    quad.object.term_type = super::rdf::TermType::Iri;
                    if !property.meta_type.qualified_name.is_empty() {
                        quad.object.value = property.meta_type.qualified_name.clone();
                    } else if !mt.qualified_name.is_empty() {
                        quad.object.value = mt.qualified_name.clone();
                    }
                } else if property.prop_type == "@vocab" {
                    quad.object = Term::iri(format!("{}{}", property.prefix, s));
                } else {
                    quad.object = Term::typed_literal(s.clone(), property.prop_type.clone());
                }
            }
            Value::Object(sub_obj) => {
                if property.meta_type.properties.is_empty() {
                    quad.object = self.convert_object(context, sub_obj, quads);
                } else {
                    let sub_id = self.id_for_object(sub_obj);
                    self.convert_with_meta_type(context, &property.meta_type, &sub_id, sub_obj, quads);
                    quad.object = sub_id;
                }
            }
            Value::Number(n) => {
                let int_value = n.as_i64().unwrap_or_else(|| {
                    n.as_f64().map(|f| f as i64).unwrap_or_default()
                });
                quad.object = Term::typed_literal(int_value.to_string(), XSD_INTEGER_IRI);
            }
            _ => {}
        }

        quads.push(quad);
    }

    fn id_for_object(&mut self, obj: &Map<String, Value>) -> Term {
        let id = string_value(obj.get("id"));
        if id.is_empty() {
            let label = self.blank_node_counter.to_string();
            self.blank_node_counter += 1;
            Term::blank_node(label)
        } else {
            Term::iri(id)
        }
    }
}
