//! JSON rendering of the model in canonical schema/protocol notation.
//!
//! The same walk serves two callers, distinguished by how a named reference is
//! written ([`RefWriter`]):
//!
//! - [`RawNames`] writes references exactly as they were spelled. The IDL
//!   normalizer uses it to emit `.avpr` documents.
//! - [`InlineOnce`] writes a resolved type's full definition at its first
//!   occurrence and its full name afterwards. Generated sources embed this
//!   form, which stays finite even when types refer to themselves.
use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::ir::{Field, Message, NameRef, NamedKind, NamedType, Protocol, TypeId, TypeRef};
use crate::resolve::TypeGraph;

// ————————————————————————————————————————————————————————————————————————————
// REFERENCE WRITERS
// ————————————————————————————————————————————————————————————————————————————

pub trait RefWriter<R> {
    /// `enclosing` is the namespace a nested definition would inherit.
    fn write_ref(&mut self, r: &R, enclosing: Option<&str>) -> Value;
}

pub struct RawNames;

impl RefWriter<NameRef> for RawNames {
    /// As spelled, unless the spelling would be read in a different namespace
    /// than the one it was written in.
    fn write_ref(&mut self, r: &NameRef, enclosing: Option<&str>) -> Value {
        match r.scope.as_deref() {
            Some(scope) if !r.raw.contains('.') && Some(scope) != enclosing => Value::String(r.candidates().0.full()),
            _ => Value::String(r.raw.clone()),
        }
    }
}

pub struct InlineOnce<'g> {
    graph: &'g TypeGraph,
    seen: HashSet<TypeId>,
}

impl<'g> InlineOnce<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self { graph, seen: HashSet::new() }
    }
}

impl RefWriter<TypeId> for InlineOnce<'_> {
    fn write_ref(&mut self, id: &TypeId, enclosing: Option<&str>) -> Value {
        let graph = self.graph;
        let ty = graph.get(*id);
        // marked before descending so a self reference prints as a name
        if self.seen.insert(*id) {
            named_json(ty, self, enclosing)
        } else {
            Value::String(ty.name.full())
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

pub fn type_json<R, W: RefWriter<R>>(ty: &TypeRef<R>, w: &mut W, enclosing: Option<&str>) -> Value {
    match ty {
        TypeRef::Primitive(p) => Value::String(p.name().to_string()),
        TypeRef::Logical(logical, base) => {
            let mut map = Map::new();
            map.insert("type".into(), Value::String(base.name().to_string()));
            map.insert("logicalType".into(), Value::String(logical.name().to_string()));
            if let crate::ir::Logical::Decimal { precision, scale } = logical {
                map.insert("precision".into(), json!(precision));
                map.insert("scale".into(), json!(scale));
            }
            Value::Object(map)
        }
        TypeRef::Array(item) => json!({ "type": "array", "items": type_json(item, w, enclosing) }),
        TypeRef::Map(value) => json!({ "type": "map", "values": type_json(value, w, enclosing) }),
        TypeRef::Union(arms) => Value::Array(arms.iter().map(|arm| type_json(arm, w, enclosing)).collect()),
        TypeRef::Named(r) => w.write_ref(r, enclosing),
        TypeRef::Annotated(inner, props) => {
            let mut map = match type_json(inner, w, enclosing) {
                Value::Object(map) => map,
                other => Map::from_iter([("type".to_string(), other)]),
            };
            for (k, v) in props {
                map.insert(k.clone(), v.clone());
            }
            Value::Object(map)
        }
    }
}

pub fn named_json<R, W: RefWriter<R>>(ty: &NamedType<R>, w: &mut W, enclosing: Option<&str>) -> Value {
    let mut map = Map::new();
    let tag = match &ty.kind {
        NamedKind::Record { error: true, .. } => "error",
        NamedKind::Record { .. } => "record",
        NamedKind::Enum { .. } => "enum",
        NamedKind::Fixed { .. } => "fixed",
    };
    map.insert("type".into(), json!(tag));
    map.insert("name".into(), json!(ty.name.name));
    if ty.name.namespace() != enclosing {
        map.insert("namespace".into(), json!(ty.name.namespace().unwrap_or("")));
    }
    if let Some(doc) = &ty.doc {
        map.insert("doc".into(), json!(doc));
    }
    if !ty.aliases.is_empty() {
        map.insert("aliases".into(), json!(ty.aliases));
    }
    match &ty.kind {
        NamedKind::Record { fields, .. } => {
            let own = ty.name.namespace();
            let fields: Vec<Value> = fields.iter().map(|f| field_json(f, w, own)).collect();
            map.insert("fields".into(), Value::Array(fields));
        }
        NamedKind::Enum { symbols, default } => {
            map.insert("symbols".into(), json!(symbols));
            if let Some(d) = default {
                map.insert("default".into(), json!(d));
            }
        }
        NamedKind::Fixed { size, logical } => {
            map.insert("size".into(), json!(size));
            if let Some(crate::ir::Logical::Decimal { precision, scale }) = logical {
                map.insert("logicalType".into(), json!("decimal"));
                map.insert("precision".into(), json!(precision));
                map.insert("scale".into(), json!(scale));
            }
        }
    }
    for (k, v) in &ty.props {
        map.insert(k.clone(), v.clone());
    }
    Value::Object(map)
}

fn field_json<R, W: RefWriter<R>>(field: &Field<R>, w: &mut W, enclosing: Option<&str>) -> Value {
    let mut map = Map::new();
    map.insert("name".into(), json!(field.name));
    map.insert("type".into(), type_json(&field.ty, w, enclosing));
    if let Some(doc) = &field.doc {
        map.insert("doc".into(), json!(doc));
    }
    if let Some(default) = &field.default {
        map.insert("default".into(), default.clone());
    }
    if !field.aliases.is_empty() {
        map.insert("aliases".into(), json!(field.aliases));
    }
    for (k, v) in &field.props {
        map.insert(k.clone(), v.clone());
    }
    Value::Object(map)
}

fn message_json<R, W: RefWriter<R>>(message: &Message<R>, w: &mut W, enclosing: Option<&str>) -> Value {
    let mut map = Map::new();
    if let Some(doc) = &message.doc {
        map.insert("doc".into(), json!(doc));
    }
    let request: Vec<Value> = message.request.iter().map(|f| field_json(f, w, enclosing)).collect();
    map.insert("request".into(), Value::Array(request));
    map.insert("response".into(), type_json(&message.response, w, enclosing));
    if !message.errors.is_empty() {
        let errors: Vec<Value> = message.errors.iter().map(|e| type_json(e, w, enclosing)).collect();
        map.insert("errors".into(), Value::Array(errors));
    }
    if message.one_way {
        map.insert("one-way".into(), Value::Bool(true));
    }
    for (k, v) in &message.props {
        map.insert(k.clone(), v.clone());
    }
    Value::Object(map)
}

/// `types` are the already rendered entries of the protocol's `types` array.
pub fn protocol_json<R, W: RefWriter<R>>(protocol: &Protocol<R>, types: Vec<Value>, w: &mut W) -> Value {
    let ns = protocol.name.namespace();
    let mut map = Map::new();
    map.insert("protocol".into(), json!(protocol.name.name));
    if let Some(ns) = ns {
        map.insert("namespace".into(), json!(ns));
    }
    if let Some(doc) = &protocol.doc {
        map.insert("doc".into(), json!(doc));
    }
    map.insert("types".into(), Value::Array(types));
    let mut messages = Map::new();
    for message in &protocol.messages {
        messages.insert(message.name.clone(), message_json(message, w, ns));
    }
    map.insert("messages".into(), Value::Object(messages));
    for (k, v) in &protocol.props {
        map.insert(k.clone(), v.clone());
    }
    Value::Object(map)
}

/// Self-contained schema text for one resolved type.
pub fn embedded_schema(graph: &TypeGraph, id: TypeId) -> String {
    let mut w = InlineOnce::new(graph);
    w.write_ref(&id, None).to_string()
}

/// Self-contained protocol text: every declared type inlined once, in order.
pub fn embedded_protocol(graph: &TypeGraph, protocol: &Protocol<TypeId>) -> String {
    let mut w = InlineOnce::new(graph);
    let ns = protocol.name.namespace();
    let types: Vec<Value> = protocol.types.iter().map(|id| w.write_ref(id, ns)).collect();
    protocol_json(protocol, types, &mut w).to_string()
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_schema;
    use std::path::Path;

    #[test]
    fn raw_rendering_round_trips_through_the_parser() {
        let src = r#"{"type": "record", "name": "Node", "namespace": "com.example", "doc": "A node.",
            "fields": [
                {"name": "value", "type": {"type": "int", "logicalType": "date"}},
                {"name": "next", "type": ["null", "Node"], "default": null, "order": "ignore"},
                {"name": "tags", "type": {"type": "map", "values": {"type": "array", "items": "string"}}},
                {"name": "label", "type": {"type": "string", "avro.java.string": "String"}},
                {"name": "ids", "type": {"type": "array", "items": "long", "java-class": "java.util.ArrayList"}}
            ]}"#;
        let doc = parse_schema(Path::new("n.avsc"), src).unwrap();
        let rendered = named_json(&doc.types[0], &mut RawNames, None).to_string();
        let again = parse_schema(Path::new("n.avsc"), &rendered).unwrap();
        assert_eq!(doc.types, again.types);
    }

    #[test]
    fn references_moved_to_another_namespace_are_qualified() {
        let local = NameRef::new("Item", Some("com.common"));
        assert_eq!(RawNames.write_ref(&local, Some("com.common")), json!("Item"));
        assert_eq!(RawNames.write_ref(&local, Some("com.shop")), json!("com.common.Item"));
        assert_eq!(RawNames.write_ref(&local, None), json!("com.common.Item"));
        let dotted = NameRef::new("org.other.Thing", Some("com.common"));
        assert_eq!(RawNames.write_ref(&dotted, Some("com.shop")), json!("org.other.Thing"));
        let global = NameRef::new("Color", None);
        assert_eq!(RawNames.write_ref(&global, Some("com.shop")), json!("Color"));
    }

    #[test]
    fn null_namespace_inside_a_namespace_is_written_explicitly() {
        let doc = parse_schema(Path::new("e.avsc"), r#"{"type": "enum", "name": "E", "symbols": ["A"]}"#).unwrap();
        let value = named_json(&doc.types[0], &mut RawNames, Some("com.example"));
        assert_eq!(value["namespace"], json!(""));
        let value = named_json(&doc.types[0], &mut RawNames, None);
        assert!(value.get("namespace").is_none());
    }
}
