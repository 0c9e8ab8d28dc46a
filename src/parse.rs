//! Schema and protocol documents (JSON notation) into unresolved declarations.
//!
//! A parser only looks at one document. Named types declared inline, at any
//! depth, are hoisted into the document's flat declaration list and replaced by
//! a by-name reference, so the resolver never needs to descend into field types
//! to find declarations.
pub mod names;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{CompileError, Result};
use crate::input::{ArtifactKind, InputArtifact};
use crate::ir::{Field, Logical, Message, Name, NameRef, NamedKind, NamedType, Primitive, Protocol, TypeRef};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// One parsed canonical document: a schema or a protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: PathBuf,
    /// Every named type declared anywhere in the document, nested ones first.
    pub types: Vec<NamedType<NameRef>>,
    pub protocol: Option<Protocol<NameRef>>,
    /// Top-level references that are not declarations (a schema file holding
    /// just `"com.example.Foo"`); the resolver checks them like field types.
    pub references: Vec<NameRef>,
}

#[derive(Debug, Deserialize)]
struct ProtocolJson {
    protocol: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    doc: Option<String>,
    #[serde(default)]
    types: Vec<Value>,
    #[serde(default)]
    messages: IndexMap<String, MessageJson>,
}

#[derive(Debug, Deserialize)]
struct MessageJson {
    #[serde(default)]
    doc: Option<String>,
    request: Vec<Value>,
    response: Value,
    #[serde(default)]
    errors: Vec<Value>,
    #[serde(default, rename = "one-way")]
    one_way: bool,
}

const NAMED_KEYS: &[&str] = &[
    "type", "name", "namespace", "doc", "aliases", "fields", "symbols", "size", "default", "logicalType",
    "precision", "scale",
];
const FIELD_KEYS: &[&str] = &["name", "type", "doc", "default", "aliases"];
const PROTOCOL_KEYS: &[&str] = &["protocol", "namespace", "doc", "types", "messages"];
const MESSAGE_KEYS: &[&str] = &["doc", "request", "response", "errors", "one-way"];
const LOGICAL_KEYS: &[&str] = &["type", "logicalType", "precision", "scale"];
const ARRAY_KEYS: &[&str] = &["type", "items"];
const MAP_KEYS: &[&str] = &["type", "values"];

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

pub fn parse_document(artifact: &InputArtifact) -> Result<Document> {
    match artifact.kind() {
        Some(ArtifactKind::Protocol) => parse_protocol(&artifact.path, &artifact.content),
        Some(ArtifactKind::Schema) => parse_schema(&artifact.path, &artifact.content),
        other => Err(CompileError::malformed(
            &artifact.path,
            format!("expected a schema or protocol document, found {other:?}"),
        )),
    }
}

pub fn parse_schema(file: &Path, src: &str) -> Result<Document> {
    let value = crate::path_de::parse_json(file, src)?;
    let mut parser = SchemaParser::new(file);
    let root = parser.parse_type(&value, None)?;
    let references = parser.dangling_roots(&root);
    Ok(Document { source: file.to_path_buf(), types: parser.finish(), protocol: None, references })
}

pub fn parse_protocol(file: &Path, src: &str) -> Result<Document> {
    let value = crate::path_de::parse_json(file, src)?;
    let props = value.as_object().map(|m| extra_props(m, PROTOCOL_KEYS)).unwrap_or_default();
    let mut message_props: IndexMap<String, IndexMap<String, Value>> = value
        .get("messages")
        .and_then(Value::as_object)
        .map(|messages| {
            messages
                .iter()
                .filter_map(|(k, m)| m.as_object().map(|m| (k.clone(), extra_props(m, MESSAGE_KEYS))))
                .collect()
        })
        .unwrap_or_default();
    let json: ProtocolJson = crate::path_de::from_value_with_path(file, value)?;

    let name = Name::new(&json.protocol, json.namespace.as_deref());
    names::check_name(file, &name)?;
    let scope = name.namespace.clone();
    let scope = scope.as_deref();

    let mut parser = SchemaParser::new(file);
    for ty in &json.types {
        let parsed = parser.parse_type(ty, scope)?;
        if !matches!(parsed, TypeRef::Named(_)) || !parser.declares_root(&parsed) {
            return Err(CompileError::malformed(
                file,
                format!("protocol {name} lists a type that is not a named type definition: {ty}"),
            ));
        }
    }

    let mut messages = Vec::with_capacity(json.messages.len());
    for (message_name, message) in json.messages {
        names::check_simple(file, "message", &message_name)?;
        let mut request = Vec::with_capacity(message.request.len());
        for param in &message.request {
            request.push(parser.parse_field(param, &format!("message {message_name}"), scope)?);
        }
        parser.check_unique_fields(&request, &format!("message {message_name}"))?;
        let response = parser.parse_type(&message.response, scope)?;
        let errors = message
            .errors
            .iter()
            .map(|e| parser.parse_type(e, scope))
            .collect::<Result<Vec<_>>>()?;
        if message.one_way && (!response.is_null() || !errors.is_empty()) {
            return Err(CompileError::malformed(
                file,
                format!("one-way message {message_name} must return null and declare no errors"),
            ));
        }
        let props = message_props.shift_remove(&message_name).unwrap_or_default();
        messages.push(Message {
            name: message_name,
            doc: message.doc,
            request,
            response,
            errors,
            one_way: message.one_way,
            props,
        });
    }

    let types = parser.finish();
    let protocol = Protocol {
        name,
        doc: json.doc,
        types: types.iter().map(|t| NameRef::new(t.name.full(), None)).collect(),
        messages,
        props,
    };
    Ok(Document { source: file.to_path_buf(), types, protocol: Some(protocol), references: Vec::new() })
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA PARSER
// ————————————————————————————————————————————————————————————————————————————

/// Walks schema JSON, hoisting inline named declarations into `types`.
pub(crate) struct SchemaParser<'a> {
    file: &'a Path,
    types: Vec<NamedType<NameRef>>,
}

impl<'a> SchemaParser<'a> {
    pub(crate) fn new(file: &'a Path) -> Self {
        Self { file, types: Vec::new() }
    }

    pub(crate) fn finish(self) -> Vec<NamedType<NameRef>> {
        self.types
    }

    fn malformed(&self, cause: impl Into<String>) -> CompileError {
        CompileError::malformed(self.file, cause)
    }

    fn declares_root(&self, root: &TypeRef<NameRef>) -> bool {
        match root {
            TypeRef::Named(r) => self.types.iter().any(|t| t.name.full() == r.raw),
            _ => false,
        }
    }

    fn dangling_roots(&self, root: &TypeRef<NameRef>) -> Vec<NameRef> {
        let arms = match root {
            TypeRef::Union(arms) => arms.iter().collect::<Vec<_>>(),
            other => vec![other],
        };
        arms.into_iter()
            .filter_map(|arm| match arm.bare() {
                TypeRef::Named(r) if !self.declares_root(arm.bare()) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn parse_type(&mut self, v: &Value, scope: Option<&str>) -> Result<TypeRef<NameRef>> {
        match v {
            Value::String(s) => Ok(match Primitive::from_name(s) {
                Some(p) => TypeRef::Primitive(p),
                None => TypeRef::Named(NameRef::new(s.as_str(), scope)),
            }),
            Value::Array(arms) => self.parse_union(arms, scope),
            Value::Object(map) => self.parse_object(map, scope),
            other => Err(self.malformed(format!("invalid type tag {other}"))),
        }
    }

    fn parse_union(&mut self, arms: &[Value], scope: Option<&str>) -> Result<TypeRef<NameRef>> {
        let mut out = Vec::with_capacity(arms.len());
        let mut seen = HashSet::new();
        for arm in arms {
            let parsed = self.parse_type(arm, scope)?;
            let Some(key) = union_key(&parsed) else {
                return Err(self.malformed("unions may not immediately contain other unions"));
            };
            if !seen.insert(key.clone()) {
                return Err(self.malformed(format!("duplicate {key} in union")));
            }
            out.push(parsed);
        }
        Ok(TypeRef::Union(out))
    }

    fn parse_object(&mut self, map: &Map<String, Value>, scope: Option<&str>) -> Result<TypeRef<NameRef>> {
        let tag = match map.get("type") {
            Some(Value::String(tag)) => tag.as_str(),
            Some(nested @ (Value::Object(_) | Value::Array(_))) => return self.parse_type(nested, scope),
            Some(other) => return Err(self.malformed(format!("invalid type tag {other}"))),
            None => return Err(self.malformed(format!("type object is missing \"type\": {}", Value::Object(map.clone())))),
        };
        match tag {
            "record" | "error" | "enum" | "fixed" => self.parse_named(tag, map, scope),
            "array" => {
                let items = map.get("items").ok_or_else(|| self.malformed("array type is missing \"items\""))?;
                let array = TypeRef::Array(Box::new(self.parse_type(items, scope)?));
                Ok(annotated(array, extra_props(map, ARRAY_KEYS)))
            }
            "map" => {
                let values = map.get("values").ok_or_else(|| self.malformed("map type is missing \"values\""))?;
                let map_type = TypeRef::Map(Box::new(self.parse_type(values, scope)?));
                Ok(annotated(map_type, extra_props(map, MAP_KEYS)))
            }
            other => match Primitive::from_name(other) {
                Some(base) => Ok(annotated(self.logical_over(map, base)?, extra_props(map, LOGICAL_KEYS))),
                None => Ok(annotated(TypeRef::Named(NameRef::new(other, scope)), extra_props(map, &["type"]))),
            },
        }
    }

    fn logical_over(&self, map: &Map<String, Value>, base: Primitive) -> Result<TypeRef<NameRef>> {
        let Some(name) = map.get("logicalType").and_then(Value::as_str) else {
            return Ok(TypeRef::Primitive(base));
        };
        let precision = self.bound(map, "precision")?;
        let scale = self.bound(map, "scale")?;
        Ok(match Logical::over(name, base, precision, scale).filter(valid_decimal) {
            Some(logical) => TypeRef::Logical(logical, base),
            None => {
                tracing::debug!(file = %self.file.display(), logical = name, "ignoring unsupported logical type");
                TypeRef::Primitive(base)
            }
        })
    }

    /// A decimal's `precision` or `scale`, which must fit in 32 bits.
    fn bound(&self, map: &Map<String, Value>, key: &str) -> Result<Option<u32>> {
        match map.get(key).and_then(Value::as_u64) {
            None => Ok(None),
            Some(n) => u32::try_from(n)
                .map(Some)
                .map_err(|_| self.malformed(format!("decimal {key} {n} is out of range"))),
        }
    }

    fn parse_named(&mut self, tag: &str, map: &Map<String, Value>, scope: Option<&str>) -> Result<TypeRef<NameRef>> {
        let raw_name = map
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| self.malformed(format!("{tag} is missing \"name\"")))?;
        let namespace = match map.get("namespace") {
            None => scope,
            Some(Value::String(ns)) => Some(ns.as_str()),
            Some(Value::Null) => None,
            Some(other) => return Err(self.malformed(format!("{tag} {raw_name} has invalid namespace {other}"))),
        };
        let name = Name::new(raw_name, namespace);
        names::check_name(self.file, &name)?;
        if self.types.iter().any(|t| t.name == name) {
            return Err(self.malformed(format!("{name} is declared twice in the same document")));
        }

        let doc = self.optional_str(map, "doc", &name)?;
        let aliases = self.string_list(map, "aliases", &name)?;
        let own_scope = name.namespace.clone();
        let kind = match tag {
            "record" | "error" => {
                let fields = match map.get("fields") {
                    Some(Value::Array(fields)) => fields,
                    _ => return Err(self.malformed(format!("record {name} is missing a \"fields\" array"))),
                };
                let owner = format!("record {name}");
                let mut parsed = Vec::with_capacity(fields.len());
                for field in fields {
                    parsed.push(self.parse_field(field, &owner, own_scope.as_deref())?);
                }
                self.check_unique_fields(&parsed, &owner)?;
                NamedKind::Record { fields: parsed, error: tag == "error" }
            }
            "enum" => {
                let symbols = match map.get("symbols") {
                    Some(Value::Array(_)) => self.string_list(map, "symbols", &name)?,
                    _ => return Err(self.malformed(format!("enum {name} is missing a \"symbols\" array"))),
                };
                let mut seen = HashSet::new();
                for symbol in &symbols {
                    names::check_simple(self.file, "enum symbol", symbol)?;
                    if !seen.insert(symbol) {
                        return Err(self.malformed(format!("enum {name} repeats symbol {symbol}")));
                    }
                }
                let default = self.optional_str(map, "default", &name)?;
                if let Some(d) = &default {
                    if !symbols.contains(d) {
                        return Err(self.malformed(format!("enum {name} default {d} is not one of its symbols")));
                    }
                }
                NamedKind::Enum { symbols, default }
            }
            _ => {
                let size = map
                    .get("size")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| self.malformed(format!("fixed {name} is missing a non-negative \"size\"")))?;
                let size = usize::try_from(size)
                    .map_err(|_| self.malformed(format!("fixed {name} size {size} is out of range")))?;
                let logical = match map.get("logicalType").and_then(Value::as_str) {
                    Some("decimal") => {
                        let precision = self.bound(map, "precision")?;
                        let scale = self.bound(map, "scale")?;
                        Logical::over("decimal", Primitive::Bytes, precision, scale).filter(valid_decimal)
                    }
                    _ => None,
                };
                NamedKind::Fixed { size, logical }
            }
        };

        let props = extra_props(map, NAMED_KEYS);
        self.types.push(NamedType { name: name.clone(), doc, aliases, kind, props });
        Ok(TypeRef::Named(NameRef::new(name.full(), None)))
    }

    pub(crate) fn parse_field(&mut self, v: &Value, owner: &str, scope: Option<&str>) -> Result<Field<NameRef>> {
        let map = v
            .as_object()
            .ok_or_else(|| self.malformed(format!("{owner} has a field that is not an object: {v}")))?;
        let name = map
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| self.malformed(format!("{owner} has a field missing \"name\"")))?
            .to_string();
        names::check_simple(self.file, "field", &name)?;
        let ty = map
            .get("type")
            .ok_or_else(|| self.malformed(format!("field {name:?} of {owner} is missing \"type\"")))?;
        let ty = self.parse_type(ty, scope)?;
        let doc = match map.get("doc") {
            Some(Value::String(d)) => Some(d.clone()),
            _ => None,
        };
        let aliases = match map.get("aliases") {
            Some(Value::Array(xs)) => xs.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            _ => Vec::new(),
        };
        if let Some(order) = map.get("order") {
            if !matches!(order.as_str(), Some("ascending" | "descending" | "ignore")) {
                return Err(self.malformed(format!("field {name:?} of {owner} has invalid order {order}")));
            }
        }
        Ok(Field {
            name,
            doc,
            ty,
            default: map.get("default").cloned(),
            aliases,
            props: extra_props(map, FIELD_KEYS),
        })
    }

    pub(crate) fn check_unique_fields(&self, fields: &[Field<NameRef>], owner: &str) -> Result<()> {
        let mut seen = HashSet::new();
        for field in fields {
            if !seen.insert(field.name.as_str()) {
                return Err(self.malformed(format!("{owner} declares field {} twice", field.name)));
            }
        }
        Ok(())
    }

    fn optional_str(&self, map: &Map<String, Value>, key: &str, owner: &Name) -> Result<Option<String>> {
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.malformed(format!("{owner}: \"{key}\" must be a string, found {other}"))),
        }
    }

    fn string_list(&self, map: &Map<String, Value>, key: &str, owner: &Name) -> Result<Vec<String>> {
        match map.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(xs)) => xs
                .iter()
                .map(|x| {
                    x.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.malformed(format!("{owner}: \"{key}\" must hold strings, found {x}")))
                })
                .collect(),
            Some(other) => Err(self.malformed(format!("{owner}: \"{key}\" must be an array, found {other}"))),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn valid_decimal(logical: &Logical) -> bool {
    match *logical {
        Logical::Decimal { precision, scale } => precision > 0 && scale <= precision,
        _ => true,
    }
}

/// What a union arm is told apart by; `None` for a nested union.
fn union_key(arm: &TypeRef<NameRef>) -> Option<String> {
    match arm {
        TypeRef::Union(_) => None,
        TypeRef::Primitive(p) | TypeRef::Logical(_, p) => Some(p.name().to_string()),
        TypeRef::Array(_) => Some("array".to_string()),
        TypeRef::Map(_) => Some("map".to_string()),
        TypeRef::Named(r) => Some(r.candidates().0.full()),
        TypeRef::Annotated(inner, _) => union_key(inner),
    }
}

fn annotated(ty: TypeRef<NameRef>, props: IndexMap<String, Value>) -> TypeRef<NameRef> {
    if props.is_empty() { ty } else { TypeRef::Annotated(Box::new(ty), props) }
}

fn extra_props(map: &Map<String, Value>, reserved: &[&str]) -> IndexMap<String, Value> {
    map.iter()
        .filter(|(k, _)| !reserved.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn schema(src: &str) -> Result<Document> {
        parse_schema(Path::new("test.avsc"), src)
    }

    #[test]
    fn record_with_nullable_field() {
        let doc = schema(
            r#"{"namespace": "com.example", "type": "record", "name": "Dummy",
                "fields": [{"name": "id", "type": "int"}, {"name": "age", "type": ["null", "int"]}]}"#,
        )
        .unwrap();
        assert_eq!(doc.types.len(), 1);
        let dummy = &doc.types[0];
        assert_eq!(dummy.name.full(), "com.example.Dummy");
        let fields = dummy.fields();
        assert_eq!(fields[0].ty, TypeRef::Primitive(Primitive::Int));
        assert!(fields[1].ty.is_nullable());
        assert!(doc.references.is_empty());
    }

    #[test]
    fn inline_named_types_are_hoisted_with_inherited_namespace() {
        let doc = schema(
            r#"{"namespace": "com.example", "type": "record", "name": "Outer", "fields": [
                {"name": "inner", "type": {"type": "record", "name": "Inner", "fields": [
                    {"name": "color", "type": {"type": "enum", "name": "Color", "symbols": ["RED", "BLUE"]}}
                ]}},
                {"name": "again", "type": "Inner"}
            ]}"#,
        )
        .unwrap();
        let names: Vec<_> = doc.types.iter().map(|t| t.name.full()).collect();
        assert_eq!(names, ["com.example.Color", "com.example.Inner", "com.example.Outer"]);
        let outer = &doc.types[2];
        assert_eq!(outer.fields()[1].ty, TypeRef::Named(NameRef::new("Inner", Some("com.example"))));
    }

    #[test]
    fn missing_field_type_is_malformed() {
        let err = schema(
            r#"{"namespace": "com.example", "type": "record", "name": "Broken",
                "fields": [{"name": "id", "type": "int"}, {"name": "invalid"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDefinition);
        let msg = err.to_string();
        assert!(msg.contains("invalid") && msg.contains("missing"), "{msg}");
        assert!(msg.contains("test.avsc"), "{msg}");
    }

    #[test]
    fn unparsable_json_and_bad_tags_are_malformed() {
        assert_eq!(schema("{ not json").unwrap_err().kind(), ErrorKind::MalformedDefinition);
        assert_eq!(schema("42").unwrap_err().kind(), ErrorKind::MalformedDefinition);
        let err = schema(r#"{"type": "array"}"#).unwrap_err();
        assert!(err.to_string().contains("items"));
        let err = schema(r#"["null", ["int", "long"]]"#).unwrap_err();
        assert!(err.to_string().contains("unions"));
        let err = schema(r#"["int", "int"]"#).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn enum_default_must_be_a_symbol() {
        let err = schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B"], "default": "C"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDefinition);
        let doc = schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B"], "default": "B"}"#).unwrap();
        assert!(matches!(&doc.types[0].kind, NamedKind::Enum { default: Some(d), .. } if d == "B"));
    }

    #[test]
    fn logical_types_and_decimal_fixed() {
        let doc = schema(
            r#"{"type": "record", "name": "Money", "fields": [
                {"name": "amount", "type": {"type": "bytes", "logicalType": "decimal", "precision": 9, "scale": 2}},
                {"name": "when", "type": {"type": "long", "logicalType": "timestamp-millis"}},
                {"name": "odd", "type": {"type": "string", "logicalType": "not-a-thing"}},
                {"name": "raw", "type": {"type": "fixed", "name": "Raw", "size": 8, "logicalType": "decimal", "precision": 12}}
            ]}"#,
        )
        .unwrap();
        let money = doc.types.iter().find(|t| t.name.name == "Money").unwrap();
        let fields = money.fields();
        assert_eq!(fields[0].ty, TypeRef::Logical(Logical::Decimal { precision: 9, scale: 2 }, Primitive::Bytes));
        assert_eq!(fields[1].ty, TypeRef::Logical(Logical::TimestampMillis, Primitive::Long));
        assert_eq!(fields[2].ty, TypeRef::Primitive(Primitive::String));
        let raw = doc.types.iter().find(|t| t.name.name == "Raw").unwrap();
        assert!(matches!(raw.kind, NamedKind::Fixed { size: 8, logical: Some(Logical::Decimal { precision: 12, scale: 0 }) }));
    }

    #[test]
    fn oversized_decimal_bounds_are_malformed() {
        let err = schema(r#"{"type": "bytes", "logicalType": "decimal", "precision": 4294967305, "scale": 2}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDefinition);
        assert!(err.to_string().contains("precision 4294967305"), "{err}");
        let err = schema(
            r#"{"type": "fixed", "name": "F", "size": 16, "logicalType": "decimal", "precision": 9, "scale": 4294967298}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("scale 4294967298"), "{err}");
    }

    #[test]
    fn custom_attributes_on_unnamed_types_and_messages_are_kept() {
        let doc = schema(
            r#"{"type": "record", "name": "R", "fields": [
                {"name": "s", "type": {"type": "string", "avro.java.string": "String"}},
                {"name": "xs", "type": {"type": "array", "items": "int", "java-class": "java.util.ArrayList"}},
                {"name": "plain", "type": {"type": "long"}}
            ]}"#,
        )
        .unwrap();
        let fields = doc.types[0].fields();
        match &fields[0].ty {
            TypeRef::Annotated(inner, props) => {
                assert_eq!(**inner, TypeRef::Primitive(Primitive::String));
                assert_eq!(props["avro.java.string"], "String");
            }
            other => panic!("expected annotations, found {other:?}"),
        }
        assert!(matches!(fields[1].ty.bare(), TypeRef::Array(_)));
        assert_eq!(fields[2].ty, TypeRef::Primitive(Primitive::Long));

        let doc = parse_protocol(
            Path::new("svc.avpr"),
            r#"{"protocol": "P", "messages": {"m": {"request": [], "response": "null", "retries": 3}}}"#,
        )
        .unwrap();
        assert_eq!(doc.protocol.unwrap().messages[0].props["retries"], 3);
    }

    #[test]
    fn bare_reference_schema_is_recorded() {
        let doc = schema(r#""com.example.Elsewhere""#).unwrap();
        assert!(doc.types.is_empty());
        assert_eq!(doc.references, vec![NameRef::new("com.example.Elsewhere", None)]);
    }

    #[test]
    fn protocol_with_messages() {
        let doc = parse_protocol(
            Path::new("svc.avpr"),
            r#"{
              "protocol": "UserService", "namespace": "com.example.avro",
              "types": [
                {"type": "record", "name": "User", "fields": [{"name": "id", "type": "string"}]},
                {"type": "error", "name": "NotFound", "fields": [{"name": "message", "type": "string"}]}
              ],
              "messages": {
                "getUser": {"request": [{"name": "id", "type": "string"}], "response": "User", "errors": ["NotFound"]},
                "ping": {"request": [], "response": "null", "one-way": true}
              }
            }"#,
        )
        .unwrap();
        let protocol = doc.protocol.unwrap();
        assert_eq!(protocol.name.full(), "com.example.avro.UserService");
        assert_eq!(protocol.types.len(), 2);
        assert_eq!(protocol.messages.len(), 2);
        let get = &protocol.messages[0];
        assert_eq!(get.name, "getUser");
        assert_eq!(get.response, TypeRef::Named(NameRef::new("User", Some("com.example.avro"))));
        assert!(protocol.messages[1].one_way);
    }

    #[test]
    fn protocol_message_missing_response_reports_path() {
        let err = parse_protocol(
            Path::new("svc.avpr"),
            r#"{"protocol": "P", "messages": {"m": {"request": []}}}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDefinition);
        assert!(err.to_string().contains("messages.m"), "{err}");
    }

    #[test]
    fn protocol_with_malformed_type_fails() {
        let err = parse_protocol(
            Path::new("malformed.avpr"),
            r#"{"protocol": "BrokenService", "namespace": "com.example", "types": [
                {"type": "record", "name": "Broken", "fields": [{"name": "id", "type": "string"}, {"name": "data"}]}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
