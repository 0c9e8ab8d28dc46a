//! Recursive-descent parser for IDL files.
//!
//! Produces declarations in the shared unresolved model. Imports are *not*
//! followed here; they come back as [`Item::Import`] in source order and the
//! normalizer expands them.
use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::lexer::{self, Tok, Token};
use crate::error::{CompileError, Result};
use crate::ir::{Field, Logical, Message, Name, NameRef, NamedKind, NamedType, Primitive, TypeRef};
use crate::parse::names;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub struct IdlFile {
    /// From a `namespace x;` statement.
    pub namespace: Option<String>,
    pub protocol: Option<ProtocolBody>,
    /// Top-level items of a file without a protocol block.
    pub items: Vec<Item>,
    /// From a `schema T;` statement.
    pub main_schema: Option<TypeRef<NameRef>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolBody {
    pub name: Name,
    pub doc: Option<String>,
    pub props: IndexMap<String, Value>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Type(NamedType<NameRef>),
    Message(Message<NameRef>),
    Import(Import),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Idl,
    Protocol,
    Schema,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub kind: ImportKind,
    pub path: String,
    pub line: usize,
    pub col: usize,
}

struct Parser<'a> {
    file: &'a Path,
    tokens: Vec<Token>,
    pos: usize,
}

/// A parsed type plus whether it came from the `T?` shorthand.
struct FullType {
    ty: TypeRef<NameRef>,
    shorthand_optional: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

pub fn parse(file: &Path, src: &str) -> Result<IdlFile> {
    let tokens = lexer::tokenize(src).map_err(|e| {
        CompileError::malformed(file, format!("line {}, column {}: {}", e.line, e.col, e.message))
    })?;
    Parser { file, tokens, pos: 0 }.file()
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Parser<'_> {
    // ---------------------------- token plumbing ---------------------------- //

    fn peek(&self) -> &Token {
        // tokenize always ends with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl AsRef<str>) -> CompileError {
        let at = self.peek();
        CompileError::malformed(self.file, format!("line {}, column {}: {}", at.line, at.col, message.as_ref()))
    }

    fn describe(tok: &Tok) -> String {
        match tok {
            Tok::Ident { text, .. } => format!("`{text}`"),
            Tok::Str(s) => format!("string {s:?}"),
            Tok::Number(n) => format!("number {n}"),
            Tok::Punct(c) => format!("'{c}'"),
            Tok::Eof => "end of file".to_string(),
        }
    }

    fn is_punct(&self, c: char) -> bool {
        self.peek().tok == Tok::Punct(c)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.is_punct(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}', found {}", Self::describe(&self.peek().tok))))
        }
    }

    /// Unescaped identifier equal to `kw`.
    fn is_keyword(&self, kw: &str) -> bool {
        matches!(&self.peek().tok, Tok::Ident { text, escaped: false } if text == kw)
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.peek().tok.clone() {
            Tok::Ident { text, .. } => {
                self.bump();
                Ok(text)
            }
            other => Err(self.error(format!("expected a name, found {}", Self::describe(&other)))),
        }
    }

    fn string(&mut self) -> Result<String> {
        match self.peek().tok.clone() {
            Tok::Str(s) => {
                self.bump();
                Ok(s)
            }
            other => Err(self.error(format!("expected a string, found {}", Self::describe(&other)))),
        }
    }

    fn integer(&mut self) -> Result<u64> {
        match self.peek().tok.clone() {
            Tok::Number(n) => match n.parse::<u64>() {
                Ok(v) => {
                    self.bump();
                    Ok(v)
                }
                Err(_) => Err(self.error(format!("expected a non-negative integer, found {n}"))),
            },
            other => Err(self.error(format!("expected an integer, found {}", Self::describe(&other)))),
        }
    }

    fn integer_u32(&mut self, what: &str) -> Result<u32> {
        let n = self.integer()?;
        u32::try_from(n).map_err(|_| self.error(format!("{what} {n} is out of range")))
    }

    fn take_u32(&self, props: &mut IndexMap<String, Value>, key: &str) -> Result<Option<u32>> {
        match props.shift_remove(key).and_then(|v| v.as_u64()) {
            None => Ok(None),
            Some(n) => u32::try_from(n)
                .map(Some)
                .map_err(|_| self.error(format!("decimal {key} {n} is out of range"))),
        }
    }

    // ------------------------------ structure ------------------------------- //

    fn file(mut self) -> Result<IdlFile> {
        let mut out = IdlFile { namespace: None, protocol: None, items: Vec::new(), main_schema: None };
        while self.peek().tok != Tok::Eof {
            let doc = self.peek().doc.clone();
            let props = self.annotations()?;
            let doc = doc.or_else(|| self.peek().doc.clone());
            if self.eat_keyword("namespace") {
                out.namespace = Some(self.ident()?);
                self.expect_punct(';')?;
            } else if self.is_keyword("protocol") {
                if out.protocol.is_some() {
                    return Err(self.error("a file may declare only one protocol"));
                }
                out.protocol = Some(self.protocol(doc, props, out.namespace.clone())?);
            } else if self.is_keyword("import") {
                out.items.push(Item::Import(self.import()?));
            } else if self.eat_keyword("schema") {
                let scope = out.namespace.clone();
                out.main_schema = Some(self.full_type(scope.as_deref())?.ty);
                self.expect_punct(';')?;
            } else if self.at_named_decl() {
                let ns = out.namespace.clone();
                out.items.push(Item::Type(self.named(doc, props, ns.as_deref())?));
            } else {
                return Err(self.error(format!(
                    "expected `protocol`, `namespace`, `import` or a type declaration, found {}",
                    Self::describe(&self.peek().tok)
                )));
            }
        }
        Ok(out)
    }

    fn protocol(&mut self, doc: Option<String>, mut props: IndexMap<String, Value>, ns: Option<String>) -> Result<ProtocolBody> {
        self.bump(); // `protocol`
        let raw = self.ident()?;
        let namespace = take_string(&mut props, "namespace").or(ns);
        let name = Name::new(&raw, namespace.as_deref());
        names::check_name(self.file, &name)?;
        let scope = name.namespace.clone();

        self.expect_punct('{')?;
        let mut items = Vec::new();
        while !self.eat_punct('}') {
            if self.peek().tok == Tok::Eof {
                return Err(self.error(format!("protocol {name} is not closed")));
            }
            let item_doc = self.peek().doc.clone();
            let item_props = self.annotations()?;
            let item_doc = item_doc.or_else(|| self.peek().doc.clone());
            if self.is_keyword("import") {
                items.push(Item::Import(self.import()?));
            } else if self.at_named_decl() {
                items.push(Item::Type(self.named(item_doc, item_props, scope.as_deref())?));
            } else {
                items.push(Item::Message(self.message(item_doc, item_props, scope.as_deref())?));
            }
        }
        Ok(ProtocolBody { name, doc, props, items })
    }

    fn import(&mut self) -> Result<Import> {
        let (line, col) = (self.peek().line, self.peek().col);
        self.bump(); // `import`
        let kind = match self.ident()?.as_str() {
            "idl" => ImportKind::Idl,
            "protocol" => ImportKind::Protocol,
            "schema" => ImportKind::Schema,
            other => return Err(self.error(format!("unknown import kind `{other}`"))),
        };
        let path = self.string()?;
        self.expect_punct(';')?;
        Ok(Import { kind, path, line, col })
    }

    fn at_named_decl(&self) -> bool {
        ["record", "error", "enum", "fixed"].iter().any(|kw| self.is_keyword(kw))
    }

    fn named(&mut self, doc: Option<String>, mut props: IndexMap<String, Value>, ns: Option<&str>) -> Result<NamedType<NameRef>> {
        let keyword = self.ident()?;
        let raw = self.ident()?;
        let namespace = take_string(&mut props, "namespace");
        let name = Name::new(&raw, namespace.as_deref().or(ns));
        names::check_name(self.file, &name)?;
        let aliases = take_strings(&mut props, "aliases");
        let own_scope = name.namespace.clone();

        let kind = match keyword.as_str() {
            "record" | "error" => {
                self.expect_punct('{')?;
                let mut fields: Vec<Field<NameRef>> = Vec::new();
                while !self.eat_punct('}') {
                    if self.peek().tok == Tok::Eof {
                        return Err(self.error(format!("record {name} is not closed")));
                    }
                    fields.extend(self.field_decl(own_scope.as_deref())?);
                }
                let mut seen = HashSet::new();
                for field in &fields {
                    if !seen.insert(field.name.clone()) {
                        return Err(self.error(format!("record {name} declares field {} twice", field.name)));
                    }
                }
                NamedKind::Record { fields, error: keyword == "error" }
            }
            "enum" => {
                self.expect_punct('{')?;
                let mut symbols = Vec::new();
                while !self.eat_punct('}') {
                    let symbol = self.ident()?;
                    names::check_simple(self.file, "enum symbol", &symbol)?;
                    if symbols.contains(&symbol) {
                        return Err(self.error(format!("enum {name} repeats symbol {symbol}")));
                    }
                    symbols.push(symbol);
                    if !self.eat_punct(',') {
                        self.expect_punct('}')?;
                        break;
                    }
                }
                let default = if self.eat_punct('=') {
                    let d = self.ident()?;
                    self.expect_punct(';')?;
                    if !symbols.contains(&d) {
                        return Err(self.error(format!("enum {name} default {d} is not one of its symbols")));
                    }
                    Some(d)
                } else {
                    None
                };
                NamedKind::Enum { symbols, default }
            }
            _ => {
                self.expect_punct('(')?;
                let size = self.integer()?;
                let size = usize::try_from(size).map_err(|_| self.error(format!("fixed {name} size {size} is out of range")))?;
                self.expect_punct(')')?;
                self.expect_punct(';')?;
                let logical = match take_string(&mut props, "logicalType").as_deref() {
                    Some("decimal") => {
                        let precision = self.take_u32(&mut props, "precision")?;
                        let scale = self.take_u32(&mut props, "scale")?;
                        Logical::over("decimal", Primitive::Bytes, precision, scale)
                    }
                    _ => None,
                };
                NamedKind::Fixed { size, logical }
            }
        };
        Ok(NamedType { name, doc, aliases, kind, props })
    }

    /// `type a [= default], b [= default];`
    fn field_decl(&mut self, scope: Option<&str>) -> Result<Vec<Field<NameRef>>> {
        let doc = self.peek().doc.clone();
        let full = self.full_type(scope)?;
        let mut out = Vec::new();
        loop {
            out.push(self.variable(&full, doc.clone())?);
            if !self.eat_punct(',') {
                self.expect_punct(';')?;
                return Ok(out);
            }
        }
    }

    fn variable(&mut self, full: &FullType, doc: Option<String>) -> Result<Field<NameRef>> {
        let var_doc = self.peek().doc.clone();
        let mut props = self.annotations()?;
        let name = self.ident()?;
        names::check_simple(self.file, "field", &name)?;
        let default = if self.eat_punct('=') { Some(self.json_value()?) } else { None };

        // `T? x = <non-null>` puts the default's branch first
        let mut ty = full.ty.clone();
        if full.shorthand_optional && default.as_ref().is_some_and(|d| !d.is_null()) {
            if let TypeRef::Union(arms) = &mut ty {
                arms.reverse();
            }
        }
        if let Some(order) = props.get("order") {
            if !matches!(order.as_str(), Some("ascending" | "descending" | "ignore")) {
                return Err(self.error(format!("field {name} has invalid order {order}")));
            }
        }
        let aliases = take_strings(&mut props, "aliases");
        Ok(Field { name, doc: var_doc.or(doc), ty, default, aliases, props })
    }

    fn message(
        &mut self,
        doc: Option<String>,
        props: IndexMap<String, Value>,
        scope: Option<&str>,
    ) -> Result<Message<NameRef>> {
        let response = if self.eat_keyword("void") {
            TypeRef::Primitive(Primitive::Null)
        } else {
            self.full_type(scope)?.ty
        };
        let name = self.ident()?;
        names::check_simple(self.file, "message", &name)?;

        self.expect_punct('(')?;
        let mut request = Vec::new();
        if !self.eat_punct(')') {
            loop {
                let param_doc = self.peek().doc.clone();
                let full = self.full_type(scope)?;
                request.push(self.variable(&full, param_doc)?);
                if !self.eat_punct(',') {
                    self.expect_punct(')')?;
                    break;
                }
            }
        }

        let mut errors = Vec::new();
        let mut one_way = false;
        if self.eat_keyword("oneway") {
            one_way = true;
            if !response.is_null() {
                return Err(self.error(format!("one-way message {name} must return void")));
            }
        } else if self.eat_keyword("throws") {
            loop {
                let raw = self.ident()?;
                errors.push(TypeRef::Named(NameRef::new(raw, scope)));
                if !self.eat_punct(',') {
                    break;
                }
            }
        }
        self.expect_punct(';')?;
        Ok(Message { name, doc, request, response, errors, one_way, props })
    }

    // -------------------------------- types --------------------------------- //

    fn full_type(&mut self, scope: Option<&str>) -> Result<FullType> {
        let mut props = self.annotations()?;
        let mut ty = self.plain_type(scope)?;
        if let (TypeRef::Primitive(base), Some(logical)) = (&ty, take_string(&mut props, "logicalType")) {
            let precision = self.take_u32(&mut props, "precision")?;
            let scale = self.take_u32(&mut props, "scale")?;
            if let Some(l) = Logical::over(&logical, *base, precision, scale) {
                ty = TypeRef::Logical(l, *base);
            }
        }
        if !props.is_empty() {
            if matches!(ty, TypeRef::Union(_)) {
                tracing::debug!(file = %self.file.display(), ?props, "dropping annotations on a union");
            } else {
                ty = TypeRef::Annotated(Box::new(ty), props);
            }
        }
        if self.eat_punct('?') {
            if ty.is_nullable() {
                return Ok(FullType { ty, shorthand_optional: false });
            }
            let arms = match ty {
                TypeRef::Union(arms) => {
                    let mut all = vec![TypeRef::Primitive(Primitive::Null)];
                    all.extend(arms);
                    all
                }
                other => vec![TypeRef::Primitive(Primitive::Null), other],
            };
            return Ok(FullType { ty: TypeRef::Union(arms), shorthand_optional: true });
        }
        Ok(FullType { ty, shorthand_optional: false })
    }

    fn plain_type(&mut self, scope: Option<&str>) -> Result<TypeRef<NameRef>> {
        let (text, escaped) = match self.peek().tok.clone() {
            Tok::Ident { text, escaped } => (text, escaped),
            other => return Err(self.error(format!("expected a type, found {}", Self::describe(&other)))),
        };
        self.bump();
        if escaped {
            return Ok(TypeRef::Named(NameRef::new(text, scope)));
        }
        Ok(match text.as_str() {
            "array" => {
                self.expect_punct('<')?;
                let item = self.full_type(scope)?.ty;
                self.expect_punct('>')?;
                TypeRef::Array(Box::new(item))
            }
            "map" => {
                self.expect_punct('<')?;
                let value = self.full_type(scope)?.ty;
                self.expect_punct('>')?;
                TypeRef::Map(Box::new(value))
            }
            "union" => {
                self.expect_punct('{')?;
                let mut arms = Vec::new();
                loop {
                    let arm = self.full_type(scope)?.ty;
                    if matches!(arm, TypeRef::Union(_)) {
                        return Err(self.error("unions may not immediately contain other unions"));
                    }
                    arms.push(arm);
                    if !self.eat_punct(',') {
                        break;
                    }
                }
                self.expect_punct('}')?;
                TypeRef::Union(arms)
            }
            "decimal" => {
                self.expect_punct('(')?;
                let precision = self.integer_u32("decimal precision")?;
                self.expect_punct(',')?;
                let scale = self.integer_u32("decimal scale")?;
                self.expect_punct(')')?;
                if precision == 0 || scale > precision {
                    return Err(self.error(format!("invalid decimal({precision},{scale})")));
                }
                TypeRef::Logical(Logical::Decimal { precision, scale }, Primitive::Bytes)
            }
            "date" => TypeRef::Logical(Logical::Date, Primitive::Int),
            "time_ms" => TypeRef::Logical(Logical::TimeMillis, Primitive::Int),
            "timestamp_ms" => TypeRef::Logical(Logical::TimestampMillis, Primitive::Long),
            "local_timestamp_ms" => TypeRef::Logical(Logical::LocalTimestampMillis, Primitive::Long),
            "uuid" => TypeRef::Logical(Logical::Uuid, Primitive::String),
            "void" => return Err(self.error("`void` is only allowed as a message result")),
            other => match Primitive::from_name(other) {
                Some(p) => TypeRef::Primitive(p),
                None => TypeRef::Named(NameRef::new(other, scope)),
            },
        })
    }

    // ----------------------------- annotations ------------------------------ //

    /// `@name(json)` repeated.
    fn annotations(&mut self) -> Result<IndexMap<String, Value>> {
        let mut props = IndexMap::new();
        while self.eat_punct('@') {
            let key = self.ident()?;
            self.expect_punct('(')?;
            let value = self.json_value()?;
            self.expect_punct(')')?;
            props.insert(key, value);
        }
        Ok(props)
    }

    fn json_value(&mut self) -> Result<Value> {
        match self.peek().tok.clone() {
            Tok::Str(s) => {
                self.bump();
                Ok(Value::String(s))
            }
            Tok::Number(n) => {
                let v = serde_json::from_str::<Value>(&n).map_err(|_| self.error(format!("malformed number {n}")))?;
                self.bump();
                Ok(v)
            }
            Tok::Ident { text, escaped: false } if matches!(text.as_str(), "true" | "false" | "null") => {
                self.bump();
                Ok(match text.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    _ => Value::Null,
                })
            }
            Tok::Punct('[') => {
                self.bump();
                let mut items = Vec::new();
                while !self.eat_punct(']') {
                    items.push(self.json_value()?);
                    if !self.eat_punct(',') {
                        self.expect_punct(']')?;
                        break;
                    }
                }
                Ok(Value::Array(items))
            }
            Tok::Punct('{') => {
                self.bump();
                let mut map = Map::new();
                while !self.eat_punct('}') {
                    let key = self.string()?;
                    self.expect_punct(':')?;
                    map.insert(key, self.json_value()?);
                    if !self.eat_punct(',') {
                        self.expect_punct('}')?;
                        break;
                    }
                }
                Ok(Value::Object(map))
            }
            other => Err(self.error(format!("expected a JSON value, found {}", Self::describe(&other)))),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn take_string(props: &mut IndexMap<String, Value>, key: &str) -> Option<String> {
    match props.shift_remove(key)? {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn take_strings(props: &mut IndexMap<String, Value>, key: &str) -> Vec<String> {
    match props.shift_remove(key) {
        Some(Value::Array(xs)) => xs.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn idl(src: &str) -> Result<IdlFile> {
        parse(Path::new("test.avdl"), src)
    }

    fn protocol(src: &str) -> ProtocolBody {
        idl(src).unwrap().protocol.expect("protocol")
    }

    fn types(body: &ProtocolBody) -> Vec<&NamedType<NameRef>> {
        body.items.iter().filter_map(|i| match i { Item::Type(t) => Some(t), _ => None }).collect()
    }

    fn messages(body: &ProtocolBody) -> Vec<&Message<NameRef>> {
        body.items.iter().filter_map(|i| match i { Item::Message(m) => Some(m), _ => None }).collect()
    }

    #[test]
    fn protocol_with_record_and_message() {
        let body = protocol(
            r#"
            /** User lookups. */
            @namespace("com.example.avro")
            protocol UserService {
                /** A user. */
                record User {
                    string id;
                    union { null, int } age = null;
                    array<string> tags = [];
                }
                User getUser(string id);
            }
            "#,
        );
        assert_eq!(body.name.full(), "com.example.avro.UserService");
        assert_eq!(body.doc.as_deref(), Some("User lookups."));
        let user = types(&body)[0];
        assert_eq!(user.name.full(), "com.example.avro.User");
        assert_eq!(user.doc.as_deref(), Some("A user."));
        let fields = user.fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].default, Some(Value::Null));
        assert_eq!(fields[2].default, Some(Value::Array(vec![])));
        let get = messages(&body)[0];
        assert_eq!(get.name, "getUser");
        assert_eq!(get.response, TypeRef::Named(NameRef::new("User", Some("com.example.avro"))));
        assert_eq!(get.request[0].ty, TypeRef::Primitive(Primitive::String));
    }

    #[test]
    fn enums_fixed_errors_and_message_modifiers() {
        let body = protocol(
            r#"
            protocol P {
                enum Suit { SPADES, HEARTS, } = HEARTS;
                @logicalType("decimal") @precision(10) @scale(2) fixed Money(8);
                error Oops { string message; }
                void ping() oneway;
                int risky(int a, long b = 3) throws Oops;
            }
            "#,
        );
        let ts = types(&body);
        assert!(matches!(&ts[0].kind, NamedKind::Enum { symbols, default: Some(d) } if symbols.len() == 2 && d == "HEARTS"));
        assert!(matches!(ts[1].kind, NamedKind::Fixed { size: 8, logical: Some(Logical::Decimal { precision: 10, scale: 2 }) }));
        assert!(matches!(ts[2].kind, NamedKind::Record { error: true, .. }));
        let ms = messages(&body);
        assert!(ms[0].one_way);
        assert!(ms[0].response.is_null());
        assert_eq!(ms[1].request[1].default, Some(serde_json::json!(3)));
        assert_eq!(ms[1].errors, vec![TypeRef::Named(NameRef::new("Oops", None))]);
    }

    #[test]
    fn optional_shorthand_and_logical_keywords() {
        let body = protocol(
            r#"
            protocol P {
                record R {
                    int? a;
                    string? b = "x";
                    decimal(9, 2) price;
                    timestamp_ms at;
                    @logicalType("timestamp-micros") long micros;
                    R? next;
                    long @order("descending") `error`, c = 1;
                }
            }
            "#,
        );
        let fields = types(&body)[0].fields();
        let int = TypeRef::Primitive(Primitive::Int);
        let null = TypeRef::Primitive(Primitive::Null);
        assert_eq!(fields[0].ty, TypeRef::Union(vec![null.clone(), int]));
        assert_eq!(fields[1].ty, TypeRef::Union(vec![TypeRef::Primitive(Primitive::String), null]));
        assert_eq!(fields[2].ty, TypeRef::Logical(Logical::Decimal { precision: 9, scale: 2 }, Primitive::Bytes));
        assert_eq!(fields[3].ty, TypeRef::Logical(Logical::TimestampMillis, Primitive::Long));
        assert_eq!(fields[4].ty, TypeRef::Logical(Logical::TimestampMicros, Primitive::Long));
        assert!(fields[5].ty.is_nullable());
        assert_eq!(fields[6].name, "error");
        assert_eq!(fields[6].props.get("order"), Some(&Value::String("descending".into())));
        assert_eq!(fields[7].name, "c");
        assert!(fields[7].props.is_empty());
    }

    #[test]
    fn message_and_type_annotations_are_kept() {
        let body = protocol(
            r#"
            protocol P {
                record R { @java-class("java.util.ArrayList") array<int> xs; @custom(1) string? s; }
                @retries(3) @idempotent(true) R fetch(@avro.java.string("String") string key);
            }
            "#,
        );
        let fields = types(&body)[0].fields();
        match &fields[0].ty {
            TypeRef::Annotated(inner, props) => {
                assert!(matches!(**inner, TypeRef::Array(_)));
                assert_eq!(props["java-class"], "java.util.ArrayList");
            }
            other => panic!("expected annotations, found {other:?}"),
        }
        assert!(fields[1].ty.is_nullable());
        let fetch = messages(&body)[0];
        assert_eq!(fetch.props["retries"], 3);
        assert_eq!(fetch.props["idempotent"], true);
        assert!(matches!(&fetch.request[0].ty, TypeRef::Annotated(_, props) if props["avro.java.string"] == "String"));
    }

    #[test]
    fn oversized_integers_are_rejected() {
        let err = idl("protocol P { record R { decimal(4294967305, 2) d; } }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDefinition);
        assert!(err.to_string().contains("decimal precision 4294967305"), "{err}");
        let err = idl(r#"protocol P { @logicalType("decimal") @precision(9) @scale(4294967298) fixed F(16); }"#).unwrap_err();
        assert!(err.to_string().contains("decimal scale 4294967298"), "{err}");
    }

    #[test]
    fn imports_are_collected_in_order() {
        let body = protocol(
            r#"protocol P { import idl "common.avdl"; record A { int x; } import schema "b.avsc"; }"#,
        );
        let kinds: Vec<_> = body
            .items
            .iter()
            .map(|i| match i {
                Item::Import(imp) => format!("{:?}:{}", imp.kind, imp.path),
                Item::Type(t) => t.name.full(),
                Item::Message(m) => m.name.clone(),
            })
            .collect();
        assert_eq!(kinds, ["Idl:common.avdl", "A", "Schema:b.avsc"]);
    }

    #[test]
    fn schema_only_file_has_no_protocol() {
        let file = idl("namespace com.example; schema Thing; record Thing { int x; }").unwrap();
        assert!(file.protocol.is_none());
        assert_eq!(file.namespace.as_deref(), Some("com.example"));
        assert_eq!(file.items.len(), 1);
        assert!(file.main_schema.is_some());
    }

    #[test]
    fn syntax_errors_are_malformed_with_position() {
        let err = idl("protocol P {\n  record R { int }\n}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDefinition);
        assert!(err.to_string().contains("line 2"), "{err}");

        let err = idl("protocol P { record R { int x; }").unwrap_err();
        assert!(err.to_string().contains("not closed"), "{err}");

        let err = idl("protocol P { enum E { A } = B; }").unwrap_err();
        assert!(err.to_string().contains("default"), "{err}");
    }
}
