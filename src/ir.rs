// Strongly-typed model shared by every stage. Generic over how named types are
// referenced: `NameRef` straight out of a parser, `TypeId` once resolved.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

// ————————————————————————————————————————————————————————————————————————————
// NAMES
// ————————————————————————————————————————————————————————————————————————————

/// Fully-qualified name of a named type or protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    pub namespace: Option<String>,
    pub name: String,
}

/// A reference exactly as written, plus the namespace it was written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameRef {
    pub raw: String,
    pub scope: Option<String>,
}

/// Index into the type graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl Name {
    /// A dotted `name` carries its own namespace; otherwise `namespace` applies.
    pub fn new(name: &str, namespace: Option<&str>) -> Self {
        match name.rsplit_once('.') {
            Some((ns, short)) => Name {
                namespace: (!ns.is_empty()).then(|| ns.to_string()),
                name: short.to_string(),
            },
            None => Name {
                namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
                name: name.to_string(),
            },
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn full(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl NameRef {
    pub fn new(raw: impl Into<String>, scope: Option<&str>) -> Self {
        Self { raw: raw.into(), scope: scope.filter(|s| !s.is_empty()).map(str::to_string) }
    }

    /// Primary lookup key, then the null-namespace fallback for bare names.
    pub fn candidates(&self) -> (Name, Option<Name>) {
        let primary = Name::new(&self.raw, self.scope.as_deref());
        let fallback = (!self.raw.contains('.') && self.scope.is_some()).then(|| Name::new(&self.raw, None));
        (primary, fallback)
    }
}

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE REFERENCES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logical {
    Decimal { precision: u32, scale: u32 },
    Uuid,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    LocalTimestampMillis,
    LocalTimestampMicros,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef<R> {
    Primitive(Primitive),
    Logical(Logical, Primitive), // annotation over its primitive carrier
    Array(Box<TypeRef<R>>),
    Map(Box<TypeRef<R>>),        // keys are always strings
    Union(Vec<TypeRef<R>>),
    Named(R),
    /// Custom attributes on an unnamed type, e.g. `{"type": "string", "java-class": ...}`.
    Annotated(Box<TypeRef<R>>, IndexMap<String, Value>),
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Primitive::Null,
            "boolean" => Primitive::Boolean,
            "int" => Primitive::Int,
            "long" => Primitive::Long,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            "bytes" => Primitive::Bytes,
            "string" => Primitive::String,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Boolean => "boolean",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bytes => "bytes",
            Primitive::String => "string",
        }
    }
}

impl Logical {
    /// Interpret a `logicalType` attribute over `base`. Unknown names, or
    /// names on the wrong carrier, yield `None` so the base type stands.
    pub fn over(name: &str, base: Primitive, precision: Option<u32>, scale: Option<u32>) -> Option<Self> {
        let logical = match name {
            "decimal" => Logical::Decimal { precision: precision?, scale: scale.unwrap_or(0) },
            "uuid" => Logical::Uuid,
            "date" => Logical::Date,
            "time-millis" => Logical::TimeMillis,
            "time-micros" => Logical::TimeMicros,
            "timestamp-millis" => Logical::TimestampMillis,
            "timestamp-micros" => Logical::TimestampMicros,
            "local-timestamp-millis" => Logical::LocalTimestampMillis,
            "local-timestamp-micros" => Logical::LocalTimestampMicros,
            _ => return None,
        };
        logical.accepts(base).then_some(logical)
    }

    pub fn name(self) -> &'static str {
        match self {
            Logical::Decimal { .. } => "decimal",
            Logical::Uuid => "uuid",
            Logical::Date => "date",
            Logical::TimeMillis => "time-millis",
            Logical::TimeMicros => "time-micros",
            Logical::TimestampMillis => "timestamp-millis",
            Logical::TimestampMicros => "timestamp-micros",
            Logical::LocalTimestampMillis => "local-timestamp-millis",
            Logical::LocalTimestampMicros => "local-timestamp-micros",
        }
    }

    fn accepts(self, base: Primitive) -> bool {
        match self {
            Logical::Decimal { .. } => base == Primitive::Bytes,
            Logical::Uuid => base == Primitive::String,
            Logical::Date | Logical::TimeMillis => base == Primitive::Int,
            Logical::TimeMicros
            | Logical::TimestampMillis
            | Logical::TimestampMicros
            | Logical::LocalTimestampMillis
            | Logical::LocalTimestampMicros => base == Primitive::Long,
        }
    }
}

impl<R> TypeRef<R> {
    /// Rebuild the same shape with every named reference replaced by `f`.
    pub fn try_map<S, E, F>(&self, f: &mut F) -> Result<TypeRef<S>, E>
    where
        F: FnMut(&R) -> Result<S, E>,
    {
        Ok(match self {
            TypeRef::Primitive(p) => TypeRef::Primitive(*p),
            TypeRef::Logical(l, p) => TypeRef::Logical(*l, *p),
            TypeRef::Array(item) => TypeRef::Array(Box::new(item.try_map(f)?)),
            TypeRef::Map(value) => TypeRef::Map(Box::new(value.try_map(f)?)),
            TypeRef::Union(arms) => {
                let mut out = Vec::with_capacity(arms.len());
                for arm in arms {
                    out.push(arm.try_map(f)?);
                }
                TypeRef::Union(out)
            }
            TypeRef::Named(r) => TypeRef::Named(f(r)?),
            TypeRef::Annotated(inner, props) => TypeRef::Annotated(Box::new(inner.try_map(f)?), props.clone()),
        })
    }

    /// The type with any custom attributes peeled off.
    pub fn bare(&self) -> &TypeRef<R> {
        match self {
            TypeRef::Annotated(inner, _) => inner.bare(),
            other => other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.bare(), TypeRef::Primitive(Primitive::Null))
    }

    /// A union with a `null` arm.
    pub fn is_nullable(&self) -> bool {
        match self.bare() {
            TypeRef::Union(arms) => arms.iter().any(TypeRef::is_null),
            other => other.is_null(),
        }
    }

    /// `T` for the two-armed `[null, T]` / `[T, null]` unions.
    pub fn optional_of(&self) -> Option<&TypeRef<R>> {
        match self.bare() {
            TypeRef::Union(arms) if arms.len() == 2 => match (&arms[0], &arms[1]) {
                (a, b) if a.is_null() && !b.is_null() => Some(b),
                (a, b) if b.is_null() && !a.is_null() => Some(a),
                _ => None,
            },
            _ => None,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DECLARATIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub struct Field<R> {
    pub name: String,
    pub doc: Option<String>,
    pub ty: TypeRef<R>,
    pub default: Option<Value>,
    pub aliases: Vec<String>,
    pub props: IndexMap<String, Value>, // order, custom attributes
}

#[derive(Debug, Clone, PartialEq)]
pub enum NamedKind<R> {
    Record { fields: Vec<Field<R>>, error: bool },
    Enum { symbols: Vec<String>, default: Option<String> },
    Fixed { size: usize, logical: Option<Logical> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedType<R> {
    pub name: Name,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    pub kind: NamedKind<R>,
    pub props: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message<R> {
    pub name: String,
    pub doc: Option<String>,
    pub request: Vec<Field<R>>,
    pub response: TypeRef<R>,
    pub errors: Vec<TypeRef<R>>,
    pub one_way: bool,
    pub props: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Protocol<R> {
    pub name: Name,
    pub doc: Option<String>,
    pub types: Vec<R>,         // declared types, in declaration order
    pub messages: Vec<Message<R>>,
    pub props: IndexMap<String, Value>,
}

impl<R: Clone + PartialEq> NamedType<R> {
    /// Equal up to documentation.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.without_docs() == other.without_docs()
    }

    fn without_docs(&self) -> Self {
        let mut out = self.clone();
        out.doc = None;
        if let NamedKind::Record { fields, .. } = &mut out.kind {
            for field in fields {
                field.doc = None;
            }
        }
        out
    }
}

impl<R: Clone + PartialEq> Protocol<R> {
    /// Equal up to documentation.
    pub fn same_shape(&self, other: &Self) -> bool {
        let strip = |p: &Self| {
            let mut p = p.clone();
            p.doc = None;
            for message in &mut p.messages {
                message.doc = None;
                for field in &mut message.request {
                    field.doc = None;
                }
            }
            p
        };
        strip(self) == strip(other)
    }
}

impl<R> NamedType<R> {
    pub fn fields(&self) -> &[Field<R>] {
        match &self.kind {
            NamedKind::Record { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn try_map<S, E, F>(&self, f: &mut F) -> Result<NamedType<S>, E>
    where
        F: FnMut(&R) -> Result<S, E>,
    {
        let kind = match &self.kind {
            NamedKind::Record { fields, error } => NamedKind::Record { fields: map_fields(fields, f)?, error: *error },
            NamedKind::Enum { symbols, default } => NamedKind::Enum { symbols: symbols.clone(), default: default.clone() },
            NamedKind::Fixed { size, logical } => NamedKind::Fixed { size: *size, logical: *logical },
        };
        Ok(NamedType {
            name: self.name.clone(),
            doc: self.doc.clone(),
            aliases: self.aliases.clone(),
            kind,
            props: self.props.clone(),
        })
    }
}

impl<R> Field<R> {
    pub fn try_map<S, E, F>(&self, f: &mut F) -> Result<Field<S>, E>
    where
        F: FnMut(&R) -> Result<S, E>,
    {
        Ok(Field {
            name: self.name.clone(),
            doc: self.doc.clone(),
            ty: self.ty.try_map(f)?,
            default: self.default.clone(),
            aliases: self.aliases.clone(),
            props: self.props.clone(),
        })
    }
}

impl<R> Message<R> {
    pub fn try_map<S, E, F>(&self, f: &mut F) -> Result<Message<S>, E>
    where
        F: FnMut(&R) -> Result<S, E>,
    {
        let mut errors = Vec::with_capacity(self.errors.len());
        for e in &self.errors {
            errors.push(e.try_map(f)?);
        }
        Ok(Message {
            name: self.name.clone(),
            doc: self.doc.clone(),
            request: map_fields(&self.request, f)?,
            response: self.response.try_map(f)?,
            errors,
            one_way: self.one_way,
            props: self.props.clone(),
        })
    }
}

impl<R> Protocol<R> {
    pub fn try_map<S, E, F>(&self, f: &mut F) -> Result<Protocol<S>, E>
    where
        F: FnMut(&R) -> Result<S, E>,
    {
        let mut types = Vec::with_capacity(self.types.len());
        for t in &self.types {
            types.push(f(t)?);
        }
        let mut messages = Vec::with_capacity(self.messages.len());
        for m in &self.messages {
            messages.push(m.try_map(f)?);
        }
        Ok(Protocol { name: self.name.clone(), doc: self.doc.clone(), types, messages, props: self.props.clone() })
    }
}

fn map_fields<R, S, E, F>(fields: &[Field<R>], f: &mut F) -> Result<Vec<Field<S>>, E>
where
    F: FnMut(&R) -> Result<S, E>,
{
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        out.push(field.try_map(f)?);
    }
    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
