//! Java spelling of model types, names and literals.
use crate::config::{GenerationConfig, StringType};
use crate::ir::{Logical, NamedKind, Primitive, TypeId, TypeRef};
use crate::resolve::TypeGraph;

const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const", "continue",
    "default", "do", "double", "else", "enum", "extends", "false", "final", "finally", "float", "for", "goto",
    "if", "implements", "import", "instanceof", "int", "interface", "long", "native", "new", "null", "package",
    "private", "protected", "public", "return", "record", "short", "static", "strictfp", "super", "switch",
    "synchronized", "this", "throw", "throws", "transient", "true", "try", "var", "void", "volatile", "while",
    "yield",
];

/// Accessor stems that would clash with methods every record already has.
const RESERVED_ACCESSORS: &[&str] = &["Class", "Schema", "SpecificData"];

/// Longest run of source characters per Java string literal chunk.
const LITERAL_CHUNK: usize = 10_000;

pub struct JavaTypes<'a> {
    pub graph: &'a TypeGraph,
    pub config: &'a GenerationConfig,
}

impl JavaTypes<'_> {
    /// Declared type of a field or parameter. Primitives stay unboxed unless
    /// they sit in an optional union.
    pub fn unboxed(&self, ty: &TypeRef<TypeId>) -> String {
        match ty.bare() {
            TypeRef::Primitive(p) => match p {
                Primitive::Null => "java.lang.Void".to_string(),
                Primitive::Boolean => "boolean".to_string(),
                Primitive::Int => "int".to_string(),
                Primitive::Long => "long".to_string(),
                Primitive::Float => "float".to_string(),
                Primitive::Double => "double".to_string(),
                Primitive::Bytes | Primitive::String => self.boxed(ty),
            },
            _ => self.boxed(ty),
        }
    }

    /// Reference type, usable as a generic argument.
    pub fn boxed(&self, ty: &TypeRef<TypeId>) -> String {
        match ty {
            TypeRef::Primitive(p) => match p {
                Primitive::Null => "java.lang.Void".to_string(),
                Primitive::Boolean => "java.lang.Boolean".to_string(),
                Primitive::Int => "java.lang.Integer".to_string(),
                Primitive::Long => "java.lang.Long".to_string(),
                Primitive::Float => "java.lang.Float".to_string(),
                Primitive::Double => "java.lang.Double".to_string(),
                Primitive::Bytes => "java.nio.ByteBuffer".to_string(),
                Primitive::String => self.string_type().to_string(),
            },
            TypeRef::Logical(logical, _) => self.logical(*logical).to_string(),
            TypeRef::Array(item) => format!("java.util.List<{}>", self.boxed(item)),
            TypeRef::Map(value) => format!("java.util.Map<{},{}>", self.string_type(), self.boxed(value)),
            TypeRef::Union(_) => match ty.optional_of() {
                Some(inner) => self.boxed(inner),
                None => "java.lang.Object".to_string(),
            },
            TypeRef::Annotated(inner, props) => match props.get("avro.java.string").and_then(|v| v.as_str()) {
                Some("String") if matches!(inner.bare(), TypeRef::Primitive(Primitive::String)) => {
                    "java.lang.String".to_string()
                }
                _ => self.boxed(inner),
            },
            TypeRef::Named(id) => {
                let named = self.graph.get(*id);
                match named.kind {
                    NamedKind::Fixed { logical: Some(Logical::Decimal { .. }), .. } if self.config.use_big_decimal => {
                        "java.math.BigDecimal".to_string()
                    }
                    _ => named.name.full(),
                }
            }
        }
    }

    fn string_type(&self) -> &'static str {
        match self.config.string_type {
            StringType::CharSequence => "java.lang.CharSequence",
            StringType::String => "java.lang.String",
            StringType::Utf8 => "org.apache.avro.util.Utf8",
        }
    }

    fn logical(&self, logical: Logical) -> &'static str {
        match logical {
            Logical::Decimal { .. } if self.config.use_big_decimal => "java.math.BigDecimal",
            Logical::Decimal { .. } => "java.nio.ByteBuffer",
            Logical::Uuid => "java.util.UUID",
            Logical::Date => "java.time.LocalDate",
            Logical::TimeMillis | Logical::TimeMicros => "java.time.LocalTime",
            Logical::TimestampMillis | Logical::TimestampMicros => "java.time.Instant",
            Logical::LocalTimestampMillis | Logical::LocalTimestampMicros => "java.time.LocalDateTime",
        }
    }
}

/// Field or symbol name as a Java identifier.
pub fn mangle(name: &str) -> String {
    if RESERVED.contains(&name) {
        format!("{name}$")
    } else {
        name.to_string()
    }
}

/// `first_name` → `FirstName`, used after `get`/`set`.
pub fn accessor_stem(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = true;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    if RESERVED_ACCESSORS.contains(&out.as_str()) {
        out.push('$');
    }
    out
}

/// One or more comma-separated Java string literals holding `text`. Long
/// text is split since a single constant is limited to 64k bytes.
pub fn string_literals(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let chunks: Vec<String> = chars
        .chunks(LITERAL_CHUNK)
        .map(|chunk| format!("\"{}\"", escape(chunk)))
        .collect();
    if chunks.is_empty() { "\"\"".to_string() } else { chunks.join(", ") }
}

fn escape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    for &c in chars {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{unit:04x}"));
                }
            }
        }
    }
    out
}

/// Doc text made safe inside a `/** */` block.
pub fn javadoc_text(doc: &str) -> String {
    doc.replace("*/", "*&#47;")
}
