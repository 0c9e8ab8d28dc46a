//! Record and error classes.
use sha2::{Digest, Sha256};

use super::java::{self, JavaTypes};
use super::Codegen;
use crate::canonical;
use crate::config::GenerationConfig;
use crate::ir::{Field, NamedKind, TypeId};

const NULLABLE: &str = "@org.jetbrains.annotations.Nullable";
const NOT_NULL: &str = "@org.jetbrains.annotations.NotNull";

/// Per-field spellings, computed once.
struct Slot<'f> {
    field: &'f Field<TypeId>,
    ident: String,
    stem: String,
    /// Declared type: primitives unboxed.
    ty: String,
    boxed: String,
    nullable: bool,
}

pub fn emit(types: &JavaTypes, id: TypeId) -> String {
    let graph = types.graph;
    let config = types.config;
    let ty = graph.get(id);
    let (fields, error) = match &ty.kind {
        NamedKind::Record { fields, error } => (fields, *error),
        _ => return String::new(),
    };
    let name = &ty.name.name;
    let schema = canonical::embedded_schema(graph, id);
    let slots: Vec<Slot> = fields
        .iter()
        .map(|field| Slot {
            field,
            ident: java::mangle(&field.name),
            stem: java::accessor_stem(&field.name),
            ty: types.unboxed(&field.ty),
            boxed: types.boxed(&field.ty),
            nullable: field.ty.is_nullable(),
        })
        .collect();

    let mut cg = Codegen::new();
    cg.javadoc(ty.doc.as_deref());
    cg.line("@org.apache.avro.specific.AvroGenerated");
    let base = if error { "org.apache.avro.specific.SpecificExceptionBase" } else { "org.apache.avro.specific.SpecificRecordBase" };
    cg.open(format!("public class {name} extends {base} implements org.apache.avro.specific.SpecificRecord"));
    cg.line(format!("private static final long serialVersionUID = {}L;", serial_version(&schema)));
    cg.line(format!(
        "public static final org.apache.avro.Schema SCHEMA$ = new org.apache.avro.Schema.Parser().parse({});",
        java::string_literals(&schema)
    ));
    cg.line("public static org.apache.avro.Schema getClassSchema() { return SCHEMA$; }");
    cg.blank();

    let visibility = if config.is_public() { "public" } else { "private" };
    for slot in &slots {
        cg.javadoc(slot.field.doc.as_deref());
        cg.line(format!("{visibility} {} {};", slot.ty, slot.ident));
    }
    cg.blank();

    constructors(&mut cg, name, error, &slots, config);

    cg.line("@Override");
    cg.line("public org.apache.avro.Schema getSchema() { return SCHEMA$; }");
    cg.blank();
    indexed_access(&mut cg, &slots);

    for slot in &slots {
        accessors(&mut cg, slot, config);
    }
    cg.close("");
    cg.into_string()
}

fn constructors(cg: &mut Codegen, name: &str, error: bool, slots: &[Slot], config: &GenerationConfig) {
    cg.line("/**");
    cg.line(" * Default constructor.  Note that this does not initialize fields");
    cg.line(" * to their default values from the schema.");
    cg.line(" */");
    if error {
        cg.open(format!("public {name}()"));
        cg.line("super();");
        cg.close("");
        cg.blank();
        cg.open(format!("public {name}(Object value)"));
        cg.line("super(value);");
        cg.close("");
        cg.blank();
        cg.open(format!("public {name}(Object value, Throwable cause)"));
        cg.line("super(value, cause);");
        cg.close("");
    } else {
        cg.line(format!("public {name}() {{}}"));
    }
    cg.blank();
    if slots.is_empty() {
        return;
    }

    cg.line("/**");
    cg.line(" * All-args constructor.");
    for slot in slots {
        cg.line(format!(" * @param {} The new value for {}", slot.ident, slot.field.name));
    }
    cg.line(" */");
    let params: Vec<String> = slots
        .iter()
        .map(|s| format!("{}{} {}", annotation(config, s.nullable), s.boxed, s.ident))
        .collect();
    cg.open(format!("public {name}({})", params.join(", ")));
    for slot in slots {
        cg.line(format!("this.{0} = {0};", slot.ident));
    }
    cg.close("");
    cg.blank();
}

/// `get(int)` / `put(int, Object)` used by the runtime's serializers.
fn indexed_access(cg: &mut Codegen, slots: &[Slot]) {
    cg.line("// Used by DatumWriter.  Applications should not call.");
    cg.open("public java.lang.Object get(int field$)");
    cg.open("switch (field$)");
    for (i, slot) in slots.iter().enumerate() {
        cg.line(format!("case {i}: return {};", slot.ident));
    }
    cg.line("default: throw new IndexOutOfBoundsException(\"Invalid index: \" + field$);");
    cg.close("");
    cg.close("");
    cg.blank();

    cg.line("// Used by DatumReader.  Applications should not call.");
    cg.line("@SuppressWarnings(value=\"unchecked\")");
    cg.open("public void put(int field$, java.lang.Object value$)");
    cg.open("switch (field$)");
    for (i, slot) in slots.iter().enumerate() {
        cg.line(format!("case {i}: {} = ({})value$; break;", slot.ident, slot.boxed));
    }
    cg.line("default: throw new IndexOutOfBoundsException(\"Invalid index: \" + field$);");
    cg.close("");
    cg.close("");
    cg.blank();
}

fn accessors(cg: &mut Codegen, slot: &Slot, config: &GenerationConfig) {
    let Slot { field, ident, stem, ty, boxed, nullable } = slot;
    let described = field.doc.as_deref().unwrap_or("");

    cg.line("/**");
    cg.line(format!(" * Gets the value of the '{}' field.", field.name));
    cg.line(format!(" * @return {}", java::javadoc_text(described)).trim_end());
    cg.line(" */");
    if config.optional_getter(*nullable) {
        cg.open(format!("public java.util.Optional<{boxed}> get{stem}()"));
        cg.line(format!("return java.util.Optional.<{boxed}>ofNullable({ident});"));
    } else {
        if config.add_null_safe_annotations {
            cg.line(if *nullable { NULLABLE } else { NOT_NULL });
        }
        cg.open(format!("public {ty} get{stem}()"));
        cg.line(format!("return {ident};"));
    }
    cg.close("");
    cg.blank();

    if config.add_extra_optional_getters {
        cg.line("/**");
        cg.line(format!(" * Gets the value of the '{}' field as an Optional.", field.name));
        cg.line(" */");
        cg.open(format!("public java.util.Optional<{boxed}> getOptional{stem}()"));
        cg.line(format!("return java.util.Optional.<{boxed}>ofNullable({ident});"));
        cg.close("");
        cg.blank();
    }

    if !config.no_setters {
        cg.line("/**");
        cg.line(format!(" * Sets the value of the '{}' field.", field.name));
        cg.line(" * @param value the value to set.");
        cg.line(" */");
        cg.open(format!("public void set{stem}({}{ty} value)", annotation(config, *nullable)));
        cg.line(format!("this.{ident} = value;"));
        cg.close("");
        cg.blank();
    }
}

/// Parameter prefix carrying the null-safety marker, empty when disabled.
fn annotation(config: &GenerationConfig, nullable: bool) -> String {
    if !config.add_null_safe_annotations {
        return String::new();
    }
    format!("{} ", if nullable { NULLABLE } else { NOT_NULL })
}

/// Stable per-schema serial version.
fn serial_version(schema: &str) -> i64 {
    let digest = Sha256::digest(schema.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}
