//! Enum and fixed classes. Neither depends on the generation options beyond
//! the file wrapper.
use super::java;
use super::Codegen;
use crate::canonical;
use crate::ir::{NamedKind, TypeId};
use crate::resolve::TypeGraph;

pub fn emit_enum(graph: &TypeGraph, id: TypeId) -> String {
    let ty = graph.get(id);
    let NamedKind::Enum { symbols, .. } = &ty.kind else { return String::new() };
    let name = &ty.name.name;
    let schema = canonical::embedded_schema(graph, id);

    let mut cg = Codegen::new();
    cg.javadoc(ty.doc.as_deref());
    cg.line("@org.apache.avro.specific.AvroGenerated");
    cg.open(format!("public enum {name} implements org.apache.avro.generic.GenericEnumSymbol<{name}>"));
    let symbols: Vec<String> = symbols.iter().map(|s| java::mangle(s)).collect();
    cg.line(format!("{}  ;", symbols.join(", ")));
    schema_members(&mut cg, &schema);
    cg.close("");
    cg.into_string()
}

pub fn emit_fixed(graph: &TypeGraph, id: TypeId) -> String {
    let ty = graph.get(id);
    let NamedKind::Fixed { size, .. } = &ty.kind else { return String::new() };
    let name = &ty.name.name;
    let schema = canonical::embedded_schema(graph, id);

    let mut cg = Codegen::new();
    cg.javadoc(ty.doc.as_deref());
    cg.line(format!("@org.apache.avro.specific.FixedSize({size})"));
    cg.line("@org.apache.avro.specific.AvroGenerated");
    cg.open(format!("public class {name} extends org.apache.avro.specific.SpecificFixed"));
    cg.line("private static final long serialVersionUID = 1L;");
    schema_members(&mut cg, &schema);
    cg.blank();
    cg.line(format!("/** Creates a new {name} */"));
    cg.open(format!("public {name}()"));
    cg.line("super();");
    cg.close("");
    cg.blank();
    cg.line("/**");
    cg.line(format!(" * Creates a new {name} with the given bytes."));
    cg.line(format!(" * @param bytes The bytes to create the new {name}."));
    cg.line(" */");
    cg.open(format!("public {name}(byte[] bytes)"));
    cg.line("super(bytes);");
    cg.close("");
    cg.close("");
    cg.into_string()
}

fn schema_members(cg: &mut Codegen, schema: &str) {
    cg.line(format!(
        "public static final org.apache.avro.Schema SCHEMA$ = new org.apache.avro.Schema.Parser().parse({});",
        java::string_literals(schema)
    ));
    cg.line("public static org.apache.avro.Schema getClassSchema() { return SCHEMA$; }");
    cg.line("@Override");
    cg.line("public org.apache.avro.Schema getSchema() { return SCHEMA$; }");
}

#[cfg(test)]
mod tests {
    use super::super::tests::graph_of;
    use super::*;

    #[test]
    fn enum_symbols_and_schema() {
        let graph = graph_of(
            r#"{"type": "enum", "name": "Suit", "namespace": "cards", "doc": "Card suits.",
                "symbols": ["SPADES", "HEARTS", "default"], "default": "SPADES"}"#,
        );
        let out = emit_enum(&graph, graph.lookup("cards.Suit").unwrap());
        assert!(out.starts_with("/** Card suits. */\n@org.apache.avro.specific.AvroGenerated\n"));
        assert!(out.contains("public enum Suit implements org.apache.avro.generic.GenericEnumSymbol<Suit> {"));
        assert!(out.contains("  SPADES, HEARTS, default$  ;\n"));
        assert!(out.contains(r#"\"default\":\"SPADES\""#), "{out}");
    }

    #[test]
    fn fixed_carries_its_size() {
        let graph = graph_of(r#"{"type": "fixed", "name": "Md5", "namespace": "x", "size": 16}"#);
        let out = emit_fixed(&graph, graph.lookup("x.Md5").unwrap());
        assert!(out.contains("@org.apache.avro.specific.FixedSize(16)"));
        assert!(out.contains("public class Md5 extends org.apache.avro.specific.SpecificFixed {"));
        assert!(out.contains("public Md5(byte[] bytes)"));
    }
}
