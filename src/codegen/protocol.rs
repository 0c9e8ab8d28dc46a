//! Protocol interfaces, with the nested asynchronous `Callback` variant.
use super::java::{self, JavaTypes};
use super::Codegen;
use crate::canonical;
use crate::ir::{Message, Protocol, TypeId};

pub fn emit(types: &JavaTypes, protocol: &Protocol<TypeId>) -> String {
    let name = &protocol.name.name;
    let text = canonical::embedded_protocol(types.graph, protocol);

    let mut cg = Codegen::new();
    cg.javadoc(protocol.doc.as_deref());
    cg.line("@org.apache.avro.specific.AvroGenerated");
    cg.open(format!("public interface {name}"));
    cg.line(format!(
        "public static final org.apache.avro.Protocol PROTOCOL = org.apache.avro.Protocol.parse({});",
        java::string_literals(&text)
    ));
    for message in &protocol.messages {
        cg.javadoc(message.doc.as_deref());
        cg.line(format!("{} {}({}){};", response(types, message), message.name, params(types, message), throws(types, message)));
    }
    cg.blank();

    cg.line("@SuppressWarnings(\"all\")");
    cg.javadoc(protocol.doc.as_deref());
    cg.open(format!("public interface Callback extends {name}"));
    cg.line(format!("public static final org.apache.avro.Protocol PROTOCOL = {}.PROTOCOL;", protocol.name.full()));
    for message in &protocol.messages {
        let result = if message.response.is_null() { "java.lang.Void".to_string() } else { types.boxed(&message.response) };
        let mut args = params(types, message);
        if !args.is_empty() {
            args.push_str(", ");
        }
        cg.javadoc(message.doc.as_deref());
        cg.line(format!(
            "void {}({args}org.apache.avro.ipc.Callback<{result}> callback) throws java.io.IOException;",
            message.name
        ));
    }
    cg.close("");
    cg.close("");
    cg.into_string()
}

fn response(types: &JavaTypes, message: &Message<TypeId>) -> String {
    if message.response.is_null() {
        "void".to_string()
    } else {
        types.unboxed(&message.response)
    }
}

fn params(types: &JavaTypes, message: &Message<TypeId>) -> String {
    message
        .request
        .iter()
        .map(|p| format!("{} {}", types.unboxed(&p.ty), java::mangle(&p.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One-way messages cannot fail remotely, so they declare nothing.
fn throws(types: &JavaTypes, message: &Message<TypeId>) -> String {
    if message.one_way {
        return String::new();
    }
    let mut out = " throws org.apache.avro.AvroRemoteException".to_string();
    for error in &message.errors {
        out.push_str(", ");
        out.push_str(&types.boxed(error));
    }
    out
}
