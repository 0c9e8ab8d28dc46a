//! Code Generator: resolved type graph → Java sources.
//!
//! One artifact per named type and one per protocol. Emission is a pure
//! function of the graph and the validated config; artifacts are built in
//! parallel and returned sorted by path, so nothing about thread scheduling is
//! observable.
pub mod enums;
pub mod java;
pub mod protocol;
pub mod record;

use std::path::PathBuf;

use rayon::prelude::*;

use crate::config::{TemplateKind, Templates, Validated};
use crate::ir::{Name, NamedKind, TypeId};
use crate::resolve::TypeGraph;
use java::JavaTypes;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// One generated source file, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub name: Name,
    /// Relative to the output root: namespace directories + `Name.java`.
    pub path: PathBuf,
    /// Encoded with the configured encoding.
    pub content: Vec<u8>,
}

/// Line buffer with two-space indentation.
#[derive(Debug, Default)]
pub struct Codegen {
    out: String,
    depth: usize,
}

/// What gets one file.
#[derive(Debug, Clone, Copy)]
enum Unit {
    Type(TypeId),
    Protocol(usize),
}

pub(crate) const HEADER: &str = "/**\n * Autogenerated by Avro\n *\n * DO NOT EDIT DIRECTLY\n */";

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

pub fn generate(graph: &TypeGraph, validated: &Validated) -> Vec<OutputArtifact> {
    let units: Vec<Unit> = graph
        .types()
        .map(|(id, _)| Unit::Type(id))
        .chain((0..graph.protocols().len()).map(Unit::Protocol))
        .collect();
    let mut artifacts: Vec<OutputArtifact> = units.par_iter().map(|unit| emit_unit(graph, validated, *unit)).collect();
    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::info!(artifacts = artifacts.len(), "generated sources");
    artifacts
}

pub fn output_path(name: &Name) -> PathBuf {
    let mut path = PathBuf::new();
    if let Some(ns) = name.namespace() {
        path.extend(ns.split('.'));
    }
    path.push(format!("{}.java", name.name));
    path
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str("  ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// `head {` and indent.
    pub fn open(&mut self, head: impl AsRef<str>) {
        self.line(format!("{} {{", head.as_ref()));
        self.depth += 1;
    }

    /// Dedent and `}` plus `tail`.
    pub fn close(&mut self, tail: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(format!("}}{tail}"));
    }

    /// Javadoc block; nothing when `doc` is absent or blank.
    pub fn javadoc(&mut self, doc: Option<&str>) {
        let Some(doc) = doc.filter(|d| !d.trim().is_empty()) else { return };
        let doc = java::javadoc_text(doc);
        let mut lines = doc.lines();
        match (lines.next(), lines.next()) {
            (Some(only), None) => self.line(format!("/** {only} */")),
            _ => {
                self.line("/**");
                for l in doc.lines() {
                    if l.is_empty() {
                        self.line(" *");
                    } else {
                        self.line(format!(" * {l}"));
                    }
                }
                self.line(" */");
            }
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

fn emit_unit(graph: &TypeGraph, validated: &Validated, unit: Unit) -> OutputArtifact {
    let types = JavaTypes { graph, config: &validated.config };
    let (name, kind, declaration) = match unit {
        Unit::Type(id) => {
            let ty = graph.get(id);
            let (kind, declaration) = match &ty.kind {
                NamedKind::Record { .. } => (TemplateKind::Record, record::emit(&types, id)),
                NamedKind::Enum { .. } => (TemplateKind::Enum, enums::emit_enum(graph, id)),
                NamedKind::Fixed { .. } => (TemplateKind::Fixed, enums::emit_fixed(graph, id)),
            };
            (ty.name.clone(), kind, declaration)
        }
        Unit::Protocol(index) => {
            let p = &graph.protocols()[index];
            (p.name.clone(), TemplateKind::Protocol, protocol::emit(&types, p))
        }
    };
    tracing::debug!(name = %name, "emitting");
    let text = wrap(&validated.templates, kind, &name, &declaration);
    OutputArtifact { path: output_path(&name), content: validated.encoding.encode(&text), name }
}

/// Place a declaration in its file: the custom template for its kind, or
/// header and package line.
fn wrap(templates: &Templates, kind: TemplateKind, name: &Name, declaration: &str) -> String {
    let package = name.namespace().unwrap_or("");
    // empty for the null namespace, where `package ;` would not compile
    let package_decl = if package.is_empty() { String::new() } else { format!("package {package};") };
    match templates.get(kind) {
        Some(template) => Templates::render(
            template,
            &[
                ("header", HEADER),
                ("package", package),
                ("packageDecl", &package_decl),
                ("declaration", declaration),
                ("name", &name.name),
                ("namespace", package),
            ],
        ),
        None => {
            let mut out = format!("{HEADER}\n");
            if !package.is_empty() {
                out.push_str(&format!("package {package};\n"));
            }
            out.push('\n');
            out.push_str(declaration);
            out
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
