//! IDL Normalizer: `.avdl` text into canonical protocol documents.
//!
//! Each top-level IDL file becomes one pretty-printed `.avpr` document named
//! after it. Imports are expanded in place, so a normalized document is
//! self-contained apart from references to types declared in other inputs.
pub mod lexer;
pub mod parser;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::canonical::{self, RawNames};
use crate::error::{CompileError, Result};
use crate::input::InputArtifact;
use crate::ir::{Message, NameRef, NamedType, Protocol};
use parser::{Import, ImportKind, Item};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Normalizer output for one IDL input.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDocument {
    pub source: PathBuf,
    /// `<stem>.avpr`, unique within one normalization.
    pub file_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Normalization {
    pub documents: Vec<CanonicalDocument>,
    /// Every import lookup, sorted and deduplicated.
    pub imports: Vec<ResolvedImport>,
}

/// Where an import was found, and the earlier search locations that did not
/// exist at the time. Creating any of those would change the result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResolvedImport {
    pub path: PathBuf,
    pub absent: Vec<PathBuf>,
}

/// Declarations gathered while expanding one top-level file.
struct Expander<'a> {
    roots: &'a [PathBuf],
    visited: HashSet<PathBuf>,
    imports: Vec<ResolvedImport>,
    types: IndexMap<String, (NamedType<NameRef>, PathBuf)>,
    messages: IndexMap<String, (Message<NameRef>, PathBuf)>,
}

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

/// `None` when there is nothing to normalize, so callers can skip the stage.
pub fn normalize(idl: &[InputArtifact], import_roots: &[PathBuf]) -> Result<Option<Normalization>> {
    if idl.is_empty() {
        return Ok(None);
    }
    let mut sorted: Vec<&InputArtifact> = idl.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let expanded = sorted
        .par_iter()
        .map(|artifact| normalize_one(artifact, import_roots))
        .collect::<Result<Vec<_>>>()?;

    let mut out = Normalization::default();
    let mut taken: HashMap<String, usize> = HashMap::new();
    for (mut document, imports) in expanded {
        let seen = taken.entry(document.file_name.clone()).or_insert(0);
        *seen += 1;
        if *seen > 1 {
            let renamed = format!("{}-{}.avpr", document.file_name.trim_end_matches(".avpr"), seen);
            tracing::warn!(
                source = %document.source.display(),
                from = %document.file_name,
                to = %renamed,
                "canonical document name already taken"
            );
            document.file_name = renamed;
        }
        out.imports.extend(imports);
        out.documents.push(document);
    }
    out.imports.sort();
    out.imports.dedup();
    tracing::info!(documents = out.documents.len(), imports = out.imports.len(), "normalized IDL inputs");
    Ok(Some(out))
}

/// Parse one IDL file and render its protocol, imports expanded.
pub fn normalize_one(
    artifact: &InputArtifact,
    import_roots: &[PathBuf],
) -> Result<(CanonicalDocument, Vec<ResolvedImport>)> {
    let file = parser::parse(&artifact.path, &artifact.content)?;
    let Some(body) = file.protocol else {
        return Err(CompileError::MissingProtocol { file: artifact.path.clone() });
    };

    let mut expander = Expander {
        roots: import_roots,
        visited: HashSet::from([identity(&artifact.path)]),
        imports: Vec::new(),
        types: IndexMap::new(),
        messages: IndexMap::new(),
    };
    expander.expand(&artifact.path, body.items)?;

    let types: Vec<NamedType<NameRef>> = expander.types.into_values().map(|(t, _)| t).collect();
    let protocol = Protocol {
        name: body.name,
        doc: body.doc,
        types: types.iter().map(|t| NameRef::new(t.name.full(), None)).collect(),
        messages: expander.messages.into_values().map(|(m, _)| m).collect(),
        props: body.props,
    };
    let ns = protocol.name.namespace();
    let rendered: Vec<_> = types.iter().map(|t| canonical::named_json(t, &mut RawNames, ns)).collect();
    let json = canonical::protocol_json(&protocol, rendered, &mut RawNames);
    let text = serde_json::to_string_pretty(&json)
        .map_err(|e| CompileError::malformed(&artifact.path, format!("cannot render protocol: {e}")))?;

    let stem = artifact.path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    tracing::debug!(source = %artifact.path.display(), protocol = %protocol.name, "normalized IDL file");
    let document = CanonicalDocument { source: artifact.path.clone(), file_name: format!("{stem}.avpr"), text };
    Ok((document, expander.imports))
}

// ————————————————————————————————————————————————————————————————————————————
// IMPORT EXPANSION
// ————————————————————————————————————————————————————————————————————————————

impl Expander<'_> {
    fn expand(&mut self, file: &Path, items: Vec<Item>) -> Result<()> {
        for item in items {
            match item {
                Item::Type(ty) => self.add_type(ty, file)?,
                Item::Message(message) => self.add_message(message, file)?,
                Item::Import(import) => self.import(file, &import)?,
            }
        }
        Ok(())
    }

    fn import(&mut self, from: &Path, import: &Import) -> Result<()> {
        let resolved = self.locate(from, import)?;
        let path = resolved.path.clone();
        // every lookup counts, even one that lands on a file already expanded
        self.imports.push(resolved);
        if !self.visited.insert(identity(&path)) {
            tracing::debug!(import = %path.display(), "already imported");
            return Ok(());
        }
        let text = fs::read_to_string(&path).map_err(|e| CompileError::io(&path, e))?;
        match import.kind {
            ImportKind::Idl => {
                let imported = parser::parse(&path, &text)?;
                let items = match imported.protocol {
                    Some(body) => body.items,
                    None => imported.items,
                };
                self.expand(&path, items)
            }
            ImportKind::Protocol => {
                let doc = crate::parse::parse_protocol(&path, &text)?;
                for ty in doc.types {
                    self.add_type(ty, &path)?;
                }
                for message in doc.protocol.map(|p| p.messages).unwrap_or_default() {
                    self.add_message(message, &path)?;
                }
                Ok(())
            }
            ImportKind::Schema => {
                let doc = crate::parse::parse_schema(&path, &text)?;
                for ty in doc.types {
                    self.add_type(ty, &path)?;
                }
                Ok(())
            }
        }
    }

    /// Relative to the importing file first, then each search root in order.
    fn locate(&self, from: &Path, import: &Import) -> Result<ResolvedImport> {
        let dir = from.parent().unwrap_or(Path::new(""));
        let mut absent = Vec::new();
        for candidate in std::iter::once(dir.join(&import.path)).chain(self.roots.iter().map(|root| root.join(&import.path))) {
            if candidate.is_file() {
                return Ok(ResolvedImport { path: candidate, absent });
            }
            absent.push(candidate);
        }
        Err(CompileError::malformed(
            from,
            format!("line {}, column {}: cannot find import \"{}\"", import.line, import.col, import.path),
        ))
    }

    fn add_type(&mut self, ty: NamedType<NameRef>, origin: &Path) -> Result<()> {
        let key = ty.name.full();
        match self.types.get(&key) {
            Some((existing, _)) if existing.same_shape(&ty) => Ok(()),
            Some((_, first)) => Err(CompileError::DuplicateType { name: key, first: first.clone(), second: origin.to_path_buf() }),
            None => {
                self.types.insert(key, (ty, origin.to_path_buf()));
                Ok(())
            }
        }
    }

    fn add_message(&mut self, message: Message<NameRef>, origin: &Path) -> Result<()> {
        match self.messages.get(&message.name) {
            Some((existing, _)) if *existing == message => Ok(()),
            Some((_, first)) => Err(CompileError::malformed(
                origin,
                format!("message {} is already declared in {}", message.name, first.display()),
            )),
            None => {
                self.messages.insert(message.name.clone(), (message, origin.to_path_buf()));
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn identity(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parse::parse_protocol;

    fn artifact(dir: &Path, name: &str, content: &str) -> InputArtifact {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        InputArtifact::new(path, content)
    }

    #[test]
    fn no_idl_inputs_means_nothing_to_do() {
        assert_eq!(normalize(&[], &[]).unwrap(), None);
    }

    #[test]
    fn protocol_normalizes_to_parseable_canonical_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = artifact(
            dir.path(),
            "user.avdl",
            r#"@namespace("com.example.avro") protocol UserService {
                record User { string id; int? age; }
                User getUser(string id);
            }"#,
        );
        let out = normalize(&[input], &[]).unwrap().unwrap();
        assert_eq!(out.documents.len(), 1);
        let doc = &out.documents[0];
        assert_eq!(doc.file_name, "user.avpr");
        assert!(doc.text.contains("\n  \"protocol\": \"UserService\""), "{}", doc.text);

        let parsed = parse_protocol(Path::new("user.avpr"), &doc.text).unwrap();
        assert_eq!(parsed.types[0].name.full(), "com.example.avro.User");
        let protocol = parsed.protocol.unwrap();
        assert_eq!(protocol.messages[0].name, "getUser");
    }

    #[test]
    fn normalization_is_byte_stable() {
        let dir = tempfile::tempdir().unwrap();
        let input = artifact(dir.path(), "p.avdl", "protocol P { enum E { A, B } = A; fixed F(4); }");
        let a = normalize(std::slice::from_ref(&input), &[]).unwrap();
        let b = normalize(&[input], &[]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn standalone_types_are_a_missing_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let input = artifact(dir.path(), "types.avdl", "namespace com.example; record Lonely { int x; }");
        let err = normalize(&[input], &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingProtocol);
        assert!(err.artifact().unwrap().ends_with("types.avdl"));
    }

    #[test]
    fn imports_resolve_relative_then_roots_and_cycles_terminate() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("shared");
        fs::create_dir(&shared).unwrap();
        fs::write(shared.join("money.avsc"), r#"{"type": "fixed", "name": "Money", "namespace": "com.shop", "size": 8}"#).unwrap();
        fs::write(
            dir.path().join("common.avdl"),
            r#"@namespace("com.shop") protocol Common { import idl "main.avdl"; record Item { string sku; } }"#,
        )
        .unwrap();
        let main = artifact(
            dir.path(),
            "main.avdl",
            r#"@namespace("com.shop") protocol Shop {
                import idl "common.avdl";
                import schema "money.avsc";
                record Order { array<Item> items; Money total; }
                Order place(Order order);
            }"#,
        );
        let out = normalize(&[main], &[shared.clone()]).unwrap().unwrap();
        let parsed = parse_protocol(Path::new("main.avpr"), &out.documents[0].text).unwrap();
        let names: Vec<_> = parsed.types.iter().map(|t| t.name.full()).collect();
        assert_eq!(names, ["com.shop.Item", "com.shop.Money", "com.shop.Order"]);
        let money = out.imports.iter().find(|i| i.path.ends_with("money.avsc")).unwrap();
        assert_eq!(money.path, shared.join("money.avsc"));
        assert_eq!(money.absent, vec![dir.path().join("money.avsc")]);
        let common = out.imports.iter().find(|i| i.path.ends_with("common.avdl")).unwrap();
        assert!(common.absent.is_empty());
        // the cycle back to main.avdl is a lookup too, but is not expanded twice
        assert_eq!(out.imports.len(), 3);
    }

    #[test]
    fn imported_messages_keep_their_own_namespace() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("common.avdl"),
            r#"@namespace("com.common") protocol C { record Item { int a; } Item fetch(); }"#,
        )
        .unwrap();
        let main = artifact(
            dir.path(),
            "main.avdl",
            r#"@namespace("com.shop") protocol Shop { import idl "common.avdl"; record Cart { array<com.common.Item> items; } }"#,
        );
        let out = normalize(&[main], &[]).unwrap().unwrap();
        let text = &out.documents[0].text;
        assert!(text.contains("\"response\": \"com.common.Item\""), "{text}");

        let parsed = parse_protocol(Path::new("main.avpr"), text).unwrap();
        let graph = crate::resolve::resolve(vec![parsed]).unwrap();
        assert!(graph.lookup("com.common.Item").is_some());
        assert!(graph.lookup("com.shop.Cart").is_some());
    }

    #[test]
    fn missing_import_is_malformed_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let input = artifact(dir.path(), "p.avdl", "protocol P {\n  import idl \"nowhere.avdl\";\n}");
        let err = normalize(&[input], &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDefinition);
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn colliding_stems_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        let first = artifact(&a, "svc.avdl", "protocol A { }");
        let second = artifact(&b, "svc.avdl", "protocol B { }");
        let out = normalize(&[second, first], &[]).unwrap().unwrap();
        let names: Vec<_> = out.documents.iter().map(|d| d.file_name.as_str()).collect();
        assert_eq!(names, ["svc.avpr", "svc-2.avpr"]);
        assert!(out.documents[0].source.starts_with(&a));
    }
}
