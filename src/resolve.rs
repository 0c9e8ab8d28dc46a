//! Model Builder / Resolver.
//!
//! Two passes over the complete document set:
//!
//! 1. **Declare** (sequential): register every named type and protocol under
//!    its full name. Re-declarations are fine when the structure matches and
//!    a [`CompileError::DuplicateType`] otherwise.
//! 2. **Resolve** (parallel): the registry is frozen, ids are handed out in
//!    sorted name order, and every `NameRef` becomes a `TypeId`.
//!
//! Because ids depend only on the set of names, the resulting graph is the
//! same whatever order the documents arrived in.
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::{CompileError, Result};
use crate::ir::{NameRef, NamedType, Protocol, TypeId};
use crate::parse::Document;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Arena of resolved named types plus the protocols that use them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeGraph {
    types: Vec<NamedType<TypeId>>,
    origins: Vec<PathBuf>,
    index: BTreeMap<String, TypeId>,
    protocols: Vec<Protocol<TypeId>>,
}

type Declared<T> = BTreeMap<String, (T, PathBuf)>;

impl TypeGraph {
    pub fn get(&self, id: TypeId) -> &NamedType<TypeId> {
        &self.types[id.index()]
    }

    /// First document (in path order) that declared the type.
    pub fn origin(&self, id: TypeId) -> &Path {
        &self.origins[id.index()]
    }

    pub fn lookup(&self, full_name: &str) -> Option<TypeId> {
        self.index.get(full_name).copied()
    }

    pub fn types(&self) -> impl Iterator<Item = (TypeId, &NamedType<TypeId>)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i as u32), t))
    }

    pub fn protocols(&self) -> &[Protocol<TypeId>] {
        &self.protocols
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.protocols.is_empty()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

pub fn resolve(mut documents: Vec<Document>) -> Result<TypeGraph> {
    documents.sort_by(|a, b| a.source.cmp(&b.source));

    // declaration pass
    let mut types: Declared<NamedType<NameRef>> = BTreeMap::new();
    let mut protocols: Declared<Protocol<NameRef>> = BTreeMap::new();
    for doc in &documents {
        for ty in &doc.types {
            declare(&mut types, ty.name.full(), ty, &doc.source, same_type)?;
        }
        if let Some(protocol) = &doc.protocol {
            declare(&mut protocols, protocol.name.full(), protocol, &doc.source, same_protocol)?;
        }
    }
    // protocols and named types share one namespace of generated classes
    for (name, (_, protocol_origin)) in &protocols {
        if let Some((_, type_origin)) = types.get(name) {
            let (first, second) = if type_origin <= protocol_origin {
                (type_origin, protocol_origin)
            } else {
                (protocol_origin, type_origin)
            };
            return Err(CompileError::DuplicateType { name: name.clone(), first: first.clone(), second: second.clone() });
        }
    }
    let index: BTreeMap<String, TypeId> =
        types.keys().enumerate().map(|(i, name)| (name.clone(), TypeId(i as u32))).collect();
    tracing::debug!(types = types.len(), protocols = protocols.len(), "declaration pass complete");

    // resolution pass: the registry is read-only from here on
    for doc in &documents {
        for r in &doc.references {
            lookup(&index, r, &doc.source)?;
        }
    }
    let declared: Vec<_> = types.into_values().collect();
    let resolved: Vec<Result<NamedType<TypeId>>> = declared
        .par_iter()
        .map(|(ty, origin)| ty.try_map(&mut |r| lookup(&index, r, origin)))
        .collect();
    let resolved = resolved.into_iter().collect::<Result<Vec<_>>>()?;
    let protocols = protocols
        .values()
        .map(|(p, origin)| p.try_map(&mut |r| lookup(&index, r, origin)))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(types = resolved.len(), protocols = protocols.len(), "resolved type graph");
    Ok(TypeGraph {
        types: resolved,
        origins: declared.into_iter().map(|(_, origin)| origin).collect(),
        index,
        protocols,
    })
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn declare<T: Clone>(
    registry: &mut Declared<T>,
    name: String,
    value: &T,
    source: &Path,
    same: fn(&T, &T) -> bool,
) -> Result<()> {
    match registry.entry(name) {
        Entry::Vacant(slot) => {
            slot.insert((value.clone(), source.to_path_buf()));
            Ok(())
        }
        Entry::Occupied(slot) => {
            let (existing, first) = slot.get();
            if same(existing, value) {
                tracing::debug!(name = %slot.key(), first = %first.display(), again = %source.display(), "identical redeclaration");
                Ok(())
            } else {
                Err(CompileError::DuplicateType {
                    name: slot.key().clone(),
                    first: first.clone(),
                    second: source.to_path_buf(),
                })
            }
        }
    }
}

fn lookup(index: &BTreeMap<String, TypeId>, r: &NameRef, document: &Path) -> Result<TypeId> {
    let (primary, fallback) = r.candidates();
    index
        .get(&primary.full())
        .or_else(|| fallback.and_then(|f| index.get(&f.full())))
        .copied()
        .ok_or_else(|| CompileError::UnresolvedReference { document: document.to_path_buf(), name: primary.full() })
}

/// References compared by the name they denote, not how they were spelled.
fn spelled_out(r: &NameRef) -> std::result::Result<String, ()> {
    Ok(r.candidates().0.full())
}

fn same_type(a: &NamedType<NameRef>, b: &NamedType<NameRef>) -> bool {
    match (a.try_map(&mut spelled_out), b.try_map(&mut spelled_out)) {
        (Ok(a), Ok(b)) => a.same_shape(&b),
        _ => false,
    }
}

fn same_protocol(a: &Protocol<NameRef>, b: &Protocol<NameRef>) -> bool {
    match (a.try_map(&mut spelled_out), b.try_map(&mut spelled_out)) {
        (Ok(a), Ok(b)) => a.same_shape(&b),
        _ => false,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ir::{NamedKind, TypeRef};
    use crate::parse::{parse_protocol, parse_schema};

    fn schema(path: &str, src: &str) -> Document {
        parse_schema(Path::new(path), src).unwrap()
    }

    fn named_field(graph: &TypeGraph, owner: &str, field: usize) -> TypeId {
        let id = graph.lookup(owner).unwrap();
        match graph.get(id).fields()[field].ty.optional_of().unwrap_or(&graph.get(id).fields()[field].ty) {
            TypeRef::Named(target) => *target,
            other => panic!("expected a named type, found {other:?}"),
        }
    }

    #[test]
    fn self_and_forward_references_resolve_in_any_order() {
        let node = schema(
            "b/node.avsc",
            r#"{"type": "record", "name": "Node", "namespace": "com.example",
                "fields": [{"name": "next", "type": ["null", "Node"]}, {"name": "leaf", "type": "Leaf"}]}"#,
        );
        let leaf = schema(
            "a/leaf.avsc",
            r#"{"type": "record", "name": "Leaf", "namespace": "com.example", "fields": [{"name": "v", "type": "int"}]}"#,
        );
        let one = resolve(vec![node.clone(), leaf.clone()]).unwrap();
        let two = resolve(vec![leaf, node]).unwrap();
        assert_eq!(one, two);

        let node_id = one.lookup("com.example.Node").unwrap();
        assert_eq!(named_field(&one, "com.example.Node", 0), node_id);
        assert_eq!(named_field(&one, "com.example.Node", 1), one.lookup("com.example.Leaf").unwrap());
        assert_eq!(one.origin(node_id), Path::new("b/node.avsc"));
    }

    #[test]
    fn unresolved_reference_names_the_qualified_candidate() {
        let doc = schema(
            "user.avsc",
            r#"{"type": "record", "name": "User", "namespace": "com.example",
                "fields": [{"name": "m", "type": "Missing"}]}"#,
        );
        let err = resolve(vec![doc]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
        assert!(err.to_string().contains("com.example.Missing"), "{err}");
        assert_eq!(err.artifact(), Some(Path::new("user.avsc")));
    }

    #[test]
    fn bare_names_fall_back_to_the_null_namespace() {
        let global = schema("g.avsc", r#"{"type": "enum", "name": "Color", "symbols": ["RED"]}"#);
        let user = schema(
            "u.avsc",
            r#"{"type": "record", "name": "User", "namespace": "com.example", "fields": [{"name": "c", "type": "Color"}]}"#,
        );
        let graph = resolve(vec![user, global]).unwrap();
        assert_eq!(named_field(&graph, "com.example.User", 0), graph.lookup("Color").unwrap());
    }

    #[test]
    fn identical_redeclaration_is_accepted_and_conflicts_are_not() {
        let a = r#"{"type": "record", "name": "Foo", "namespace": "com.example", "doc": "one",
                    "fields": [{"name": "x", "type": "int"}]}"#;
        let b = r#"{"type": "record", "name": "Foo", "namespace": "com.example", "doc": "two",
                    "fields": [{"name": "x", "type": "int"}]}"#;
        let c = r#"{"type": "record", "name": "Foo", "namespace": "com.example",
                    "fields": [{"name": "y", "type": "long"}]}"#;
        let graph = resolve(vec![schema("a.avsc", a), schema("b.avsc", b)]).unwrap();
        assert_eq!(graph.types().count(), 1);

        let err = resolve(vec![schema("c.avsc", c), schema("a.avsc", a)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateType);
        match err {
            CompileError::DuplicateType { name, first, second } => {
                assert_eq!(name, "com.example.Foo");
                assert_eq!(first, Path::new("a.avsc"));
                assert_eq!(second, Path::new("c.avsc"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn protocol_sharing_a_type_name_is_a_duplicate() {
        let record = schema(
            "a/service.avsc",
            r#"{"type": "record", "name": "Service", "namespace": "com.example", "fields": []}"#,
        );
        let protocol =
            parse_protocol(Path::new("b/service.avpr"), r#"{"protocol": "Service", "namespace": "com.example"}"#)
                .unwrap();
        for docs in [vec![record.clone(), protocol.clone()], vec![protocol, record]] {
            match resolve(docs).unwrap_err() {
                CompileError::DuplicateType { name, first, second } => {
                    assert_eq!(name, "com.example.Service");
                    assert_eq!(first, Path::new("a/service.avsc"));
                    assert_eq!(second, Path::new("b/service.avpr"));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn inline_and_hoisted_spellings_are_the_same_type() {
        let inline = schema(
            "inline.avsc",
            r#"{"type": "record", "name": "Outer", "namespace": "x", "fields": [
                {"name": "i", "type": {"type": "fixed", "name": "Id", "size": 4}}]}"#,
        );
        let separate = parse_protocol(
            Path::new("p.avpr"),
            r#"{"protocol": "P", "namespace": "x", "types": [
                {"type": "fixed", "name": "Id", "size": 4},
                {"type": "record", "name": "Outer", "fields": [{"name": "i", "type": "Id"}]}]}"#,
        )
        .unwrap();
        let graph = resolve(vec![inline, separate]).unwrap();
        assert_eq!(graph.types().count(), 2);
        let protocol = &graph.protocols()[0];
        assert_eq!(protocol.types, vec![graph.lookup("x.Id").unwrap(), graph.lookup("x.Outer").unwrap()]);
        assert!(matches!(graph.get(graph.lookup("x.Id").unwrap()).kind, NamedKind::Fixed { size: 4, .. }));
    }

    #[test]
    fn message_signatures_are_resolved() {
        let doc = parse_protocol(
            Path::new("svc.avpr"),
            r#"{"protocol": "Svc", "namespace": "x", "types": [],
                "messages": {"get": {"request": [{"name": "id", "type": "Key"}], "response": "null"}}}"#,
        )
        .unwrap();
        let err = resolve(vec![doc]).unwrap_err();
        assert!(err.to_string().contains("x.Key"), "{err}");
    }
}
