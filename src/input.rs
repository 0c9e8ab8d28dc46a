//! Input artifacts and the notation classifier.
use std::path::{Path, PathBuf};

use crate::error::CompileError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// The three notations the pipeline understands, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// `.avsc`, a standalone named-type definition.
    Schema,
    /// `.avpr`, a JSON protocol document.
    Protocol,
    /// `.avdl`, the textual IDL.
    InterfaceDefinition,
}

/// One physical input file. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputArtifact {
    pub path: PathBuf,
    pub content: String,
}

/// Inputs partitioned by notation, each bucket sorted by path.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    pub schemas: Vec<InputArtifact>,
    pub protocols: Vec<InputArtifact>,
    pub idl: Vec<InputArtifact>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ArtifactKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "avsc" => Some(ArtifactKind::Schema),
            "avpr" => Some(ArtifactKind::Protocol),
            "avdl" => Some(ArtifactKind::InterfaceDefinition),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Schema => "avsc",
            ArtifactKind::Protocol => "avpr",
            ArtifactKind::InterfaceDefinition => "avdl",
        }
    }
}

impl InputArtifact {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self { path: path.into(), content: content.into() }
    }

    pub fn kind(&self) -> Option<ArtifactKind> {
        ArtifactKind::from_path(&self.path)
    }
}

impl Classified {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.protocols.is_empty() && self.idl.is_empty()
    }

    pub fn len(&self) -> usize {
        self.schemas.len() + self.protocols.len() + self.idl.len()
    }

    /// Which notations are present at all.
    pub fn present_kinds(&self) -> Vec<ArtifactKind> {
        let mut kinds = Vec::new();
        if !self.schemas.is_empty() { kinds.push(ArtifactKind::Schema); }
        if !self.protocols.is_empty() { kinds.push(ArtifactKind::Protocol); }
        if !self.idl.is_empty() { kinds.push(ArtifactKind::InterfaceDefinition); }
        kinds
    }
}

/// Partition artifacts by extension. Unknown extensions land in no bucket.
pub fn classify<I>(artifacts: I) -> Classified
where
    I: IntoIterator<Item = InputArtifact>,
{
    let mut out = Classified::default();
    for artifact in artifacts {
        match artifact.kind() {
            Some(ArtifactKind::Schema) => out.schemas.push(artifact),
            Some(ArtifactKind::Protocol) => out.protocols.push(artifact),
            Some(ArtifactKind::InterfaceDefinition) => out.idl.push(artifact),
            None => tracing::debug!(path = %artifact.path.display(), "ignoring input with unknown extension"),
        }
    }
    for bucket in [&mut out.schemas, &mut out.protocols, &mut out.idl] {
        bucket.sort_by(|a, b| a.path.cmp(&b.path));
    }
    out
}

/// Read every path that carries a known extension.
///
/// Paths that are missing, are not regular files, or cannot be read as UTF-8
/// text are not fatal: they come back in the second vector as
/// [`CompileError::Io`] values.
pub fn read_inputs<I, P>(paths: I) -> (Vec<InputArtifact>, Vec<CompileError>)
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut artifacts = Vec::new();
    let mut skipped = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if ArtifactKind::from_path(path).is_none() {
            continue;
        }
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "input does not exist or is not a file; skipping");
            skipped.push(CompileError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a regular file"),
            ));
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => artifacts.push(InputArtifact::new(path, content)),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "input is unreadable; skipping");
                skipped.push(CompileError::io(path, error));
            }
        }
    }
    (artifacts, skipped)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_buckets_by_extension_and_drops_unknown() {
        let inputs = vec![
            InputArtifact::new("b/user.avsc", "{}"),
            InputArtifact::new("service.avpr", "{}"),
            InputArtifact::new("api.avdl", "protocol P {}"),
            InputArtifact::new("README.md", "# hi"),
            InputArtifact::new("a/order.avsc", "{}"),
        ];
        let classified = classify(inputs);
        assert_eq!(classified.len(), 4);
        assert_eq!(classified.schemas[0].path, PathBuf::from("a/order.avsc"));
        assert_eq!(classified.protocols.len(), 1);
        assert_eq!(classified.idl.len(), 1);
        assert_eq!(
            classified.present_kinds(),
            vec![ArtifactKind::Schema, ArtifactKind::Protocol, ArtifactKind::InterfaceDefinition]
        );
    }

    #[test]
    fn classify_empty_input_is_empty() {
        let classified = classify(Vec::new());
        assert!(classified.is_empty());
        assert!(classified.present_kinds().is_empty());
    }

    #[test]
    fn read_inputs_skips_missing_paths() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let present = dir.path().join("a.avsc");
        std::fs::write(&present, "\"int\"").unwrap();
        let missing = dir.path().join("nope.avsc");
        let unrelated = dir.path().join("notes.txt");

        let (artifacts, skipped) = read_inputs([&present, &missing, &unrelated]);
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].content, "\"int\"");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].kind(), crate::error::ErrorKind::Io);
    }
}
