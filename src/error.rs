//! Typed failures of a compilation run.
//!
//! Every stage reports through [`CompileError`]. All variants except the
//! skipped-input flavour of [`CompileError::Io`] abort the whole batch before
//! any output is written.
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// A document's own syntax or shape is invalid.
    #[error("malformed definition in {}: {cause}", file.display())]
    Malformed { file: PathBuf, cause: String },

    /// An IDL document parsed fine but declares no protocol.
    #[error("IDL file {} does not contain a protocol", file.display())]
    MissingProtocol { file: PathBuf },

    /// Two declarations share a qualified name with different structure, or a
    /// protocol and a named type share one.
    #[error(
        "duplicate definition of {name}: {} and {} declare it differently",
        first.display(),
        second.display()
    )]
    DuplicateType {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A type reference names something no document declares.
    #[error("unresolved reference to {name} in {}", document.display())]
    UnresolvedReference { document: PathBuf, name: String },

    /// The generation options contradict each other or cannot be honored.
    #[error("invalid configuration ({}): {message}", options.join(", "))]
    Configuration {
        options: Vec<&'static str>,
        message: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Discriminant of [`CompileError`], handy for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedDefinition,
    MissingProtocol,
    DuplicateType,
    UnresolvedReference,
    Configuration,
    Io,
}

pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
    pub fn malformed(file: impl Into<PathBuf>, cause: impl Into<String>) -> Self {
        CompileError::Malformed { file: file.into(), cause: cause.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io { path: path.into(), source }
    }

    pub fn configuration(options: &[&'static str], message: impl Into<String>) -> Self {
        CompileError::Configuration { options: options.to_vec(), message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Malformed { .. } => ErrorKind::MalformedDefinition,
            CompileError::MissingProtocol { .. } => ErrorKind::MissingProtocol,
            CompileError::DuplicateType { .. } => ErrorKind::DuplicateType,
            CompileError::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            CompileError::Configuration { .. } => ErrorKind::Configuration,
            CompileError::Io { .. } => ErrorKind::Io,
        }
    }

    /// The artifact the failure is attributed to, when there is one.
    pub fn artifact(&self) -> Option<&Path> {
        match self {
            CompileError::Malformed { file, .. } | CompileError::MissingProtocol { file } => Some(file),
            CompileError::DuplicateType { second, .. } => Some(second),
            CompileError::UnresolvedReference { document, .. } => Some(document),
            CompileError::Io { path, .. } => Some(path),
            CompileError::Configuration { .. } => None,
        }
    }
}
