//! Incremental Gate.
//!
//! A fingerprint covers everything generation depends on: the inputs (path and
//! content hash, sorted), the validated options, the custom templates, the
//! output root, the import search roots (in order) and the generator version. A state file in the intermediate
//! root remembers the last successful run; the gate only ever decides whether
//! work is repeated, never what the work produces.
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Validated;
use crate::error::{CompileError, Result};
use crate::input::InputArtifact;

pub const STATE_FILE: &str = "avrogen-state.json";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateState {
    pub fingerprint: String,
    pub outputs: Vec<PathBuf>,
    #[serde(default)]
    pub canonical: Vec<PathBuf>,
    /// Files read through IDL imports; not part of the input set, so they
    /// are checked by content on every run.
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub path: PathBuf,
    pub sha256: String,
    /// Searched before `path` and missing; one appearing would shadow it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub absent: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Gate {
    state_path: PathBuf,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

pub fn content_hash(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn fingerprint(
    inputs: &[InputArtifact],
    validated: &Validated,
    output_root: &Path,
    import_roots: &[PathBuf],
) -> String {
    let mut pairs: Vec<(String, String)> = inputs
        .iter()
        .map(|a| (a.path.to_string_lossy().into_owned(), content_hash(a.content.as_bytes())))
        .collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
    hasher.update(b"\0");
    for (path, hash) in &pairs {
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(b"\0");
    hasher.update(serde_json::to_vec(&validated.config).unwrap_or_default());
    for (name, text) in validated.templates.contents() {
        hasher.update(b"\0");
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
        hasher.update(text.as_bytes());
    }
    hasher.update(b"\0");
    hasher.update(output_root.to_string_lossy().as_bytes());
    for root in import_roots {
        hasher.update(b"\0");
        hasher.update(root.to_string_lossy().as_bytes());
    }
    hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
}

impl Dependency {
    pub fn read(path: &Path, absent: Vec<PathBuf>) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| CompileError::io(path, e))?;
        Ok(Self { path: path.to_path_buf(), sha256: content_hash(&bytes), absent })
    }

    fn is_unchanged(&self) -> bool {
        self.absent.iter().all(|p| !p.is_file())
            && fs::read(&self.path).is_ok_and(|bytes| content_hash(&bytes) == self.sha256)
    }
}

impl Gate {
    pub fn new(intermediate_root: &Path) -> Self {
        Self { state_path: intermediate_root.join(STATE_FILE) }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// The recorded state when it proves the last run is still current.
    pub fn check(&self, fingerprint: &str) -> Option<GateState> {
        let text = fs::read_to_string(&self.state_path).ok()?;
        let state: GateState = match serde_json::from_str(&text) {
            Ok(state) => state,
            Err(err) => {
                tracing::debug!(state = %self.state_path.display(), %err, "ignoring unreadable gate state");
                return None;
            }
        };
        if state.fingerprint != fingerprint {
            tracing::debug!("fingerprint changed");
            return None;
        }
        if let Some(missing) = state.outputs.iter().chain(&state.canonical).find(|p| !p.is_file()) {
            tracing::debug!(missing = %missing.display(), "recorded output is gone");
            return None;
        }
        if let Some(changed) = state.dependencies.iter().find(|d| !d.is_unchanged()) {
            tracing::debug!(import = %changed.path.display(), "imported file changed");
            return None;
        }
        Some(state)
    }

    pub fn record(&self, state: &GateState) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CompileError::io(parent, e))?;
        }
        let text = serde_json::to_string_pretty(state)
            .map_err(|e| CompileError::io(&self.state_path, std::io::Error::other(e)))?;
        fs::write(&self.state_path, text).map_err(|e| CompileError::io(&self.state_path, e))
    }

    /// Forget the last run so the next one starts from scratch.
    pub fn invalidate(&self) {
        match fs::remove_file(&self.state_path) {
            Ok(()) => tracing::debug!(state = %self.state_path.display(), "gate state cleared"),
            Err(err) if err.kind() == IoErrorKind::NotFound => {}
            Err(err) => tracing::warn!(state = %self.state_path.display(), %err, "could not clear gate state"),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
