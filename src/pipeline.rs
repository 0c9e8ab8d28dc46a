//! Entry point wiring the stages together.
//!
//! ```text
//! read → validate options → fingerprint ─┬─ up to date → done
//!                                        └─ classify → normalize IDL → parse
//!                                           → resolve → generate → write all
//! ```
//!
//! Nothing is written until every stage has succeeded, so a failing batch
//! leaves the output tree as the previous run left it.
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::codegen::{self, OutputArtifact};
use crate::config::{GenerationConfig, Validated};
use crate::error::{CompileError, Result};
use crate::gate::{self, Dependency, Gate, GateState};
use crate::idl::{self, ResolvedImport};
use crate::input::{self, InputArtifact};
use crate::parse::{self, Document};
use crate::resolve;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// Input files; entries without a known extension are ignored.
    pub inputs: Vec<PathBuf>,
    pub config: GenerationConfig,
    pub output_root: PathBuf,
    /// Canonical `.avpr` documents and the gate state live here.
    pub intermediate_root: PathBuf,
    /// Searched for IDL imports after the importing file's own directory.
    pub import_roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Generated,
    UpToDate,
}

#[derive(Debug)]
pub struct Compilation {
    pub status: Status,
    /// Generated source files, sorted.
    pub outputs: Vec<PathBuf>,
    /// Normalized IDL documents in the intermediate root.
    pub canonical: Vec<PathBuf>,
    /// Inputs that were missing or unreadable.
    pub skipped: Vec<CompileError>,
}

/// Everything a successful run produced, held in memory until written.
struct Products {
    canonical: Vec<(PathBuf, String)>,
    artifacts: Vec<OutputArtifact>,
    imports: Vec<ResolvedImport>,
}

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

impl CompileRequest {
    pub fn new(inputs: Vec<PathBuf>, output_root: impl Into<PathBuf>, intermediate_root: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            config: GenerationConfig::default(),
            output_root: output_root.into(),
            intermediate_root: intermediate_root.into(),
            import_roots: Vec::new(),
        }
    }
}

pub fn compile(request: &CompileRequest) -> Result<Compilation> {
    let validated = request.config.validate()?;

    let mut paths = request.inputs.clone();
    paths.sort();
    paths.dedup();
    let (artifacts, skipped) = input::read_inputs(&paths);

    let gate = Gate::new(&request.intermediate_root);
    let fingerprint = gate::fingerprint(&artifacts, &validated, &request.output_root, &request.import_roots);
    if let Some(state) = gate.check(&fingerprint) {
        tracing::info!(outputs = state.outputs.len(), "outputs are up to date");
        return Ok(Compilation { status: Status::UpToDate, outputs: state.outputs, canonical: state.canonical, skipped });
    }

    let outcome = build(artifacts, &validated, request).and_then(|products| {
        let state = write(&products, request, fingerprint)?;
        gate.record(&state)?;
        Ok(state)
    });
    match outcome {
        Ok(state) => Ok(Compilation { status: Status::Generated, outputs: state.outputs, canonical: state.canonical, skipped }),
        Err(err) => {
            gate.invalidate();
            Err(err)
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// STAGES
// ————————————————————————————————————————————————————————————————————————————

fn build(artifacts: Vec<InputArtifact>, validated: &Validated, request: &CompileRequest) -> Result<Products> {
    let classified = input::classify(artifacts);
    tracing::info!(
        schemas = classified.schemas.len(),
        protocols = classified.protocols.len(),
        idl = classified.idl.len(),
        "classified inputs"
    );

    let normalization = idl::normalize(&classified.idl, &request.import_roots)?.unwrap_or_default();

    let mut sources: Vec<InputArtifact> = classified.schemas;
    sources.extend(classified.protocols);
    let parsed: Vec<Result<Document>> = sources.par_iter().map(parse::parse_document).collect();
    let mut documents = parsed.into_iter().collect::<Result<Vec<_>>>()?;
    // normalized documents keep the .avdl as their source so errors name the file the user wrote
    let normalized: Vec<Result<Document>> = normalization
        .documents
        .par_iter()
        .map(|doc| parse::parse_protocol(&doc.source, &doc.text))
        .collect();
    documents.extend(normalized.into_iter().collect::<Result<Vec<_>>>()?);
    tracing::debug!(documents = documents.len(), "parsed canonical documents");

    let graph = resolve::resolve(documents)?;
    let artifacts = codegen::generate(&graph, validated);
    let canonical = normalization
        .documents
        .into_iter()
        .map(|doc| (request.intermediate_root.join(&doc.file_name), doc.text))
        .collect();
    Ok(Products { canonical, artifacts, imports: normalization.imports })
}

/// Write intermediate documents and sources. Files whose bytes are already
/// current are left untouched; files from earlier runs that this run no
/// longer produces are left in place as well.
fn write(products: &Products, request: &CompileRequest, fingerprint: String) -> Result<GateState> {
    let mut files: Vec<(PathBuf, &[u8])> = products
        .canonical
        .iter()
        .map(|(path, text)| (path.clone(), text.as_bytes()))
        .collect();
    files.extend(
        products
            .artifacts
            .iter()
            .map(|a| (request.output_root.join(&a.path), a.content.as_slice())),
    );

    let written: Vec<Result<bool>> = files.par_iter().map(|(path, bytes)| write_if_changed(path, bytes)).collect();
    let changed = written.into_iter().collect::<Result<Vec<_>>>()?.into_iter().filter(|c| *c).count();
    tracing::info!(files = files.len(), changed, "wrote outputs");

    let dependencies = products
        .imports
        .iter()
        .map(|import| Dependency::read(&import.path, import.absent.clone()))
        .collect::<Result<Vec<_>>>()?;
    Ok(GateState {
        fingerprint,
        outputs: products.artifacts.iter().map(|a| request.output_root.join(&a.path)).collect(),
        canonical: products.canonical.iter().map(|(path, _)| path.clone()).collect(),
        dependencies,
    })
}

fn write_if_changed(path: &Path, bytes: &[u8]) -> Result<bool> {
    if fs::read(path).is_ok_and(|existing| existing == bytes) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CompileError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| CompileError::io(path, e))?;
    Ok(true)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn failure_writes_nothing_and_clears_the_gate() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.avsc");
        let bad = dir.path().join("bad.avsc");
        fs::write(&good, r#"{"type": "record", "name": "Good", "fields": []}"#).unwrap();
        fs::write(&bad, r#"{"type": "record", "name": "Bad", "fields": [{"name": "x"}]}"#).unwrap();

        let request = CompileRequest::new(vec![good.clone()], dir.path().join("out"), dir.path().join("tmp"));
        assert_eq!(compile(&request).unwrap().outputs.len(), 1);
        assert!(Gate::new(&request.intermediate_root).state_path().exists());

        let request = CompileRequest { inputs: vec![good, bad], ..request };
        let err = compile(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDefinition);
        assert!(!dir.path().join("out").join("Bad.java").exists());
        assert!(!Gate::new(&request.intermediate_root).state_path().exists());
    }

    #[test]
    fn missing_inputs_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let request = CompileRequest::new(vec![dir.path().join("gone.avsc")], dir.path().join("out"), dir.path().join("tmp"));
        let compilation = compile(&request).unwrap();
        assert!(compilation.outputs.is_empty());
        assert_eq!(compilation.skipped.len(), 1);
        assert_eq!(compilation.skipped[0].kind(), ErrorKind::Io);
    }

    #[test]
    fn invalid_options_fail_before_reading_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = CompileRequest::new(vec![dir.path().join("gone.avsc")], dir.path().join("out"), dir.path().join("tmp"));
        request.config.encoding = "KOI8-R".into();
        assert_eq!(compile(&request).unwrap_err().kind(), ErrorKind::Configuration);
    }
}
