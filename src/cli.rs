//! Command line: generate Java sources, or normalize one IDL file.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use walkdir::WalkDir;

use avrogen::config::{FieldVisibility, GenerationConfig, OptionalGetters, StringType};
use avrogen::input::InputArtifact;
use avrogen::pipeline::{self, CompileRequest, Status};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile Avro schemas (.avsc), protocols (.avpr) and IDL (.avdl) into Java sources
#[derive(Parser, Debug)]
#[command(name = "avrogen", version)]
pub struct CommandLineInterface {
    /// more logging: -v for progress, -vv for per-document detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// generate Java sources for every input
    Generate(GenerateOut),
    /// normalize one IDL file into protocol JSON
    Idl(IdlOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal files, directories (walked
    /// recursively) or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// extra directories searched for IDL imports
    #[arg(long = "import-root")]
    import_roots: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct ConfigSettings {
    /// JSON file with generation options; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    string_type: Option<StringType>,

    #[arg(long, value_enum)]
    field_visibility: Option<FieldVisibility>,

    /// do not generate setters
    #[arg(long)]
    no_setters: bool,

    #[arg(long)]
    add_null_safe_annotations: bool,

    /// add getOptionalX() next to every getter
    #[arg(long)]
    add_extra_optional_getters: bool,

    /// getters return Optional for these fields
    #[arg(long, value_enum)]
    optional_getters: Option<OptionalGetters>,

    /// decimals as java.math.BigDecimal
    #[arg(long)]
    use_big_decimal: bool,

    #[arg(long)]
    encoding: Option<String>,

    #[arg(long)]
    template_dir: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    config_settings: ConfigSettings,

    /// output root for generated sources
    #[arg(short, long)]
    out: PathBuf,

    /// scratch directory for normalized IDL and build state
    #[arg(long, default_value = "build/avrogen")]
    intermediate: PathBuf,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct IdlOut {
    /// the .avdl file
    input: PathBuf,

    /// extra directories searched for imports
    #[arg(long = "import-root")]
    import_roots: Vec<PathBuf>,

    /// output .avpr file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ConfigSettings {
    fn load(&self) -> anyhow::Result<GenerationConfig> {
        let mut config = match &self.config {
            Some(path) => GenerationConfig::from_json_file(path)?,
            None => GenerationConfig::default(),
        };
        if let Some(x) = self.string_type {
            config.string_type = x;
        }
        if let Some(x) = self.field_visibility {
            config.field_visibility = x;
        }
        if let Some(x) = self.optional_getters {
            config.optional_getters = Some(x);
        }
        if let Some(x) = &self.encoding {
            config.encoding = x.clone();
        }
        if let Some(x) = &self.template_dir {
            config.template_dir = Some(x.clone());
        }
        config.no_setters |= self.no_setters;
        config.add_null_safe_annotations |= self.add_null_safe_annotations;
        config.add_extra_optional_getters |= self.add_extra_optional_getters;
        config.use_big_decimal |= self.use_big_decimal;
        Ok(config)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> u8 {
        self.verbose
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let inputs = resolve_file_path_patterns(&target.input_settings.input)?;
                let request = CompileRequest {
                    inputs,
                    config: target.config_settings.load()?,
                    output_root: target.out.clone(),
                    intermediate_root: target.intermediate.clone(),
                    import_roots: target.input_settings.import_roots.clone(),
                };
                let compilation = pipeline::compile(&request)?;
                for skipped in &compilation.skipped {
                    eprintln!("{} {skipped}", "skipped:".yellow().bold());
                }
                match compilation.status {
                    Status::UpToDate => {
                        eprintln!("{} {} files", "up to date:".green().bold(), compilation.outputs.len());
                    }
                    Status::Generated => {
                        eprintln!(
                            "{} {} files in {}",
                            "generated:".green().bold(),
                            compilation.outputs.len(),
                            target.out.display()
                        );
                    }
                }
                Ok(())
            }
            Command::Idl(target) => {
                let content = std::fs::read_to_string(&target.input)
                    .with_context(|| format!("reading {}", target.input.display()))?;
                let artifact = InputArtifact::new(&target.input, content);
                let (document, _) = avrogen::idl::normalize_one(&artifact, &target.import_roots)?;
                match &target.out {
                    Some(out) => {
                        if let Some(parent) = out.parent() {
                            std::fs::create_dir_all(parent)?;
                        }
                        std::fs::write(out, &document.text).with_context(|| format!("writing {}", out.display()))?;
                    }
                    None => println!("{}", document.text),
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(entry?);
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            let path = PathBuf::from(pattern);
            if path.is_dir() {
                walk(&path, &mut out)?;
            } else {
                // missing literal paths are reported by the pipeline as skipped
                out.push(path);
            }
        }
    }

    Ok(out)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if entry.file_type().is_file() {
            out.push(entry.into_path());
        }
    }
    Ok(())
}
