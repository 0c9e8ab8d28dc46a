//! Generation options.
//!
//! [`GenerationConfig`] is a plain immutable value: deserialized once (from a
//! JSON file, CLI flags, or both), validated once, then only read. Validation
//! also loads the custom templates, so generation never touches the disk.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Character encoding of emitted files.
    pub encoding: String,
    pub string_type: StringType,
    pub field_visibility: FieldVisibility,
    pub no_setters: bool,
    pub add_null_safe_annotations: bool,
    /// `getOptionalX()` alongside the plain getters.
    pub add_extra_optional_getters: bool,
    /// Plain getters return `Optional` for the selected fields.
    pub optional_getters: Option<OptionalGetters>,
    pub use_big_decimal: bool,
    pub template_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum StringType {
    CharSequence,
    String,
    Utf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldVisibility {
    Private,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionalGetters {
    AllFields,
    OnlyNullableFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    /// Big-endian with a byte order mark.
    Utf16,
    Utf16Be,
    Utf16Le,
    UsAscii,
    Iso8859_1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateKind {
    Record,
    Enum,
    Fixed,
    Protocol,
}

/// Custom templates read from `templateDir`, keyed by artifact kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Templates {
    by_kind: BTreeMap<TemplateKind, String>,
}

/// A config that passed validation, with everything generation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub config: GenerationConfig,
    pub encoding: Encoding,
    pub templates: Templates,
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([A-Za-z]+)\}").expect("placeholder pattern"));

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            encoding: "UTF-8".to_string(),
            string_type: StringType::CharSequence,
            field_visibility: FieldVisibility::Private,
            no_setters: false,
            add_null_safe_annotations: false,
            add_extra_optional_getters: false,
            optional_getters: None,
            use_big_decimal: false,
            template_dir: None,
        }
    }
}

impl GenerationConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        crate::path_de::from_str_with_path(path, &text)
    }

    pub fn validate(&self) -> Result<Validated> {
        let encoding = Encoding::from_name(&self.encoding).ok_or_else(|| {
            CompileError::configuration(&["encoding"], format!("unsupported encoding {:?}", self.encoding))
        })?;
        if self.add_extra_optional_getters && self.optional_getters == Some(OptionalGetters::AllFields) {
            return Err(CompileError::configuration(
                &["addExtraOptionalGetters", "optionalGetters"],
                "every getter already returns Optional with ALL_FIELDS",
            ));
        }
        let templates = match &self.template_dir {
            Some(dir) => Templates::load(dir)?,
            None => Templates::default(),
        };
        Ok(Validated { config: self.clone(), encoding, templates })
    }

    pub fn is_public(&self) -> bool {
        self.field_visibility == FieldVisibility::Public
    }

    /// Whether the plain getter of a field with this nullability returns `Optional`.
    pub fn optional_getter(&self, nullable: bool) -> bool {
        match self.optional_getters {
            Some(OptionalGetters::AllFields) => true,
            Some(OptionalGetters::OnlyNullableFields) => nullable,
            None => false,
        }
    }
}

impl Encoding {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_uppercase().replace('_', "-").as_str() {
            "UTF-8" | "UTF8" => Encoding::Utf8,
            "UTF-16" | "UTF16" => Encoding::Utf16,
            "UTF-16BE" => Encoding::Utf16Be,
            "UTF-16LE" => Encoding::Utf16Le,
            "US-ASCII" | "ASCII" => Encoding::UsAscii,
            "ISO-8859-1" | "LATIN1" => Encoding::Iso8859_1,
            _ => return None,
        })
    }

    /// Unmappable characters become `?`.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Utf16 => {
                let mut out = vec![0xFE, 0xFF];
                out.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
                out
            }
            Encoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Encoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Encoding::UsAscii => text.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' }).collect(),
            Encoding::Iso8859_1 => text.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')).collect(),
        }
    }
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 4] = [TemplateKind::Record, TemplateKind::Enum, TemplateKind::Fixed, TemplateKind::Protocol];

    pub fn file_name(self) -> &'static str {
        match self {
            TemplateKind::Record => "record.tmpl",
            TemplateKind::Enum => "enum.tmpl",
            TemplateKind::Fixed => "fixed.tmpl",
            TemplateKind::Protocol => "protocol.tmpl",
        }
    }
}

impl Templates {
    /// Missing files are fine, the built-in layout applies to that kind.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(CompileError::configuration(
                &["templateDir"],
                format!("{} is not a directory", dir.display()),
            ));
        }
        let mut by_kind = BTreeMap::new();
        for kind in TemplateKind::ALL {
            let path = dir.join(kind.file_name());
            if !path.is_file() {
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|e| CompileError::io(&path, e))?;
            if !text.contains("${declaration}") {
                return Err(CompileError::configuration(
                    &["templateDir"],
                    format!("{} has no ${{declaration}} placeholder", path.display()),
                ));
            }
            tracing::debug!(template = %path.display(), "loaded custom template");
            by_kind.insert(kind, text);
        }
        Ok(Self { by_kind })
    }

    pub fn get(&self, kind: TemplateKind) -> Option<&str> {
        self.by_kind.get(&kind).map(String::as_str)
    }

    /// Fill `${key}` placeholders; unknown ones are left as written.
    pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                vars.iter()
                    .find(|(k, _)| *k == &caps[1])
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// `(file name, text)` pairs in a stable order.
    pub fn contents(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.by_kind.iter().map(|(k, v)| (k.file_name(), v.as_str()))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_and_camel_case_json() {
        let config: GenerationConfig =
            serde_json::from_str(r#"{"noSetters": true, "fieldVisibility": "PUBLIC"}"#).unwrap();
        assert!(config.no_setters);
        assert!(config.is_public());
        assert_eq!(config.encoding, "UTF-8");
        assert_eq!(config.string_type, StringType::CharSequence);
        assert_eq!(config.optional_getters, None);

        let config: GenerationConfig =
            serde_json::from_str(r#"{"optionalGetters": "ONLY_NULLABLE_FIELDS", "stringType": "String"}"#).unwrap();
        assert!(config.optional_getter(true));
        assert!(!config.optional_getter(false));
        assert_eq!(config.string_type, StringType::String);
    }

    #[test]
    fn conflicting_optional_getters_name_both_options() {
        let config = GenerationConfig {
            add_extra_optional_getters: true,
            optional_getters: Some(OptionalGetters::AllFields),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let msg = err.to_string();
        assert!(msg.contains("addExtraOptionalGetters") && msg.contains("optionalGetters"), "{msg}");

        let config = GenerationConfig {
            add_extra_optional_getters: true,
            optional_getters: Some(OptionalGetters::OnlyNullableFields),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let config = GenerationConfig { encoding: "EBCDIC".into(), ..Default::default() };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("encoding"), "{err}");
        let config = GenerationConfig { encoding: "utf-16le".into(), ..Default::default() };
        assert_eq!(config.validate().unwrap().encoding, Encoding::Utf16Le);
    }

    #[test]
    fn encodings() {
        assert_eq!(Encoding::Utf16Be.encode("A"), vec![0x00, 0x41]);
        assert_eq!(Encoding::Utf16.encode("A"), vec![0xFE, 0xFF, 0x00, 0x41]);
        assert_eq!(Encoding::UsAscii.encode("é!"), b"?!".to_vec());
        assert_eq!(Encoding::Iso8859_1.encode("é"), vec![0xE9]);
    }

    #[test]
    fn templates_load_and_render() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("record.tmpl"), "${header}\npackage ${package};\n// ${name}\n${declaration}\n").unwrap();
        let config = GenerationConfig { template_dir: Some(dir.path().to_path_buf()), ..Default::default() };
        let validated = config.validate().unwrap();
        let template = validated.templates.get(TemplateKind::Record).unwrap();
        assert!(validated.templates.get(TemplateKind::Enum).is_none());
        let out = Templates::render(template, &[("header", "/* h */"), ("package", "com.x"), ("name", "Foo")]);
        assert_eq!(out, "/* h */\npackage com.x;\n// Foo\n${declaration}\n");
    }

    #[test]
    fn bad_template_dir_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = GenerationConfig { template_dir: Some(dir.path().join("nope")), ..Default::default() };
        assert_eq!(missing.validate().unwrap_err().kind(), ErrorKind::Configuration);

        fs::write(dir.path().join("enum.tmpl"), "no placeholder here").unwrap();
        let config = GenerationConfig { template_dir: Some(dir.path().to_path_buf()), ..Default::default() };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("templateDir"), "{err}");
    }
}
