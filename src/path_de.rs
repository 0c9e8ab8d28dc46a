use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::CompileError;

/// Deserialize with JSON-path context in error messages.
pub fn from_value_with_path<T: DeserializeOwned>(file: &Path, value: serde_json::Value) -> Result<T, CompileError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        CompileError::malformed(file, format!("at JSON path {path} → {}", err.into_inner()))
    })
}

/// Parse text into a `serde_json::Value`, reporting line and column on failure.
pub fn parse_json(file: &Path, src: &str) -> Result<serde_json::Value, CompileError> {
    serde_json::from_str(src).map_err(|err| {
        CompileError::malformed(
            file,
            format!("unparsable JSON at line {}, column {}: {err}", err.line(), err.column()),
        )
    })
}

pub fn from_str_with_path<T: DeserializeOwned>(file: &Path, src: &str) -> Result<T, CompileError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        CompileError::malformed(file, format!("at JSON path {path} → {}", err.into_inner()))
    })
}
