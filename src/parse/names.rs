use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CompileError, Result};
use crate::ir::Name;

static SIMPLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("name pattern"));

pub fn is_simple_name(s: &str) -> bool {
    SIMPLE_NAME.is_match(s)
}

/// `what` is a short noun for the message, e.g. "field" or "enum symbol".
pub fn check_simple(file: &Path, what: &str, s: &str) -> Result<()> {
    if is_simple_name(s) {
        Ok(())
    } else {
        Err(CompileError::malformed(file, format!("invalid {what} name {s:?}")))
    }
}

/// Every namespace component and the short name must be simple names.
pub fn check_name(file: &Path, name: &Name) -> Result<()> {
    if let Some(ns) = name.namespace() {
        if !ns.split('.').all(is_simple_name) {
            return Err(CompileError::malformed(file, format!("invalid namespace {ns:?} for {}", name.name)));
        }
    }
    check_simple(file, "type", &name.name)
}
