//! Compile options loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QuillError, QuillResult};
use crate::generate::{Dialect, SqlGenerator};

/// Options for one compile.
///
/// ```toml
/// dialect = "sqlserver"
/// native_boolean = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub dialect: Dialect,
    /// Overrides the dialect's boolean capability.
    pub native_boolean: Option<bool>,
}

impl CompileOptions {
    pub fn from_toml_str(content: &str) -> QuillResult<Self> {
        toml::from_str(content).map_err(|e| QuillError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> QuillResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// `<config dir>/quill/config.toml`, or the defaults when there is none.
    pub fn load_default() -> QuillResult<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Whether resolution may skip predicate/value conversions.
    pub fn native_boolean(&self, generator: &dyn SqlGenerator) -> bool {
        self.native_boolean.unwrap_or_else(|| generator.native_boolean())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quill").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_is_default() {
        let options = CompileOptions::from_toml_str("").unwrap();
        assert_eq!(options, CompileOptions::default());
        assert_eq!(options.dialect, Dialect::SqlServer);
    }

    #[test]
    fn test_parse_options() {
        let options = CompileOptions::from_toml_str("dialect = \"sqlserver\"\nnative_boolean = true").unwrap();
        assert_eq!(options.native_boolean, Some(true));
        assert!(options.native_boolean(options.dialect.generator().as_ref()));
    }

    #[test]
    fn test_unknown_dialect() {
        let err = CompileOptions::from_toml_str("dialect = \"oracle\"").unwrap_err();
        assert!(matches!(err, QuillError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = CompileOptions::load("/nonexistent/quill/config.toml").unwrap_err();
        assert!(matches!(err, QuillError::Io(_)));
    }
}
