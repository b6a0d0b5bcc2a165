//! Parser configuration.
//!
//! Options can be built in code or loaded from a YAML or JSON file; missing
//! keys fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::state::DEFAULT_MAX_STACK_DEPTH;
use crate::errors::SkeinError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Upper bound on nested rule scopes before the parser gives up.
    pub max_stack_depth: usize,
    /// Report every warning as an error.
    pub warnings_as_errors: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            warnings_as_errors: false,
        }
    }
}

impl ParseOptions {
    /// Reads options from `path`; `.json` files are JSON, anything else YAML.
    pub fn load(path: &Path) -> Result<Self, SkeinError> {
        let text = std::fs::read_to_string(path).map_err(|e| SkeinError::io(path, e))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text).map_err(|message| SkeinError::Config {
                path: path.to_path_buf(),
                message,
            })
        } else {
            Self::from_yaml(&text).map_err(|message| SkeinError::Config {
                path: path.to_path_buf(),
                message,
            })
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert_eq!(options.max_stack_depth, 200);
        assert!(!options.warnings_as_errors);
    }

    #[test]
    fn test_partial_yaml() {
        let options = ParseOptions::from_yaml("warnings_as_errors: true\n").unwrap();
        assert!(options.warnings_as_errors);
        assert_eq!(options.max_stack_depth, 200);
    }

    #[test]
    fn test_json() {
        let options = ParseOptions::from_json(r#"{"max_stack_depth": 64}"#).unwrap();
        assert_eq!(options.max_stack_depth, 64);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(ParseOptions::from_yaml("max_stack_depth: lots").is_err());
    }
}
