//! Checker configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use deon_types::MAX_DIAGNOSTICS;

/// Default bound on nested synthesis/checking calls per pass.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Tunables for one check pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckOptions {
    /// Nesting bound for synthesis; deeper requests produce a recursion error.
    pub max_depth: usize,
    /// Errors stored in a result before the rest are only counted.
    pub max_diagnostics: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_diagnostics: MAX_DIAGNOSTICS,
        }
    }
}

/// Failure to load [`CheckOptions`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid checker options: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_depth must be at least 1")]
    ZeroDepth,
}

impl CheckOptions {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: CheckOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        assert_eq!(CheckOptions::from_json("{}").unwrap(), CheckOptions::default());
    }

    #[test]
    fn partial_json_overrides_one_field() {
        let options = CheckOptions::from_json(r#"{"max_depth": 16}"#).unwrap();
        assert_eq!(options.max_depth, 16);
        assert_eq!(options.max_diagnostics, MAX_DIAGNOSTICS);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = CheckOptions::from_json(r#"{"depth": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_depth_is_rejected() {
        let err = CheckOptions::from_json(r#"{"max_depth": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroDepth));
        assert_eq!(err.to_string(), "max_depth must be at least 1");
    }
}
