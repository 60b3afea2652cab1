//! Builder configuration

use serde::{Deserialize, Serialize};
use strata_common::CompilerError;

/// Options controlling IR construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Width of the default `int` type
    pub int_width: u16,
    /// Width of the integer substituted for unresolved types and identifiers
    pub fallback_int_width: u16,
    /// Pointer size in bytes
    pub pointer_size: u64,
    pub entry_module: String,
    pub entry_function: String,
    /// Name of the generated runtime initializer
    pub init_function: String,
    /// Fail the build when any fallback was taken
    pub strict: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            int_width: 32,
            fallback_int_width: 64,
            pointer_size: 8,
            entry_module: "main".to_string(),
            entry_function: "main".to_string(),
            init_function: "_init_globals".to_string(),
            strict: false,
        }
    }
}

impl BuildOptions {
    /// Parse options from JSON; missing fields keep their defaults
    pub fn from_json(text: &str) -> Result<Self, CompilerError> {
        let options: BuildOptions = serde_json::from_str(text)
            .map_err(|e| CompilerError::config_error(format!("invalid build options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), CompilerError> {
        for (what, width) in [("int_width", self.int_width), ("fallback_int_width", self.fallback_int_width)] {
            if !matches!(width, 8 | 16 | 32 | 64) {
                return Err(CompilerError::config_error(format!(
                    "{what} must be 8, 16, 32 or 64, got {width}"
                )));
            }
        }
        if !matches!(self.pointer_size, 4 | 8) {
            return Err(CompilerError::config_error(format!(
                "pointer_size must be 4 or 8, got {}",
                self.pointer_size
            )));
        }
        if self.entry_function.is_empty() || self.init_function.is_empty() {
            return Err(CompilerError::config_error(
                "entry_function and init_function must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = BuildOptions::default();
        assert_eq!(options.int_width, 32);
        assert_eq!(options.fallback_int_width, 64);
        assert_eq!(options.init_function, "_init_globals");
        assert!(!options.strict);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let options = BuildOptions::from_json(r#"{ "strict": true, "pointer_size": 4 }"#).unwrap();
        assert_eq!(
            options,
            BuildOptions {
                strict: true,
                pointer_size: 4,
                ..BuildOptions::default()
            }
        );
    }

    #[test]
    fn test_from_json_rejects_bad_width() {
        let err = BuildOptions::from_json(r#"{ "int_width": 12 }"#).unwrap_err();
        assert!(matches!(err, CompilerError::ConfigError { .. }));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(BuildOptions::from_json("{ strict: yes").is_err());
    }
}
