//! Plugin options shared by every backend

use serde::{Deserialize, Deserializer, Serialize};
use tinyest::{is_known_version, CURRENT_VERSION};

use crate::ConfigError;

pub const DEFAULT_INCLUDE: &str = "**/*.{js,jsx,ts,tsx,mjs,mts,cjs,cts}";

/// Bundler phase hint, passed through untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforce {
    Pre,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    #[serde(deserialize_with = "one_or_many")]
    pub include: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub exclude: Vec<String>,
    pub enforce: Option<Enforce>,
    /// Treat this dotted path as the root namespace even without an import
    pub force_tgpu_alias: Option<String>,
    /// Skip files that cannot contain kernels before parsing them
    pub early_pruning: bool,
    pub auto_naming_enabled: bool,
    pub ir_version: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            include: vec![DEFAULT_INCLUDE.to_string()],
            exclude: Vec::new(),
            enforce: None,
            force_tgpu_alias: None,
            early_pruning: true,
            auto_naming_enabled: true,
            ir_version: CURRENT_VERSION,
        }
    }
}

impl Options {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let options: Options =
            serde_json::from_str(text).map_err(|e| ConfigError::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_known_version(self.ir_version) {
            return Err(ConfigError::UnsupportedIrVersion(self.ir_version));
        }
        Ok(())
    }
}

/// Accept `"pattern"` as well as `["a", "b"]`
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(pattern) => vec![pattern],
        OneOrMany::Many(patterns) => patterns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::from_json("{}").unwrap();
        assert_eq!(options, Options::default());
        assert!(options.early_pruning);
        assert!(options.auto_naming_enabled);
        assert_eq!(options.ir_version, CURRENT_VERSION);
    }

    #[test]
    fn test_camel_case_fields() {
        let options = Options::from_json(
            r#"{"include": "src/**/*.ts", "exclude": ["**/*.test.ts"], "enforce": "pre",
                "forceTgpuAlias": "gpu", "earlyPruning": false, "autoNamingEnabled": false,
                "irVersion": 1}"#,
        )
        .unwrap();
        assert_eq!(options.include, vec!["src/**/*.ts"]);
        assert_eq!(options.exclude, vec!["**/*.test.ts"]);
        assert_eq!(options.enforce, Some(Enforce::Pre));
        assert_eq!(options.force_tgpu_alias.as_deref(), Some("gpu"));
        assert!(!options.early_pruning);
        assert!(!options.auto_naming_enabled);
        assert_eq!(options.ir_version, 1);
    }

    #[test]
    fn test_rejects_unknown_ir_version() {
        assert_eq!(
            Options::from_json(r#"{"irVersion": 5}"#),
            Err(ConfigError::UnsupportedIrVersion(5))
        );
        assert!(matches!(
            Options::from_json(r#"{"include": 3}"#),
            Err(ConfigError::InvalidOptions(_))
        ));
    }
}
