//! BusConfig - codec と型解決の設定値
//!
//! JSON から読み込めます。省略したキーはデフォルト値になります。
//!
//! ```json
//! { "content_type": "TASK_DATA", "max_nesting_depth": 32, "on_conflict": "replace" }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content-type tag marking a body as a serialized task envelope.
pub const TASK_DATA: &str = "TASK_DATA";

/// Header key carrying the task class.
pub const TASK_CLASS: &str = "TASK_CLASS";

/// What `TypeRegistry::register` does when a task class is registered again
/// with a different descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Fail with `RegistryError::Conflict`.
    #[default]
    Reject,
    /// Last write wins.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    pub content_type: String,
    pub task_class_header: String,
    /// How many ancestry levels the resolver inspects before giving up.
    pub max_ancestry_depth: usize,
    /// How deeply type arguments may nest.
    pub max_nesting_depth: usize,
    pub on_conflict: ConflictPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            content_type: TASK_DATA.to_string(),
            task_class_header: TASK_CLASS.to_string(),
            max_ancestry_depth: 16,
            max_nesting_depth: 64,
            on_conflict: ConflictPolicy::Reject,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bus configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("`{0}` must not be empty")]
    Empty(&'static str),

    #[error("`{0}` must be at least 1")]
    Zero(&'static str),
}

impl BusConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_type.is_empty() {
            return Err(ConfigError::Empty("content_type"));
        }
        if self.task_class_header.is_empty() {
            return Err(ConfigError::Empty("task_class_header"));
        }
        if self.max_ancestry_depth == 0 {
            return Err(ConfigError::Zero("max_ancestry_depth"));
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Zero("max_nesting_depth"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_document_yields_defaults() {
        let config = BusConfig::from_json_str("{}").unwrap();
        assert_eq!(config, BusConfig::default());
        assert_eq!(config.content_type, "TASK_DATA");
        assert_eq!(config.task_class_header, "TASK_CLASS");
    }

    #[test]
    fn partial_document_overrides_only_named_keys() {
        let config =
            BusConfig::from_json_str(r#"{ "max_nesting_depth": 8, "on_conflict": "replace" }"#)
                .unwrap();
        assert_eq!(config.max_nesting_depth, 8);
        assert_eq!(config.on_conflict, ConflictPolicy::Replace);
        assert_eq!(config.max_ancestry_depth, 16);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = BusConfig::from_json_str(r#"{ "contnet_type": "X" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[rstest]
    #[case(r#"{ "content_type": "" }"#, "content_type")]
    #[case(r#"{ "task_class_header": "" }"#, "task_class_header")]
    #[case(r#"{ "max_ancestry_depth": 0 }"#, "max_ancestry_depth")]
    #[case(r#"{ "max_nesting_depth": 0 }"#, "max_nesting_depth")]
    fn invalid_values_name_the_field(#[case] doc: &str, #[case] field: &str) {
        let err = BusConfig::from_json_str(doc).unwrap_err();
        assert!(err.to_string().contains(field), "{err}");
    }
}
