//! TaskClass - envelope の所有者を示す識別子
//!
//! # 命名規約
//! - `{namespace}.{Name}`
//! - 例: `billing.ChargeTask`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names the runner whose shape an envelope belongs to.
///
/// The identifier crosses process boundaries as a plain string (header value
/// and `taskClass` body field), so it carries no structure of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskClass(String);

impl TaskClass {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TaskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for TaskClass {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskClass {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskClass {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_bare_string() {
        let class = TaskClass::new("billing.ChargeTask");
        let s = serde_json::to_string(&class).unwrap();
        assert_eq!(s, "\"billing.ChargeTask\"");

        let back: TaskClass = serde_json::from_str(&s).unwrap();
        assert_eq!(back, class);
    }

    #[test]
    fn default_is_empty() {
        assert!(TaskClass::default().is_empty());
        assert!(!TaskClass::from("a.B").is_empty());
    }
}
