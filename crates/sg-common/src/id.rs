//! Collection-run identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Run ID for tracking collection runs.
///
/// Format: `run-<date>-<time>-<random>`
/// Example: `run-20260826-143022-a1b2c3`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new run ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let random: String = uuid::Uuid::new_v4().to_string().chars().take(6).collect();
        RunId(format!("run-{}-{}", now.format("%Y%m%d-%H%M%S"), random))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_format() {
        let rid = RunId::new();
        assert!(rid.0.starts_with("run-"));
        assert!(rid.0.len() > 19);
    }

    #[test]
    fn test_run_id_serializes_transparently() {
        let rid = RunId::new();
        let json = serde_json::to_string(&rid).unwrap();
        assert_eq!(json, format!("{:?}", rid.0));
    }
}
