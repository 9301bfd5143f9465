//! Read tracking for explainability.
//!
//! Every path a condition reads is recorded, together with the value it
//! resolved to, so that a trace can show which inputs a decision used.

use serde::{Deserialize, Serialize};

/// One path read during condition evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRead {
    pub path: String,
    /// `None` when the path did not resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Collects path reads in first-read order, without duplicates.
#[derive(Debug, Clone, Default)]
pub struct ReadCollector {
    pub reads: Vec<PathRead>,
}

impl ReadCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path access. Later reads of the same path are ignored.
    pub fn record(&mut self, path: &str, value: Option<&serde_json::Value>) {
        if !self.reads.iter().any(|r| r.path == path) {
            self.reads.push(PathRead {
                path: path.to_string(),
                value: value.cloned(),
            });
        }
    }

    pub fn has_read(&self, path: &str) -> bool {
        self.reads.iter().any(|r| r.path == path)
    }

    pub fn into_reads(self) -> Vec<PathRead> {
        self.reads
    }
}
