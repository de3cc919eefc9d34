//! Cheap, sampling change detection between two snapshots of a record set.
//!
//! Hash equality short-circuits. Otherwise only the length and the first few
//! items are compared, so cost stays constant however large the data set is.

use crate::metrics::content_hash;
use serde::{Deserialize, Serialize};

/// Items compared pairwise when the hashes differ.
const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Content,
    Structure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Outcome of comparing two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub has_changed: bool,
    pub change_type: ChangeType,
    pub confidence: f64,
    /// `array-length` and/or `item-<i>` tags.
    pub changed_elements: Vec<String>,
    pub severity: Severity,
}

impl ChangeReport {
    fn unchanged() -> Self {
        Self {
            has_changed: false,
            change_type: ChangeType::Content,
            confidence: 1.0,
            changed_elements: Vec::new(),
            severity: Severity::Low,
        }
    }

    fn cold_start() -> Self {
        Self {
            has_changed: true,
            change_type: ChangeType::Content,
            confidence: 1.0,
            changed_elements: Vec::new(),
            severity: Severity::High,
        }
    }
}

/// Compare `previous` and `current`. A missing side always counts as a change.
pub fn detect<R>(previous: Option<&[R]>, current: Option<&[R]>) -> ChangeReport
where
    R: Serialize + PartialEq,
{
    let (Some(previous), Some(current)) = (previous, current) else {
        return ChangeReport::cold_start();
    };

    if content_hash(previous) == content_hash(current) {
        return ChangeReport::unchanged();
    }

    let mut changed_elements = Vec::new();
    let mut comparisons = 1usize;

    if previous.len() != current.len() {
        changed_elements.push("array-length".to_string());
    }

    let sample = SAMPLE_SIZE.min(previous.len()).min(current.len());
    for (i, (before, after)) in previous.iter().zip(current.iter()).take(sample).enumerate() {
        comparisons += 1;
        if before != after {
            changed_elements.push(format!("item-{i}"));
        }
    }

    let change_ratio = changed_elements.len() as f64 / comparisons as f64;

    let change_type = if change_ratio > 0.5 { ChangeType::Structure } else { ChangeType::Content };
    let severity = if change_ratio > 0.7 {
        Severity::High
    } else if change_ratio > 0.3 {
        Severity::Medium
    } else {
        Severity::Low
    };

    ChangeReport {
        has_changed: true,
        change_type,
        confidence: (change_ratio + 0.1).min(0.95),
        changed_elements,
        severity,
    }
}
