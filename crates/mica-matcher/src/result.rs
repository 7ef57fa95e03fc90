use serde::{Deserialize, Serialize};

use crate::lookup::IndexStep;

/// Outcome of applying a matcher to a document.
///
/// `array_indices` is present only when a field matcher actually walked
/// arrays; `distance` only when a geo matcher matched. Both are erased
/// whenever `matched` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_indices: Option<Vec<IndexStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl MatchResult {
    pub(crate) fn hit() -> Self {
        MatchResult {
            matched: true,
            array_indices: None,
            distance: None,
        }
    }

    pub(crate) fn miss() -> Self {
        MatchResult {
            matched: false,
            array_indices: None,
            distance: None,
        }
    }

    pub(crate) fn of(matched: bool) -> Self {
        if matched { Self::hit() } else { Self::miss() }
    }
}

/// Combine sub-results with AND semantics, shared by the document and
/// branched layers.
///
/// Short-circuits on the first failure. On success, keeps the first
/// distance and the last array indices reported by any sub-result; on
/// failure both are erased.
pub(crate) fn and_results(results: impl Iterator<Item = MatchResult>) -> MatchResult {
    let mut distance = None;
    let mut array_indices = None;
    for sub in results {
        if !sub.matched {
            return MatchResult::miss();
        }
        if distance.is_none() {
            distance = sub.distance;
        }
        if sub.array_indices.is_some() {
            array_indices = sub.array_indices;
        }
    }
    MatchResult {
        matched: true,
        array_indices,
        distance,
    }
}
