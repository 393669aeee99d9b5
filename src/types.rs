//! Shared types passed between the ingestor, the session, and storage.

use serde::Serialize;
use std::fmt;

/// One unit of work from the shot list: photograph this item, in this
/// colorway, from this view, and save it under this filename.
///
/// Shots are built by [`crate::ingest`] and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shot {
    /// Stable key derived from the data row index (`shot-0`, `shot-1`, …).
    /// Display keying only; carries no meaning.
    pub key: String,
    pub item_id: String,
    pub item_color: String,
    pub view_type: String,
    /// Required output filename, never empty.
    pub filename: String,
}

/// Ordered shots; order is capture order.
///
/// Every element has a non-empty `filename`. Only the ingestor builds
/// non-empty lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShotList {
    shots: Vec<Shot>,
}

impl ShotList {
    pub(crate) fn new(shots: Vec<Shot>) -> Self {
        debug_assert!(shots.iter().all(|s| !s.filename.is_empty()));
        Self { shots }
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Shot> {
        self.shots.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Shot> {
        self.shots.iter()
    }
}

impl<'a> IntoIterator for &'a ShotList {
    type Item = &'a Shot;
    type IntoIter = std::slice::Iter<'a, Shot>;

    fn into_iter(self) -> Self::IntoIter {
        self.shots.iter()
    }
}

/// Which persistence path stored an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMethod {
    /// Written into the operator-granted directory.
    Capability,
    /// Handed to the downloads fallback.
    Fallback,
}

impl fmt::Display for SaveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveMethod::Capability => write!(f, "directory"),
            SaveMethod::Fallback => write!(f, "download"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::shot_list;

    #[test]
    fn shot_list_serializes_as_array() {
        let json = serde_json::to_value(shot_list(1)).unwrap();
        assert_eq!(json[0]["filename"], "shot-0.jpg");
        assert_eq!(json[0]["item_id"], "item-0");
    }

    #[test]
    fn save_method_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SaveMethod::Capability).unwrap(),
            "\"capability\""
        );
        assert_eq!(SaveMethod::Fallback.to_string(), "download");
    }
}
