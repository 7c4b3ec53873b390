//! Core domain types shared by the importer and the record sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SeasonIndex
// ---------------------------------------------------------------------------

/// One index document of the liturgy volume and the season it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonIndex {
    /// Archive member name of the index document.
    pub index_file: String,
    /// Season label attached to every entry found in this index.
    pub season: String,
}

impl SeasonIndex {
    pub fn new(index_file: impl Into<String>, season: impl Into<String>) -> Self {
        Self {
            index_file: index_file.into(),
            season: season.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// LiturgyEntry
// ---------------------------------------------------------------------------

/// A single imported liturgy entry, ready for bulk storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiturgyEntry {
    /// Season label from the index mapping.
    pub season: String,
    /// Link text of the index entry.
    pub title: String,
    /// Discovery position across the whole run. Unique and strictly increasing.
    pub order: u32,
    /// Archive members concatenated into `html_content`, in order.
    pub source_files: Vec<String>,
    /// Sanitized, non-empty markup.
    pub html_content: String,
    /// Import timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_with_record_field_names() {
        let entry = LiturgyEntry {
            season: "Advent".into(),
            title: "First Sunday of Advent".into(),
            order: 1,
            source_files: vec!["V1AD01.sun_split_000.htm".into()],
            html_content: "<p>Come, Lord</p>".into(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&entry).expect("serialize");
        assert!(json.get("htmlContent").is_some());
        assert!(json.get("sourceFiles").is_some());
        assert!(json.get("createdAt").is_some());

        let parsed: LiturgyEntry = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, entry);
    }
}
