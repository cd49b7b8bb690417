use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_text, Resource, ValidationError};

/// A photo picked from the device library with an optional note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub uri: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDraft {
    pub uri: String,
    pub note: String,
}

impl Resource for Memory {
    const COLLECTION: &'static str = "memories";

    type Draft = MemoryDraft;

    fn to_draft(&self) -> MemoryDraft {
        MemoryDraft {
            uri: self.uri.clone(),
            note: self.note.clone(),
        }
    }

    fn from_draft(draft: &MemoryDraft, _now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Memory {
            uri: require_text("uri", &draft.uri)?,
            note: draft.note.clone(),
        })
    }
}
