use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_text, Resource, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingItem {
    pub item: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackingDraft {
    pub item: String,
}

impl Resource for PackingItem {
    const COLLECTION: &'static str = "packingLists";

    type Draft = PackingDraft;

    fn to_draft(&self) -> PackingDraft {
        PackingDraft {
            item: self.item.clone(),
        }
    }

    fn from_draft(draft: &PackingDraft, _now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(PackingItem {
            item: require_text("item", &draft.item)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kept_untrimmed() {
        let draft = PackingDraft {
            item: " Charger ".into(),
        };
        let item = PackingItem::from_draft(&draft, Utc::now()).unwrap();
        assert_eq!(item.item, " Charger ");
    }

    #[test]
    fn test_empty_item_rejected() {
        let err = PackingItem::from_draft(&PackingDraft::default(), Utc::now()).unwrap_err();
        assert_eq!(err.field, "item");
    }
}
