use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Resource;
use crate::store::{Document, Fields, StoreError};

/// Document field holding the owning user's id.
pub const OWNER_FIELD: &str = "userId";

/// A stored record: the store-assigned id, the owner (if scoped) and the
/// domain value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub fields: T,
}

impl<T: Resource> Record<T> {
    pub fn from_document(doc: Document) -> Result<Self, StoreError> {
        let Document { id, mut fields } = doc;
        let owner_id = match fields.remove(OWNER_FIELD) {
            Some(Value::String(owner)) => Some(owner),
            _ => None,
        };
        let value = serde_json::from_value(Value::Object(fields)).map_err(|e| {
            StoreError::InvalidResponse(format!("{}/{}: {}", T::COLLECTION, id, e))
        })?;
        Ok(Self {
            id,
            owner_id,
            fields: value,
        })
    }
}

/// Serialize a value into document fields, stamping the owner when given.
pub fn to_fields<T: Resource>(value: &T, owner: Option<&str>) -> Result<Fields, StoreError> {
    let mut fields = match serde_json::to_value(value)? {
        Value::Object(map) => map,
        other => {
            return Err(StoreError::InvalidResponse(format!(
                "{} did not serialize to an object: {}",
                T::COLLECTION,
                other
            )))
        }
    };
    if let Some(owner) = owner {
        fields.insert(OWNER_FIELD.to_string(), Value::String(owner.to_string()));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Expense, PackingItem};
    use serde_json::json;

    #[test]
    fn test_from_document_splits_owner() {
        let doc = Document {
            id: "abc".into(),
            fields: json!({"userId": "u1", "item": "Sunscreen"})
                .as_object()
                .cloned()
                .unwrap(),
        };
        let record: Record<PackingItem> = Record::from_document(doc).unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.owner_id.as_deref(), Some("u1"));
        assert_eq!(record.fields.item, "Sunscreen");
    }

    #[test]
    fn test_from_document_accepts_integer_amounts() {
        let doc = Document {
            id: "e1".into(),
            fields: json!({"category": "Food", "amount": 12})
                .as_object()
                .cloned()
                .unwrap(),
        };
        let record: Record<Expense> = Record::from_document(doc).unwrap();
        assert_eq!(record.fields.amount, 12.0);
        assert!(record.owner_id.is_none());
    }

    #[test]
    fn test_from_document_reports_missing_fields() {
        let doc = Document {
            id: "bad".into(),
            fields: Fields::new(),
        };
        let err = Record::<PackingItem>::from_document(doc).unwrap_err();
        assert!(err.to_string().contains("packingLists/bad"));
    }

    #[test]
    fn test_to_fields_stamps_owner() {
        let item = PackingItem { item: "Tent".into() };
        let fields = to_fields(&item, Some("u9")).unwrap();
        assert_eq!(fields.get("item"), Some(&json!("Tent")));
        assert_eq!(fields.get(OWNER_FIELD), Some(&json!("u9")));

        let fields = to_fields(&item, None).unwrap();
        assert!(!fields.contains_key(OWNER_FIELD));
    }
}
