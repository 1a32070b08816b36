//! Records exchanged with the remote record store.
//!
//! The store only ever sees field names and opaque ciphertext strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned identifier of a [`FieldRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Allocate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One encrypted form field as persisted by the record store.
///
/// `field` is unique per user in the store; `value` is the base64 ciphertext
/// produced by the cipher layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    /// Store-assigned identifier.
    pub id: RecordId,
    /// Form field name, e.g. `"dateOfBirth"`.
    pub field: String,
    /// Opaque ciphertext.
    pub value: String,
}

impl FieldRecord {
    /// Construct a record with a freshly allocated id.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            field: field.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_record_wire_shape() {
        let rec = FieldRecord::new("dateOfBirth", "AQIDBA==");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["field"], "dateOfBirth");
        assert_eq!(json["value"], "AQIDBA==");
        assert_eq!(json["id"], rec.id.to_string());
    }

    #[test]
    fn field_record_serde() {
        let rec = FieldRecord::new("name", "ciphertext");
        let json = serde_json::to_string(&rec).unwrap();
        let decoded: FieldRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, rec);
    }

    #[test]
    fn record_ids_are_unique() {
        assert_ne!(RecordId::new(), RecordId::new());
    }
}
