use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::field::Field;

/// How an absent field is rendered at the JSON boundary.
pub const ABSENT_MARKER: &str = "N/A";

/// Trim a raw value; empty strings and the absent marker collapse to `None`.
pub fn normalize_value(raw: &str) -> Option<String> {
    let v = raw.trim();
    if v.is_empty() || v == ABSENT_MARKER {
        None
    } else {
        Some(v.to_string())
    }
}

/// Best-effort parse of one certificate. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    pub university_name: Option<String>,
    pub holder_name: Option<String>,
    pub course: Option<String>,
    pub grade: Option<String>,
    pub roll_no: Option<String>,
    pub certificate_id: Option<String>,
}

impl FieldRecord {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Store a value after normalization. Blank input clears the field.
    pub fn set(&mut self, field: Field, value: &str) {
        *self.slot_mut(field) = normalize_value(value);
    }

    pub fn clear(&mut self, field: Field) {
        *self.slot_mut(field) = None;
    }

    pub fn with(mut self, field: Field, value: &str) -> Self {
        self.set(field, value);
        self
    }

    /// Build from `(key, value)` pairs in any order and any known key spelling.
    /// Unknown keys are skipped; a later pair for the same field wins.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut record = FieldRecord::default();
        for (k, v) in pairs {
            if let Some(field) = Field::from_alias(k.as_ref()) {
                record.set(field, v.as_ref());
            }
        }
        record
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.into_iter().all(|f| self.get(f).is_none())
    }

    pub fn present_count(&self) -> usize {
        Field::ALL.into_iter().filter(|f| self.get(*f).is_some()).count()
    }

    /// Value as shown to external consumers: the text, or `"N/A"`.
    pub fn display_value(&self, field: Field) -> &str {
        self.get(field).unwrap_or(ABSENT_MARKER)
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::UniversityName => &self.university_name,
            Field::HolderName => &self.holder_name,
            Field::Course => &self.course,
            Field::Grade => &self.grade,
            Field::RollNo => &self.roll_no,
            Field::CertificateId => &self.certificate_id,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::UniversityName => &mut self.university_name,
            Field::HolderName => &mut self.holder_name,
            Field::Course => &mut self.course,
            Field::Grade => &mut self.grade,
            Field::RollNo => &mut self.roll_no,
            Field::CertificateId => &mut self.certificate_id,
        }
    }
}

// Serialized with all six keys present; absent values become "N/A" so
// existing consumers of the JSON API keep working.
impl Serialize for FieldRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Field::ALL.len()))?;
        for f in Field::ALL {
            map.serialize_entry(f.key(), self.display_value(f))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = FieldRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of certificate field names to strings or null")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldRecord, A::Error> {
                let mut record = FieldRecord::default();
                while let Some(key) = access.next_key::<String>()? {
                    let value: Option<serde_json::Value> = access.next_value()?;
                    let Some(field) = Field::from_alias(&key) else {
                        continue;
                    };
                    match value {
                        Some(serde_json::Value::String(s)) => record.set(field, &s),
                        Some(serde_json::Value::Null) | None => record.clear(field),
                        Some(other) => record.set(field, &other.to_string()),
                    }
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_trims_and_drops_blank() {
        let mut r = FieldRecord::default();
        r.set(Field::Grade, "  A ");
        assert_eq!(r.get(Field::Grade), Some("A"));
        r.set(Field::Grade, "   ");
        assert_eq!(r.get(Field::Grade), None);
        r.set(Field::Grade, "N/A");
        assert_eq!(r.get(Field::Grade), None);
    }

    #[test]
    fn serializes_all_six_keys_with_marker() {
        let r = FieldRecord::default().with(Field::HolderName, "Jane Doe");
        let v = serde_json::to_value(&r).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 6);
        assert_eq!(obj["holder_name"], "Jane Doe");
        assert_eq!(obj["certificate_id"], "N/A");
    }

    #[test]
    fn deserializes_mixed_spellings() {
        let r: FieldRecord = serde_json::from_str(
            r#"{"Certificate Holder Name":"Jane Doe","rollNo":"42","grade":null,"course":"N/A","extra":1}"#,
        )
        .unwrap();
        assert_eq!(r.holder_name.as_deref(), Some("Jane Doe"));
        assert_eq!(r.roll_no.as_deref(), Some("42"));
        assert_eq!(r.grade, None);
        assert_eq!(r.course, None);
    }

    #[test]
    fn numbers_are_kept_as_text() {
        let r: FieldRecord = serde_json::from_str(r#"{"roll_no": 42}"#).unwrap();
        assert_eq!(r.roll_no.as_deref(), Some("42"));
    }

    #[test]
    fn from_pairs_ignores_order_and_unknown_keys() {
        let a = FieldRecord::from_pairs([("Grade", "A"), ("Name", "Jane Doe"), ("Notes", "x")]);
        let b = FieldRecord::from_pairs([("holder_name", "Jane Doe"), ("grade", "A")]);
        assert_eq!(a, b);
        assert_eq!(a.present_count(), 2);
    }

    #[test]
    fn default_is_empty() {
        assert!(FieldRecord::default().is_empty());
        assert_eq!(FieldRecord::default().display_value(Field::Course), "N/A");
    }
}
