use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::field::Field;
use crate::record::FieldRecord;

/// Field order of the registrar's `student_details` table digests.
pub const STUDENT_DETAILS_FIELDS: [Field; 5] = [
    Field::HolderName,
    Field::Course,
    Field::Grade,
    Field::RollNo,
    Field::CertificateId,
];

/// Compute SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a raw 32-byte hash as a lowercase hex string (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hex::encode(hash)
}

pub fn sha256_hex(data: &[u8]) -> String {
    to_hex(&sha256_bytes(data))
}

/// Key spelling used inside the stable-JSON preimage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStyle {
    /// `"Certificate Holder Name"`, `"Roll No"`, ...
    #[default]
    Ledger,
    /// `"holder_name"`, `"roll_no"`, ...
    Snake,
    /// Registrar roster headers (`"Name"`, `"Roll Number"`, ...) with absent
    /// values as `""`, which is how roster rows were hashed for upload.
    Registrar,
}

impl KeyStyle {
    fn key(self, field: Field) -> &'static str {
        match self {
            KeyStyle::Ledger => field.ledger_label(),
            KeyStyle::Snake => field.key(),
            KeyStyle::Registrar => field.registrar_label(),
        }
    }

    fn value(self, record: &FieldRecord, field: Field) -> &str {
        match self {
            KeyStyle::Registrar => record.get(field).unwrap_or(""),
            KeyStyle::Ledger | KeyStyle::Snake => record.display_value(field),
        }
    }
}

/// The two digest conventions in circulation. Digests from one never match
/// digests from the other; producer and verifier must be configured alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum HashScheme {
    /// Lower-cased, trimmed present values joined with `|`; absent values
    /// are dropped without a placeholder.
    PipeJoined {
        #[serde(default = "all_fields")]
        fields: Vec<Field>,
    },
    /// Every field (absent as `"N/A"`) as compact JSON with sorted keys.
    StableJson {
        #[serde(default)]
        keys: KeyStyle,
    },
}

fn all_fields() -> Vec<Field> {
    Field::ALL.to_vec()
}

impl Default for HashScheme {
    fn default() -> Self {
        HashScheme::StableJson { keys: KeyStyle::Ledger }
    }
}

impl HashScheme {
    pub fn pipe_joined() -> Self {
        HashScheme::PipeJoined { fields: all_fields() }
    }

    pub fn student_details() -> Self {
        HashScheme::PipeJoined { fields: STUDENT_DETAILS_FIELDS.to_vec() }
    }

    pub fn stable_json(keys: KeyStyle) -> Self {
        HashScheme::StableJson { keys }
    }

    /// The exact string that gets hashed.
    pub fn preimage(&self, record: &FieldRecord) -> String {
        match self {
            HashScheme::PipeJoined { fields } => pipe_preimage(record, fields),
            HashScheme::StableJson { keys } => stable_json_preimage(record, *keys),
        }
    }

    /// 64-character lowercase hex SHA-256 of the preimage.
    pub fn digest(&self, record: &FieldRecord) -> String {
        sha256_hex(self.preimage(record).as_bytes())
    }
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashScheme::PipeJoined { fields } if fields[..] == Field::ALL[..] => {
                write!(f, "pipe_joined")
            }
            HashScheme::PipeJoined { fields } if fields[..] == STUDENT_DETAILS_FIELDS[..] => {
                write!(f, "pipe_joined_student_details")
            }
            HashScheme::PipeJoined { fields } => {
                let keys: Vec<&str> = fields.iter().map(|field| field.key()).collect();
                write!(f, "pipe_joined({})", keys.join(","))
            }
            HashScheme::StableJson { keys: KeyStyle::Ledger } => write!(f, "stable_json"),
            HashScheme::StableJson { keys: KeyStyle::Snake } => write!(f, "stable_json_snake"),
            HashScheme::StableJson { keys: KeyStyle::Registrar } => {
                write!(f, "stable_json_registrar")
            }
        }
    }
}

/// Digest of a record under the given scheme.
pub fn canonical_hash(record: &FieldRecord, scheme: &HashScheme) -> String {
    scheme.digest(record)
}

fn pipe_preimage(record: &FieldRecord, fields: &[Field]) -> String {
    fields
        .iter()
        .filter_map(|f| record.get(*f))
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join("|")
}

fn stable_json_preimage(record: &FieldRecord, keys: KeyStyle) -> String {
    // Insert in sorted order; output stays sorted even with `preserve_order`.
    let sorted: BTreeMap<&str, &str> =
        Field::ALL.into_iter().map(|f| (keys.key(f), keys.value(record, f))).collect();
    let object: Map<String, Value> = sorted
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    Value::Object(object).to_string()
}
