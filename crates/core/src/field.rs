use serde::{Deserialize, Serialize};
use std::fmt;

/// The six fields every certificate record carries, in record order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    UniversityName,
    HolderName,
    Course,
    Grade,
    RollNo,
    CertificateId,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::UniversityName,
        Field::HolderName,
        Field::Course,
        Field::Grade,
        Field::RollNo,
        Field::CertificateId,
    ];

    /// Record / JSON API key.
    pub fn key(self) -> &'static str {
        match self {
            Field::UniversityName => "university_name",
            Field::HolderName => "holder_name",
            Field::Course => "course",
            Field::Grade => "grade",
            Field::RollNo => "roll_no",
            Field::CertificateId => "certificate_id",
        }
    }

    /// Column label used by the ledger service and issuer rosters.
    pub fn ledger_label(self) -> &'static str {
        match self {
            Field::UniversityName => "University Name",
            Field::HolderName => "Certificate Holder Name",
            Field::Course => "Course",
            Field::Grade => "Grade",
            Field::RollNo => "Roll No",
            Field::CertificateId => "Certificate ID",
        }
    }

    /// Column header in registrar roster exports.
    pub fn registrar_label(self) -> &'static str {
        match self {
            Field::UniversityName => "University",
            Field::HolderName => "Name",
            Field::Course => "Degree Name",
            Field::Grade => "Grade",
            Field::RollNo => "Roll Number",
            Field::CertificateId => "Certificate ID",
        }
    }

    /// Key in the ledger verification request payload.
    pub fn api_key(self) -> &'static str {
        match self {
            Field::UniversityName => "university",
            Field::HolderName => "holderName",
            Field::Course => "course",
            Field::Grade => "grade",
            Field::RollNo => "rollNo",
            Field::CertificateId => "certificateId",
        }
    }

    /// Resolve any known spelling of a field name.
    ///
    /// Registrar exports and the AI-extraction prototype used their own names
    /// (`Name`, `Roll`, `Certificate_ID`, ...); those are accepted here so
    /// records from either side land on the same field.
    pub fn from_alias(name: &str) -> Option<Field> {
        let name = name.trim();
        if let Some(f) = Field::ALL
            .into_iter()
            .find(|f| f.key() == name || f.ledger_label() == name || f.api_key() == name)
        {
            return Some(f);
        }
        match name {
            "University" => Some(Field::UniversityName),
            "Name" | "recipient_name" => Some(Field::HolderName),
            "Degree Name" | "Course Name" => Some(Field::Course),
            "Roll" | "Roll Number" => Some(Field::RollNo),
            "Certificate_ID" | "Cert ID" => Some(Field::CertificateId),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Field {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::from_alias(s).ok_or_else(|| format!("Unknown certificate field: '{s}'"))
    }
}
