use crate::core::{OccError, Result, Sequenced};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document families; the discriminant doubles as the number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum DocumentType {
    ShortTermLiability = 42,
    Purchase = 45,
}

impl DocumentType {
    pub fn prefix(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ShortTermLiability => "ShortTermLiability",
            Self::Purchase => "Purchase",
        };
        write!(f, "{label}")
    }
}

impl FromStr for DocumentType {
    type Err = OccError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ShortTermLiability" | "42" => Ok(Self::ShortTermLiability),
            "Purchase" | "45" => Ok(Self::Purchase),
            other => Err(OccError::InvalidConfig(format!(
                "unknown document type '{other}'"
            ))),
        }
    }
}

/// Dimension under which sequence numbers are unique and dense.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub document_type: DocumentType,
    pub year: i32,
    /// Budget or partition code, e.g. `2728501`.
    pub code: String,
}

impl PartitionKey {
    pub fn new(document_type: DocumentType, year: i32, code: impl Into<String>) -> Self {
        Self {
            document_type,
            year,
            code: code.into(),
        }
    }

    pub fn for_current_year(document_type: DocumentType, code: impl Into<String>) -> Self {
        Self::new(document_type, Utc::now().year(), code)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.document_type, self.year, self.code)
    }
}

/// Persistent counter record for one partition key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounter {
    pub document_type: DocumentType,
    pub year: i32,
    pub code: String,
    pub sequence_number: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SequenceCounter {
    /// Counter as lazily created by the first allocation for `key`.
    pub fn first(key: &PartitionKey) -> Self {
        Self {
            document_type: key.document_type,
            year: key.year,
            code: key.code.clone(),
            sequence_number: 1,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Sequenced for SequenceCounter {
    fn sequence(&self) -> i64 {
        self.sequence_number
    }

    fn with_sequence(&self, sequence: i64) -> Self {
        Self {
            sequence_number: sequence,
            updated_at: Some(Utc::now()),
            ..self.clone()
        }
    }
}

/// External identifier: prefix, partition code and a 5-digit zero-padded
/// sequence, e.g. `42` + `2728501` + `00001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentNumber(String);

impl DocumentNumber {
    pub const SEQUENCE_WIDTH: usize = 5;

    pub fn format(key: &PartitionKey, sequence: i64) -> Self {
        Self(format!(
            "{}{}{:0width$}",
            key.document_type.prefix(),
            key.code,
            sequence,
            width = Self::SEQUENCE_WIDTH
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
