use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque version stamp carried by every versioned record.
///
/// A fresh token is generated on every successful write; tokens are only
/// ever compared for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken(Uuid);

impl VersionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
