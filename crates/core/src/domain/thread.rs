use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Caller-supplied ids are opaque and kept byte-for-byte; only blank ids are refused.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Err(DomainError::InvariantViolation("thread id must not be empty".to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persistence and vector-search provider a thread runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackingStore {
    #[serde(rename = "mongodb")]
    MongoDb,
    #[serde(rename = "postgres")]
    Postgres,
}

impl BackingStore {
    pub const ALL: [BackingStore; 2] = [BackingStore::MongoDb, BackingStore::Postgres];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MongoDb => "mongodb",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for BackingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackingStore {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "mongodb" => Ok(Self::MongoDb),
            "postgres" => Ok(Self::Postgres),
            other => Err(DomainError::UnsupportedBackingStore(other.to_string())),
        }
    }
}
