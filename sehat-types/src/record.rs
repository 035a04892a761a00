//! Domain records persisted by the local store.
//!
//! The set of record categories is closed. Each payload variant carries the
//! category it belongs to, so a record's type and its data can never
//! disagree. The JSON inside a variant is owned by the screens that produce
//! it; the core only stores and forwards it.

use crate::{Error, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The category a domain record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Patient,
    Prescription,
    Medicine,
    Consultation,
    User,
}

impl RecordType {
    /// Every record type, in declaration order.
    pub const ALL: [RecordType; 5] = [
        RecordType::Patient,
        RecordType::Prescription,
        RecordType::Medicine,
        RecordType::Consultation,
        RecordType::User,
    ];

    /// The stable lowercase name used in storage and on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordType::Patient => "patient",
            RecordType::Prescription => "prescription",
            RecordType::Medicine => "medicine",
            RecordType::Consultation => "consultation",
            RecordType::User => "user",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(RecordType::Patient),
            "prescription" => Ok(RecordType::Prescription),
            "medicine" => Ok(RecordType::Medicine),
            "consultation" => Ok(RecordType::Consultation),
            "user" => Ok(RecordType::User),
            other => Err(Error::UnknownRecordType(other.to_string())),
        }
    }
}

/// The data of a domain record, tagged by its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum RecordPayload {
    Patient(Value),
    Prescription(Value),
    Medicine(Value),
    Consultation(Value),
    User(Value),
}

impl RecordPayload {
    /// Wraps `data` in the variant for `record_type`.
    #[must_use]
    pub fn new(record_type: RecordType, data: Value) -> Self {
        match record_type {
            RecordType::Patient => RecordPayload::Patient(data),
            RecordType::Prescription => RecordPayload::Prescription(data),
            RecordType::Medicine => RecordPayload::Medicine(data),
            RecordType::Consultation => RecordPayload::Consultation(data),
            RecordType::User => RecordPayload::User(data),
        }
    }

    /// The category this payload belongs to.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordPayload::Patient(_) => RecordType::Patient,
            RecordPayload::Prescription(_) => RecordType::Prescription,
            RecordPayload::Medicine(_) => RecordType::Medicine,
            RecordPayload::Consultation(_) => RecordType::Consultation,
            RecordPayload::User(_) => RecordType::User,
        }
    }

    /// The untagged JSON data.
    #[must_use]
    pub fn data(&self) -> &Value {
        match self {
            RecordPayload::Patient(v)
            | RecordPayload::Prescription(v)
            | RecordPayload::Medicine(v)
            | RecordPayload::Consultation(v)
            | RecordPayload::User(v) => v,
        }
    }

    /// Consumes the payload, returning the untagged JSON data.
    #[must_use]
    pub fn into_data(self) -> Value {
        match self {
            RecordPayload::Patient(v)
            | RecordPayload::Prescription(v)
            | RecordPayload::Medicine(v)
            | RecordPayload::Consultation(v)
            | RecordPayload::User(v) => v,
        }
    }

    /// Serializes the untagged data to a JSON string.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self.data())?)
    }

    /// Parses untagged JSON data for the given category.
    pub fn from_json(record_type: RecordType, json: &str) -> crate::Result<Self> {
        let data: Value = serde_json::from_str(json)?;
        Ok(Self::new(record_type, data))
    }
}

/// A unit of application data persisted locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// Unique within its type partition.
    pub id: String,
    pub payload: RecordPayload,
    /// When this version was written locally.
    pub stored_at: Timestamp,
    /// True once the remote side has confirmed the latest local write.
    pub synced: bool,
}

impl DomainRecord {
    /// Creates an unsynced record stamped with the current time.
    pub fn new(id: impl Into<String>, payload: RecordPayload) -> Self {
        Self {
            id: id.into(),
            payload,
            stored_at: Timestamp::now(),
            synced: false,
        }
    }

    /// The record's category.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        self.payload.record_type()
    }
}

/// A precomputed value kept for offline display, subject to expiry sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalCacheEntry {
    pub key: String,
    pub data: Value,
    pub cached_at: Timestamp,
}
