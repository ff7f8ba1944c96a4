//! Data models for system dump entries

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Source id carried by an entry whose capture has not been correlated yet.
pub const INVALID_SOURCE_ID: u32 = 0xFFFF_FFFF;

/// Default object path prefix under which system dump entries are exposed.
pub const DEFAULT_BASE_ENTRY_PATH: &str = "/xyz/openbmc_project/dump/system/entry";

const ORIGINATOR_TYPE_PREFIX: &str = "xyz.openbmc_project.Common.OriginatedBy.OriginatorTypes.";

/// Errors raised while constructing an entry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("Invalid object path: {0}")]
    InvalidObjectPath(String),
    #[error("Completed entry {0} cannot carry the invalid source id")]
    InvalidSourceId(u32),
    #[error("Invalid originator id: {0:?}")]
    InvalidOriginatorId(String),
}

/// Progress of a dump capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationStatus {
    InProgress,
    Completed,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::InProgress => "in-progress",
            OperationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who asked for a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginatorType {
    Client,
    Internal,
    SupportingService,
}

impl OriginatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginatorType::Client => "Client",
            OriginatorType::Internal => "Internal",
            OriginatorType::SupportingService => "SupportingService",
        }
    }

    /// Fully qualified name as used on the management bus
    pub fn qualified_name(&self) -> String {
        format!("{}{}", ORIGINATOR_TYPE_PREFIX, self.as_str())
    }
}

impl FromStr for OriginatorType {
    type Err = ();

    /// Accepts either the bare variant name or the fully qualified form.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bare = value.strip_prefix(ORIGINATOR_TYPE_PREFIX).unwrap_or(value);
        match bare {
            "Client" => Ok(OriginatorType::Client),
            "Internal" => Ok(OriginatorType::Internal),
            "SupportingService" => Ok(OriginatorType::SupportingService),
            _ => Err(()),
        }
    }
}

impl fmt::Display for OriginatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requester identity attached to an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Originator {
    pub id: String,
    pub kind: OriginatorType,
}

impl Originator {
    pub fn internal() -> Self {
        Self {
            id: String::new(),
            kind: OriginatorType::Internal,
        }
    }

    pub fn new(id: impl Into<String>, kind: OriginatorType) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Validated external path of an entry (`<base>/<id>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Build the path for entry `id` below `base`.
    pub fn for_entry(base: &str, id: u32) -> Result<Self, EntryError> {
        let base = base.trim_end_matches('/');
        Self::parse(&format!("{}/{}", base, id))
    }

    /// Validate an object path: absolute, no trailing slash, non-empty
    /// elements made of ASCII alphanumerics and underscores.
    pub fn parse(path: &str) -> Result<Self, EntryError> {
        let invalid = || EntryError::InvalidObjectPath(path.to_string());

        if path == "/" {
            return Ok(Self(path.to_string()));
        }
        let rest = path.strip_prefix('/').ok_or_else(invalid)?;
        let valid = rest.split('/').all(|element| {
            !element.is_empty()
                && element
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        });
        if !valid {
            return Err(invalid());
        }
        Ok(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single system dump record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpEntry {
    /// Entry id, assigned from 1 upwards and never reused
    pub id: u32,
    /// Correlation id from the fault-reporting side
    pub source_id: u32,
    pub status: OperationStatus,
    /// Capture time in microseconds since the Unix epoch
    pub timestamp: u64,
    /// Artifact size in bytes (0 until known)
    pub size: u64,
    pub originator_id: String,
    pub originator_type: OriginatorType,
    pub object_path: ObjectPath,
}

impl DumpEntry {
    /// Placeholder for a user-requested capture awaiting correlation
    pub fn placeholder(
        base_path: &str,
        id: u32,
        timestamp: u64,
        originator: Originator,
    ) -> Result<Self, EntryError> {
        validate_originator_id(&originator.id)?;
        Ok(Self {
            id,
            source_id: INVALID_SOURCE_ID,
            status: OperationStatus::InProgress,
            timestamp,
            size: 0,
            originator_id: originator.id,
            originator_type: originator.kind,
            object_path: ObjectPath::for_entry(base_path, id)?,
        })
    }

    /// Entry for a capture the host reported without a prior request
    pub fn completed(
        base_path: &str,
        id: u32,
        timestamp: u64,
        size: u64,
        source_id: u32,
    ) -> Result<Self, EntryError> {
        if source_id == INVALID_SOURCE_ID {
            return Err(EntryError::InvalidSourceId(id));
        }
        Ok(Self {
            id,
            source_id,
            status: OperationStatus::Completed,
            timestamp,
            size,
            originator_id: String::new(),
            originator_type: OriginatorType::Internal,
            object_path: ObjectPath::for_entry(base_path, id)?,
        })
    }

    /// Zeroed entry that a persisted record is loaded into
    pub fn provisional(base_path: &str, id: u32) -> Result<Self, EntryError> {
        Ok(Self {
            id,
            source_id: 0,
            status: OperationStatus::InProgress,
            timestamp: 0,
            size: 0,
            originator_id: String::new(),
            originator_type: OriginatorType::Internal,
            object_path: ObjectPath::for_entry(base_path, id)?,
        })
    }

    /// Copy of this entry completed with the correlated capture details.
    ///
    /// Originator fields and the id are preserved.
    pub fn with_completion(
        &self,
        timestamp: u64,
        size: u64,
        source_id: u32,
    ) -> Result<Self, EntryError> {
        if source_id == INVALID_SOURCE_ID {
            return Err(EntryError::InvalidSourceId(self.id));
        }
        let mut entry = self.clone();
        entry.timestamp = timestamp;
        entry.size = size;
        entry.source_id = source_id;
        entry.status = OperationStatus::Completed;
        Ok(entry)
    }

    /// True for the in-flight capture awaiting correlation
    pub fn is_pending_placeholder(&self) -> bool {
        self.status == OperationStatus::InProgress && self.source_id == INVALID_SOURCE_ID
    }

    pub fn is_completed(&self) -> bool {
        self.status == OperationStatus::Completed
    }

    /// Human-readable capture time
    pub fn timestamp_rfc3339(&self) -> String {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(|micros| Utc.timestamp_micros(micros).single())
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

fn validate_originator_id(id: &str) -> Result<(), EntryError> {
    if id.chars().any(char::is_control) {
        return Err(EntryError::InvalidOriginatorId(id.to_string()));
    }
    Ok(())
}

/// Current time in microseconds since the Unix epoch
pub fn now_micros() -> u64 {
    u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0)
}
