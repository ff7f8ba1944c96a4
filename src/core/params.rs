//! Parameters accepted by a dump creation request

use std::collections::BTreeMap;

use super::error::DumpError;
use crate::data::{Originator, OriginatorType};

pub const ORIGINATOR_ID_PARAM: &str = "xyz.openbmc_project.Dump.Create.CreateParameters.OriginatorId";
pub const ORIGINATOR_TYPE_PARAM: &str =
    "xyz.openbmc_project.Dump.Create.CreateParameters.OriginatorType";

/// Number of parameters a system dump request is expected to carry
pub const CREATE_DUMP_MAX_PARAMS: usize = 2;

/// A single request parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    String(String),
    Unsigned(u64),
    Bool(bool),
}

impl ParamValue {
    fn describe(&self) -> String {
        match self {
            ParamValue::String(s) => s.clone(),
            ParamValue::Unsigned(n) => n.to_string(),
            ParamValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Unsigned(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Caller-supplied parameters of `create_dump`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateParams {
    values: BTreeMap<String, ParamValue>,
}

impl CreateParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Convenience for the common originator pair
    pub fn with_originator(self, id: impl Into<String>, kind: OriginatorType) -> Self {
        self.with(ORIGINATOR_ID_PARAM, id.into())
            .with(ORIGINATOR_TYPE_PARAM, kind.qualified_name())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve the requester identity.
    ///
    /// A missing id becomes empty and a missing type becomes `Internal`.
    /// Values of the wrong kind are rejected.
    pub fn originator(&self) -> Result<Originator, DumpError> {
        let id = match self.get(ORIGINATOR_ID_PARAM) {
            None => {
                tracing::info!("OriginatorId is not provided");
                String::new()
            }
            Some(ParamValue::String(id)) => id.clone(),
            Some(other) => {
                tracing::error!(value = %other.describe(), "An invalid originatorId passed");
                return Err(DumpError::InvalidArgument {
                    name: "ORIGINATOR_ID".to_string(),
                    value: "INVALID INPUT".to_string(),
                });
            }
        };

        let kind = match self.get(ORIGINATOR_TYPE_PARAM) {
            None => {
                tracing::info!("OriginatorType is not provided, defaulting to Internal");
                OriginatorType::Internal
            }
            Some(ParamValue::String(raw)) => raw.parse().map_err(|_| {
                tracing::error!(value = %raw, "An invalid originatorType passed");
                DumpError::InvalidArgument {
                    name: "ORIGINATOR_TYPE".to_string(),
                    value: raw.clone(),
                }
            })?,
            Some(other) => {
                tracing::error!(value = %other.describe(), "An invalid originatorType passed");
                return Err(DumpError::InvalidArgument {
                    name: "ORIGINATOR_TYPE".to_string(),
                    value: "INVALID INPUT".to_string(),
                });
            }
        };

        Ok(Originator::new(id, kind))
    }
}
