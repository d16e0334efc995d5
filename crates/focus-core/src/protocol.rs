//! Command channel message types
//!
//! Requests are JSON objects tagged by `type`; replies are the bare result
//! value of the command or `{"error": "..."}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rule::{FilterRule, RuleId};
use crate::sync::CheckReport;
use crate::{Error, Result};

/// A command for the sync core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    AddFilter { pattern: String },
    RemoveFilter { id: RuleId },
    ToggleFilter { id: RuleId },
    GetFilters,
    ClearAll,
    CheckSync,
}

impl Request {
    /// Every `type` tag the core accepts
    pub const TYPES: &'static [&'static str] = &[
        "ADD_FILTER",
        "REMOVE_FILTER",
        "TOGGLE_FILTER",
        "GET_FILTERS",
        "CLEAR_ALL",
        "CHECK_SYNC",
    ];

    /// Decode a raw request, separating unknown types from malformed payloads
    pub fn from_value(value: Value) -> Result<Self> {
        let known = value
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|kind| Self::TYPES.contains(&kind));
        if !known {
            return Err(Error::UnknownRequest);
        }
        serde_json::from_value(value).map_err(|e| Error::InvalidRequest {
            message: e.to_string(),
        })
    }

    /// NotFound reply for a remove or toggle naming an integer no rule can carry
    ///
    /// Ids such as `-1` or `5000000000` are absent by construction, so they
    /// answer like any other unknown id instead of failing to decode.
    pub fn unassignable_id_reply(value: &Value) -> Option<Reply> {
        let id = value.get("id")?;
        let integral = id.is_i64() || id.is_u64();
        let representable = id.as_u64().is_some_and(|raw| RuleId::try_from(raw).is_ok());
        if !integral || representable {
            return None;
        }
        match value.get("type").and_then(Value::as_str)? {
            "REMOVE_FILTER" => Some(Reply::Removed(false)),
            "TOGGLE_FILTER" => Some(Reply::Toggled(None)),
            _ => None,
        }
    }

    /// The wire tag of this request
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddFilter { .. } => "ADD_FILTER",
            Self::RemoveFilter { .. } => "REMOVE_FILTER",
            Self::ToggleFilter { .. } => "TOGGLE_FILTER",
            Self::GetFilters => "GET_FILTERS",
            Self::ClearAll => "CLEAR_ALL",
            Self::CheckSync => "CHECK_SYNC",
        }
    }
}

/// Result of one command, serialized as its bare value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// `ADD_FILTER`: the new rule
    Rule(FilterRule),
    /// `REMOVE_FILTER`: whether a rule was removed
    Removed(bool),
    /// `TOGGLE_FILTER`: the updated rule, `null` if unknown
    Toggled(Option<FilterRule>),
    /// `GET_FILTERS`: every rule
    Rules(Vec<FilterRule>),
    /// `CLEAR_ALL`: `null`
    Cleared,
    /// `CHECK_SYNC`: drift report
    Check(CheckReport),
    /// Any failure
    Error { error: String },
}

impl Reply {
    pub fn error(error: &Error) -> Self {
        Self::Error {
            error: error.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn to_value(&self) -> Value {
        // Every variant is plain data, serialization cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<Result<Reply>> for Reply {
    fn from(result: Result<Reply>) -> Self {
        result.unwrap_or_else(|e| Reply::error(&e))
    }
}
