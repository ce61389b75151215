//! Fact requests, gathered facts and fact gathering errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::FactValue;

/// One requested fact: which gatherer answers it and what to look up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRequest {
    pub name: String,
    pub gatherer: String,
    /// Dotted path queried against the gathered tree
    #[serde(default)]
    pub argument: String,
    /// Check that asked for this fact, if any
    #[serde(default)]
    pub check_id: String,
}

impl FactRequest {
    pub fn new(name: &str, gatherer: &str, argument: &str) -> Self {
        Self {
            name: name.to_string(),
            gatherer: gatherer.to_string(),
            argument: argument.to_string(),
            check_id: String::new(),
        }
    }

    pub fn with_check_id(mut self, check_id: &str) -> Self {
        self.check_id = check_id.to_string();
        self
    }
}

/// Error attached to a fact, or returned for a whole gathering batch.
///
/// `kind` is stable and meant to be matched on; `message` is for humans.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("fact gathering error: {kind} - {message}")]
pub struct FactGatheringError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl FactGatheringError {
    pub fn new(kind: &str, message: &str) -> Self {
        Self {
            kind: kind.to_string(),
            message: message.to_string(),
        }
    }

    /// Same kind, with `detail` appended to the message.
    pub fn wrap(&self, detail: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind.clone(),
            message: format!("{}: {}", self.message, detail),
        }
    }
}

/// Outcome of one fact request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactResult {
    Value(FactValue),
    Error(FactGatheringError),
}

/// A gathered fact, answering exactly one `FactRequest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub name: String,
    pub check_id: String,
    #[serde(flatten)]
    pub result: FactResult,
}

impl Fact {
    pub fn with_value(request: &FactRequest, value: FactValue) -> Self {
        Self {
            name: request.name.clone(),
            check_id: request.check_id.clone(),
            result: FactResult::Value(value),
        }
    }

    pub fn with_error(request: &FactRequest, error: FactGatheringError) -> Self {
        Self {
            name: request.name.clone(),
            check_id: request.check_id.clone(),
            result: FactResult::Error(error),
        }
    }

    pub fn value(&self) -> Option<&FactValue> {
        match &self.result {
            FactResult::Value(v) => Some(v),
            FactResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FactGatheringError> {
        match &self.result {
            FactResult::Value(_) => None,
            FactResult::Error(e) => Some(e),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.result, FactResult::Error(_))
    }
}
