//! Non-fatal ingestion warnings.
//!
//! A malformed log entry is skipped and reported; it never aborts the batch.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A key required by the entry's declared type is absent.
    MissingField,
    /// A value could not be mapped onto the signal scale.
    UnrecognizedValue,
    /// A numeric value lies outside the signal's range.
    OutOfRange,
    /// The entry carries no field the extractor understands.
    NoSignals,
}

impl WarningKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::UnrecognizedValue => "unrecognized_value",
            Self::OutOfRange => "out_of_range",
            Self::NoSignals => "no_signals",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionWarning {
    pub entry_id: String,
    pub kind: WarningKind,
    pub field: Option<String>,
    pub reason: String,
}

impl IngestionWarning {
    pub fn new(
        entry_id: impl Into<String>,
        kind: WarningKind,
        field: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            kind,
            field: field.map(str::to_string),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for IngestionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(
                f,
                "entry {} skipped ({}, field '{}'): {}",
                self.entry_id,
                self.kind.name(),
                field,
                self.reason
            ),
            None => write!(f, "entry {} skipped ({}): {}", self.entry_id, self.kind.name(), self.reason),
        }
    }
}
