use serde::Serialize;
use thiserror::Error;

use crate::services::filter::FilterError;
use crate::services::host::HostError;

#[derive(Debug, Error)]
pub enum ExportError {
    /// User- or caller-initiated abort. Never retried.
    #[error("Export cancelled: {0}")]
    Cancelled(String),
    /// Recovered locally by substituting a fallback name.
    #[error("Invalid layer name: {0}")]
    InvalidName(String),
    /// Save failure that survived every retry.
    #[error("{}", save_failed_message(.extension, .reason))]
    SaveFailed { extension: String, reason: String },
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Export failed: {0}")]
    Fatal(String),
}

impl ExportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Cancelled(_))
    }
}

fn save_failed_message(extension: &str, reason: &str) -> String {
    let mut message = format!("\"{extension}\": {reason}");
    if !message.ends_with('.') {
        message.push('.');
    }
    message
}

impl From<std::io::Error> for ExportError {
    fn from(error: std::io::Error) -> Self {
        ExportError::Fatal(error.to_string())
    }
}

impl From<FilterError> for ExportError {
    fn from(error: FilterError) -> Self {
        ExportError::Fatal(error.to_string())
    }
}

impl From<HostError> for ExportError {
    fn from(error: HostError) -> Self {
        ExportError::Fatal(error.to_string())
    }
}

impl Serialize for ExportError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
#[path = "tests/errors_tests.rs"]
mod tests;
