//! Per-layer save ladder.
//!
//! A layer is saved at most three times: the first attempt, one retry with
//! the default extension, and one retry in interactive mode. [`transition`]
//! maps the outcome of one attempt to what the exporter does next.

use crate::services::host::{RunMode, SaveFailure};

use super::extensions::ExtensionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    NotExported,
    Successful,
    /// Retry the same file in interactive mode.
    ForceInteractive,
    /// Retry with the default extension under a new name.
    UseDefaultExtension,
}

/// What the attempt was made with.
#[derive(Debug, Clone, Copy)]
pub struct AttemptContext<'a> {
    pub extension: &'a str,
    pub default_extension: &'a str,
    pub run_mode: RunMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Succeeded,
    RetryInteractive,
    FallBackToDefaultExtension,
    Cancelled(String),
    Fatal { extension: String, reason: String },
}

impl Transition {
    /// Status the exporter is in after taking this transition. `None` when the
    /// run ends.
    pub fn status(&self) -> Option<ExportStatus> {
        match self {
            Transition::Succeeded => Some(ExportStatus::Successful),
            Transition::RetryInteractive => Some(ExportStatus::ForceInteractive),
            Transition::FallBackToDefaultExtension => Some(ExportStatus::UseDefaultExtension),
            Transition::Cancelled(_) | Transition::Fatal { .. } => None,
        }
    }
}

/// `current` is the status the attempt was started in: `NotExported` for a
/// first attempt, otherwise the retry being carried out.
pub fn transition(
    current: ExportStatus,
    context: &AttemptContext<'_>,
    outcome: Result<(), &SaveFailure>,
) -> Transition {
    let reason = match outcome {
        Ok(()) => return Transition::Succeeded,
        Err(SaveFailure::Cancelled(reason)) => return Transition::Cancelled(reason.clone()),
        Err(SaveFailure::Failed(reason)) => reason,
    };

    let fatal = || Transition::Fatal {
        extension: context.extension.to_string(),
        reason: reason.clone(),
    };

    match current {
        ExportStatus::ForceInteractive => fatal(),
        ExportStatus::NotExported | ExportStatus::Successful
            if context.extension != context.default_extension =>
        {
            Transition::FallBackToDefaultExtension
        }
        _ if context.run_mode != RunMode::Interactive => Transition::RetryInteractive,
        _ => fatal(),
    }
}

/// Run mode for the next save through an extension: the caller's mode for the
/// first file of a valid extension, then repeat-last-values so the encoder
/// does not ask again for every layer.
pub fn select_run_mode(initial: RunMode, state: ExtensionState) -> RunMode {
    if state.is_valid && state.processed_count > 0 {
        RunMode::RepeatLastValues
    } else {
        initial
    }
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
