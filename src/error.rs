//! Exit codes and machine-readable error reports.

use serde::Serialize;

use crate::cache::CacheError;

/// Process exit codes.
///
/// - 0: Success (nothing changed, or the cache was written)
/// - 1: General error
/// - 2: Changes detected by `check`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The command completed and found nothing to report.
    Success = 0,
    /// An error stopped the command.
    GeneralError = 1,
    /// The command completed and some cached files changed or went missing.
    ChangesDetected = 2,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "HC000",
            Self::GeneralError => "HC001",
            Self::ChangesDetected => "HC002",
        }
    }
}

/// Structured error information for `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "HC001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Broad category of the failure
    pub kind: &'static str,
    /// Human-readable error message, including its causes
    pub message: String,
}

impl StructuredError {
    /// Create a structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            kind: error_kind(err),
            message: format!("{:#}", err),
        }
    }
}

/// Name the category of the first cache error in the chain.
fn error_kind(err: &anyhow::Error) -> &'static str {
    match err.chain().find_map(|cause| cause.downcast_ref::<CacheError>()) {
        Some(CacheError::NotFound(_)) => "not_found",
        Some(CacheError::Format { .. }) => "format",
        Some(CacheError::InvalidName(_)) => "invalid_name",
        Some(CacheError::Io { .. } | CacheError::Hash(_) | CacheError::Scan(_)) => "io",
        Some(CacheError::ThreadPool(_)) | None => "general",
    }
}
