//! Exit codes and structured error reporting for the binary.

use serde::Serialize;

use crate::actions::TransferError;
use crate::duplicates::ProcessorError;
use crate::scanner::ValidateError;

/// Process exit codes.
///
/// - 0: duplicates found, or every requested transfer succeeded
/// - 1: the run could not complete
/// - 2: the run completed and found no duplicates
/// - 3: a transfer batch finished with some per-file failures
/// - 130: cancelled with Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Completed; duplicates found or transfers all succeeded.
    Success = 0,
    /// Unexpected failure.
    GeneralError = 1,
    /// Completed with no duplicates.
    NoDuplicates = 2,
    /// Completed with per-file transfer failures.
    PartialSuccess = 3,
    /// Cancelled by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code used in JSON error output.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "PD000",
            Self::GeneralError => "PD001",
            Self::NoDuplicates => "PD002",
            Self::PartialSuccess => "PD003",
            Self::Interrupted => "PD130",
        }
    }

    /// Exit code for an error that aborted the run.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        if is_interrupted(err) {
            Self::Interrupted
        } else {
            Self::GeneralError
        }
    }
}

/// Whether any error in the chain is a cancellation.
#[must_use]
pub fn is_interrupted(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<ValidateError>(),
            Some(ValidateError::Interrupted)
        ) || matches!(
            cause.downcast_ref::<ProcessorError>(),
            Some(ProcessorError::Interrupted)
        ) || matches!(
            cause.downcast_ref::<TransferError>(),
            Some(TransferError::Interrupted(_))
        )
    })
}

/// Error description printed with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code such as "PD001"
    pub code: String,
    /// Process exit code
    pub exit_code: i32,
    /// Error message including its causes
    pub message: String,
    /// Whether the run was cancelled
    pub interrupted: bool,
}

impl StructuredError {
    /// Describe `err`, which ended the run with `exit_code`.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_codes() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::NoDuplicates.as_i32(), 2);
        assert_eq!(ExitCode::PartialSuccess.code_prefix(), "PD003");
        assert_eq!(ExitCode::Interrupted.as_i32(), crate::signal::EXIT_CODE_INTERRUPTED);
    }

    #[test]
    fn test_interruption_found_through_context() {
        let err = Err::<(), _>(ProcessorError::Interrupted)
            .context("comparing images")
            .unwrap_err();
        assert!(is_interrupted(&err));
        assert_eq!(ExitCode::for_error(&err), ExitCode::Interrupted);

        let err = anyhow::Error::new(ValidateError::Interrupted);
        assert!(is_interrupted(&err));
    }

    #[test]
    fn test_other_errors_are_general() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    }

    #[test]
    fn test_structured_error_json() {
        let err = anyhow::anyhow!("inner").context("outer");
        let structured = StructuredError::new(&err, ExitCode::GeneralError);
        let json = serde_json::to_value(&structured).unwrap();
        assert_eq!(json["code"], "PD001");
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["message"], "outer: inner");
        assert_eq!(json["interrupted"], false);
    }
}
