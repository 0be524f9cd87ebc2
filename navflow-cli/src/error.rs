//! Error handling for the navflow CLI
//!
//! Library errors are wrapped with the exit code the command should end with,
//! keeping the source chain for the final report.

use crate::exit_codes::{EXIT_ERROR, EXIT_WARNING};
use navflow::workflow::ExecutorError;
use navflow::NavigationError;
use std::error::Error;
use std::fmt;

/// CLI-specific result type that preserves error information
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type that includes both error information and suggested exit code
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: i32,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    /// Create a new CLI error with a message and exit code
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// Create a CLI error from another error with a specific exit code
    pub fn from_error<E: Error + Send + Sync + 'static>(error: E, exit_code: i32) -> Self {
        Self {
            message: error.to_string(),
            exit_code,
            source: Some(Box::new(error)),
        }
    }

    /// Create a CLI error with exit code 1 (general error)
    pub fn general<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self::from_error(error, EXIT_WARNING)
    }

    /// Create a CLI error with exit code 2 (validation error)
    pub fn validation<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self::from_error(error, EXIT_ERROR)
    }

    /// Get the full error chain as a formatted string
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();

        let mut current_source = self.source.as_deref().and_then(|e| e.source());
        while let Some(err) = current_source {
            result.push_str(&format!("\n  Caused by: {}", err));
            current_source = err.source();
        }

        result
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<NavigationError> for CliError {
    fn from(error: NavigationError) -> Self {
        match error {
            NavigationError::NavigationTree { .. } => Self::validation(error),
            _ => Self::general(error),
        }
    }
}

impl From<ExecutorError> for CliError {
    fn from(error: ExecutorError) -> Self {
        match error {
            ExecutorError::IterationLimitExceeded { .. } | ExecutorError::ExecutionNotFound(_) => {
                Self::general(error)
            }
            _ => Self::validation(error),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        Self {
            message: error.to_string(),
            exit_code: EXIT_ERROR,
            source: Some(error.into()),
        }
    }
}

/// Extension trait for converting results to CLI results
pub trait IntoCliResult<T> {
    fn cli_general_error(self) -> CliResult<T>;
}

impl<T, E: Error + Send + Sync + 'static> IntoCliResult<T> for Result<T, E> {
    fn cli_general_error(self) -> CliResult<T> {
        self.map_err(CliError::general)
    }
}

/// Convert a command result to an exit code, printing the full error chain on failure
pub fn handle_cli_result(result: CliResult<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e.full_chain());
            e.exit_code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_tree_errors_are_validation_errors() {
        let err: CliError = NavigationError::tree("main", "root tree not found").into();
        assert_eq!(err.exit_code, EXIT_ERROR);
        assert!(err.message.contains("main"));
    }

    #[test]
    fn test_database_errors_are_general_errors() {
        let err: CliError = NavigationError::Database("disk on fire".into()).into();
        assert_eq!(err.exit_code, EXIT_WARNING);
    }

    #[test]
    fn test_full_chain_includes_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = CliError::general(NavigationError::from(io));
        assert!(err.full_chain().starts_with(&err.message));
    }

    #[test]
    fn test_handle_cli_result_returns_exit_code() {
        assert_eq!(handle_cli_result(Ok(0)), 0);
        assert_eq!(handle_cli_result(Err(CliError::new("bad", EXIT_ERROR))), EXIT_ERROR);
    }
}
