//! Error handling for credo
//!
//! This module provides the error taxonomy and user-friendly error reporting for
//! the credo CLI. Two principles drive the design:
//! 1. **Strongly-typed errors** so callers can single out benign outcomes such as
//!    [`CredoError::AlreadyPresent`]
//! 2. **User-friendly messages** with actionable suggestions at the CLI boundary
//!
//! # Architecture
//!
//! - [`CredoError`] - Enumerated error types for every failure mode
//! - [`ErrorContext`] - Wrapper that adds user-friendly details and suggestions
//!
//! # Error Categories
//!
//! - **Module contract**: [`CredoError::Converting`], [`CredoError::AlreadyPresent`],
//!   [`CredoError::ModuleNotFound`]
//! - **External sources**: [`CredoError::UpdateCheckFailed`],
//!   [`CredoError::AptCommandError`], [`CredoError::AptNotFound`],
//!   [`CredoError::DownloadFailed`], [`CredoError::InvalidUrl`]
//! - **Materialization**: [`CredoError::ChecksumMismatch`],
//!   [`CredoError::ArtifactNotFound`]
//! - **Configuration**: [`CredoError::ManifestNotFound`],
//!   [`CredoError::ManifestParseError`], [`CredoError::ConfigError`]
//!
//! External-source failures are never retried here; they are propagated with
//! `anyhow` context naming the item and phase, and the CLI terminates on any
//! error other than [`CredoError::AlreadyPresent`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use credo_cli::core::{CredoError, user_friendly_error};
//!
//! let error = anyhow::Error::from(CredoError::AptNotFound);
//! let context = user_friendly_error(error);
//! context.display(); // colored error with a suggestion
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for credo operations.
#[derive(Error, Debug)]
pub enum CredoError {
    /// A spell handed to a module belongs to a different module.
    ///
    /// This is always a caller/programming error and is never retried.
    #[error("Cannot convert {found} spell into a {expected} spell")]
    Converting {
        /// Module whose spell type was expected
        expected: String,
        /// Module the received spell belongs to
        found: String,
    },

    /// A structurally equal spell is already committed to the manifest.
    ///
    /// CLI callers treat this as a benign outcome.
    #[error("Spell '{name}' is already present in the {module} section")]
    AlreadyPresent {
        /// Module whose section already holds the spell
        module: String,
        /// Name of the rejected spell
        name: String,
    },

    /// No module with this name is registered on this host.
    #[error("Module '{name}' is not available")]
    ModuleNotFound {
        /// The requested module name
        name: String,
    },

    /// Refreshing the package index failed while resolving an item.
    #[error("While resolving {name}, failed to check for updates: {reason}")]
    UpdateCheckFailed {
        /// Item being resolved
        name: String,
        /// Underlying failure
        reason: String,
    },

    /// An apt command returned a non-zero exit code or timed out.
    #[error("apt operation failed: {operation}")]
    AptCommandError {
        /// The apt operation that failed (e.g., "update", "download")
        operation: String,
        /// The error output from the command
        stderr: String,
    },

    /// `apt-get`/`apt-cache` are not available in PATH.
    #[error("apt-get is not installed or not found in PATH")]
    AptNotFound,

    /// An HTTP download failed.
    #[error("Failed to download {url}: {reason}")]
    DownloadFailed {
        /// The URL being downloaded
        url: String,
        /// The reason for the failure
        reason: String,
    },

    /// A url spell does not hold a valid absolute URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected value
        url: String,
        /// Parser message
        reason: String,
    },

    /// A downloaded artifact does not match its recorded checksum.
    #[error("Checksum mismatch for '{name}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Spell name
        name: String,
        /// Checksum recorded in the manifest
        expected: String,
        /// Checksum of the downloaded file
        actual: String,
    },

    /// `apply` could not find the artifact produced by `save`.
    #[error("No saved artifact for {module} spell '{name}' in {path}")]
    ArtifactNotFound {
        /// Module owning the spell
        module: String,
        /// Spell name
        name: String,
        /// Directory that was searched
        path: String,
    },

    /// Spell manifest not found.
    ///
    /// credo searches for `credospell.toml` starting from the current working
    /// directory and walking up the directory tree.
    #[error("Manifest file credospell.toml not found in current directory or any parent directory")]
    ManifestNotFound,

    /// Manifest parsing error
    #[error("Invalid manifest file syntax in {file}")]
    ManifestParseError {
        /// Path to the manifest file that failed to parse
        file: String,
        /// Parser message
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for CredoError {
    fn clone(&self) -> Self {
        match self {
            Self::Converting {
                expected,
                found,
            } => Self::Converting {
                expected: expected.clone(),
                found: found.clone(),
            },
            Self::AlreadyPresent {
                module,
                name,
            } => Self::AlreadyPresent {
                module: module.clone(),
                name: name.clone(),
            },
            Self::ModuleNotFound {
                name,
            } => Self::ModuleNotFound {
                name: name.clone(),
            },
            Self::UpdateCheckFailed {
                name,
                reason,
            } => Self::UpdateCheckFailed {
                name: name.clone(),
                reason: reason.clone(),
            },
            Self::AptCommandError {
                operation,
                stderr,
            } => Self::AptCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::AptNotFound => Self::AptNotFound,
            Self::DownloadFailed {
                url,
                reason,
            } => Self::DownloadFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::InvalidUrl {
                url,
                reason,
            } => Self::InvalidUrl {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::ChecksumMismatch {
                name,
                expected,
                actual,
            } => Self::ChecksumMismatch {
                name: name.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
            },
            Self::ArtifactNotFound {
                module,
                name,
                path,
            } => Self::ArtifactNotFound {
                module: module.clone(),
                name: name.clone(),
                path: path.clone(),
            },
            Self::ManifestNotFound => Self::ManifestNotFound,
            Self::ManifestParseError {
                file,
                reason,
            } => Self::ManifestParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error is not Clone; keep kind and message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Returns true when `error` (or anything in its context chain) is
/// [`CredoError::AlreadyPresent`].
///
/// The CLI uses this to tolerate re-committing a spell that is already in the
/// manifest while still failing on every other error.
#[must_use]
pub fn is_already_present(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        matches!(cause.downcast_ref::<CredoError>(), Some(CredoError::AlreadyPresent { .. }))
    })
}

/// Error context wrapper that provides user-friendly error information.
///
/// Suggestions are actionable steps displayed in green; details explain the
/// failure and are displayed in yellow.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying credo error
    pub error: CredoError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: CredoError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Extension trait for converting [`CredoError`] to [`anyhow::Error`] with context
pub trait IntoAnyhowWithContext {
    /// Convert the error to an [`anyhow::Error`] with the provided context
    fn into_anyhow_with_context(self, context: ErrorContext) -> anyhow::Error;
}

impl IntoAnyhowWithContext for CredoError {
    fn into_anyhow_with_context(self, context: ErrorContext) -> anyhow::Error {
        anyhow::Error::new(ErrorContext {
            error: self,
            suggestion: context.suggestion,
            details: context.details,
        })
    }
}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`CredoError`] anywhere in the context chain (module operations
/// wrap external failures with context), [`std::io::Error`] and
/// [`toml::de::Error`]; anything else is reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(ctx) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: ctx.error.clone(),
            suggestion: ctx.suggestion.clone(),
            details: ctx.details.clone(),
        };
    }

    if let Some(credo_error) = error.chain().find_map(|cause| cause.downcast_ref::<CredoError>())
    {
        let mut context = create_error_context(credo_error.clone());
        let outer = error.to_string();
        if outer != credo_error.to_string() && context.details.is_none() {
            context.details = Some(outer);
        }
        return context;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(CredoError::IoError(std::io::Error::new(
                    io_error.kind(),
                    io_error.to_string(),
                )))
                .with_suggestion("Installing packages usually requires root. Try running with sudo")
                .with_details("credo doesn't have permission to read or write a required file");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(CredoError::IoError(std::io::Error::new(
                    io_error.kind(),
                    io_error.to_string(),
                )))
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(CredoError::ManifestParseError {
            file: "credospell.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in your credospell.toml file");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(CredoError::Other {
        message,
    })
}

/// Map each [`CredoError`] variant to tailored suggestions and details.
fn create_error_context(error: CredoError) -> ErrorContext {
    match &error {
        CredoError::AptNotFound => ErrorContext::new(error)
            .with_suggestion(
                "The apt module needs a Debian or Ubuntu host with apt-get and apt-cache in PATH",
            )
            .with_details(
                "credo shells out to apt-get to query, download and install system packages",
            ),

        CredoError::AptCommandError { operation, stderr } => {
            let suggestion = match operation.as_str() {
                "update" => {
                    "Check your network connection and /etc/apt/sources.list, \
                     then try 'apt-get update' manually"
                }
                "install"
                    if stderr.contains("Permission denied") || stderr.contains("are you root") =>
                {
                    "Installing packages requires root. Re-run with sudo"
                }
                "install" => {
                    "Check that the package name is correct with 'apt-cache policy <name>'"
                }
                "download" => "Check that the package exists in the configured apt sources",
                _ => "Try running the apt command manually for more details",
            };
            let details = if stderr.trim().is_empty() {
                None
            } else {
                Some(stderr.trim().to_string())
            };
            let mut context = ErrorContext::new(error.clone()).with_suggestion(suggestion);
            context.details = details;
            context
        }

        CredoError::UpdateCheckFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'apt-get update' manually to see the full error")
            .with_details("The package index is refreshed before every resolution"),

        CredoError::ModuleNotFound { name } => {
            let suggestion = format!(
                "Run 'credo modules' to list the modules available on this host \
                 ('{name}' may not be supported here)"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        CredoError::ManifestNotFound => ErrorContext::new(error)
            .with_suggestion(
                "Run 'credo init' to create a credospell.toml in your project directory",
            )
            .with_details(
                "credo looks for credospell.toml in the current directory and parent directories",
            ),

        CredoError::ManifestParseError { file, reason } => {
            let suggestion = format!("Check the TOML syntax in {file}");
            let details = reason.clone();
            ErrorContext::new(error).with_suggestion(suggestion).with_details(details)
        }

        CredoError::ChecksumMismatch { .. } => ErrorContext::new(error)
            .with_suggestion(
                "The remote file changed or was corrupted in transit. \
                 Verify the URL and update the sha256 in credospell.toml",
            )
            .with_details("The downloaded file was removed"),

        CredoError::ArtifactNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'credo save' before 'credo apply'"),

        CredoError::DownloadFailed { .. } | CredoError::InvalidUrl { .. } => {
            ErrorContext::new(error).with_suggestion("Check the URL and your internet connection")
        }

        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_display() {
        let error = CredoError::AptNotFound;
        assert_eq!(error.to_string(), "apt-get is not installed or not found in PATH");

        let error = CredoError::AlreadyPresent {
            module: "apt".to_string(),
            name: "python3".to_string(),
        };
        assert_eq!(error.to_string(), "Spell 'python3' is already present in the apt section");

        let error = CredoError::Converting {
            expected: "apt".to_string(),
            found: "url".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot convert url spell into a apt spell");
    }

    #[test]
    fn test_is_already_present_through_context() {
        let error = anyhow::Error::from(CredoError::AlreadyPresent {
            module: "apt".to_string(),
            name: "curl".to_string(),
        });
        assert!(is_already_present(&error));

        let wrapped: anyhow::Result<()> = Err(error);
        let wrapped = wrapped.context("Failed to commit curl").unwrap_err();
        assert!(is_already_present(&wrapped));

        let other = anyhow::Error::from(CredoError::AptNotFound);
        assert!(!is_already_present(&other));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(CredoError::AptNotFound).with_suggestion("Install apt");

        let display = format!("{ctx}");
        assert!(display.contains("apt-get is not installed"));
        assert!(display.contains("Install apt"));
    }

    #[test]
    fn test_user_friendly_error_finds_wrapped_credo_error() {
        let inner: anyhow::Result<()> = Err(CredoError::AptCommandError {
            operation: "download".to_string(),
            stderr: "E: Unable to locate package nope".to_string(),
        }
        .into());
        let error = inner.context("Failed to save apt spell 'nope'").unwrap_err();

        let ctx = user_friendly_error(error);
        assert!(matches!(ctx.error, CredoError::AptCommandError { .. }));
        assert_eq!(ctx.details.as_deref(), Some("E: Unable to locate package nope"));
        assert!(ctx.suggestion.unwrap().contains("apt sources"));
    }

    #[test]
    fn test_user_friendly_error_generic_chain() {
        let inner: anyhow::Result<()> = Err(anyhow::anyhow!("root cause"));
        let error = inner.context("outer").unwrap_err();

        let ctx = user_friendly_error(error);
        match ctx.error {
            CredoError::Other { message } => {
                assert!(message.starts_with("outer"));
                assert!(message.contains("1: root cause"));
            }
            other => panic!("Expected Other, got {other:?}"),
        }
    }

    #[test]
    fn test_clone_io_error_keeps_kind() {
        let error = CredoError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "nope",
        ));
        match error.clone() {
            CredoError::IoError(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("Expected IoError"),
        }
    }
}
