//! Error types for stackdown

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Remote exit status used when the working directory cannot be entered
///
/// The rendered remote line is `cd -- <dir> || exit 96; ...`, and the program's
/// own 96 is rewritten to [`RESERVED_STATUS_EXIT`], so this code only appears
/// when `cd` itself failed.
pub const WORKDIR_MISSING_EXIT: i32 = 96;

/// Remote status the OpenSSH client uses for its own failures
pub const SSH_ERROR_EXIT: i32 = 255;

/// Stand-in for a program status that collides with [`WORKDIR_MISSING_EXIT`]
/// or [`SSH_ERROR_EXIT`]
pub const RESERVED_STATUS_EXIT: i32 = 254;

/// Exit status reported by a POSIX shell for an unknown command
pub const COMMAND_NOT_FOUND_EXIT: i32 = 127;

/// Why a remote command was reported as failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFailure {
    /// The command ran and returned a non-zero status
    NonZeroExit,
    /// The remote shell could not find the program
    CommandNotFound,
    /// The working directory does not exist on the host
    WorkingDirectoryMissing,
}

impl RemoteFailure {
    /// Classify a non-zero remote exit code
    #[must_use]
    pub const fn from_exit_code(code: i32) -> Self {
        match code {
            COMMAND_NOT_FOUND_EXIT => Self::CommandNotFound,
            WORKDIR_MISSING_EXIT => Self::WorkingDirectoryMissing,
            _ => Self::NonZeroExit,
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonZeroExit => write!(f, "non-zero exit"),
            Self::CommandNotFound => write!(f, "command not found"),
            Self::WorkingDirectoryMissing => write!(f, "working directory missing"),
        }
    }
}

/// Coarse error category, one per user-visible exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad flags, environment or target definition
    Config,
    /// Instance lookup failed (not found, ambiguous, malformed)
    Resolution,
    /// Could not reach the cloud API or the host
    Transport,
    /// Credentials were rejected
    Auth,
    /// The remote command ran and failed
    RemoteCommand,
    /// The operation hit its deadline or was cancelled
    Timeout,
    /// Local I/O or serialization failure
    Internal,
}

impl ErrorCategory {
    /// Process exit status for this category
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Internal => 1,
            Self::Config => 2,
            Self::Resolution => 3,
            Self::Transport => 4,
            Self::Auth => 5,
            Self::RemoteCommand => 6,
            Self::Timeout => 7,
        }
    }
}

/// stackdown error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No instance matched the filter
    #[error("No instance matches '{filter}'")]
    NotFound {
        /// Name filter that was used
        filter: String,
    },

    /// More than one instance matched the filter
    #[error("Filter '{filter}' is ambiguous, it matches: {}", matches.join(", "))]
    AmbiguousMatch {
        /// Name filter that was used
        filter: String,
        /// Names of every matching instance
        matches: Vec<String>,
    },

    /// The matching instance carries an unusable field
    #[error("Instance '{instance}' has a malformed {field}: {message}")]
    MalformedField {
        /// Instance name
        instance: String,
        /// Field that failed validation
        field: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// Network, DNS or collaborator process failure
    #[error("Transport error: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// Credentials rejected by the cloud API or the host
    #[error("Authentication failed: {message}")]
    Auth {
        /// Error message
        message: String,
    },

    /// The remote command exited with a non-zero status
    #[error("Remote command failed ({reason}, exit code {exit_code}): {}", stderr.trim())]
    RemoteCommand {
        /// Classified reason
        reason: RemoteFailure,
        /// Remote exit status
        exit_code: i32,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// Operation exceeded its deadline
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        /// What was running
        operation: &'static str,
        /// Deadline that elapsed
        after: Duration,
    },

    /// Operation was cancelled by the caller
    #[error("{operation} was cancelled")]
    Cancelled {
        /// What was running
        operation: &'static str,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidConfig`]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Transport`]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Category this error belongs to
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } | Self::AmbiguousMatch { .. } | Self::MalformedField { .. } => {
                ErrorCategory::Resolution
            }
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::Auth { .. } => ErrorCategory::Auth,
            Self::RemoteCommand { .. } => ErrorCategory::RemoteCommand,
            Self::Timeout { .. } | Self::Cancelled { .. } => ErrorCategory::Timeout,
            Self::InvalidConfig { .. } => ErrorCategory::Config,
            Self::Io(_) | Self::Json(_) => ErrorCategory::Internal,
        }
    }

    /// Process exit status for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}

/// Result type alias for stackdown operations
pub type Result<T> = std::result::Result<T, Error>;
