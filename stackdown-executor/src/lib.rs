//! Remote compose shutdown with pluggable transports
//!
//! This crate provides a trait-based abstraction over remote command
//! sessions, including an OpenSSH implementation and a mock, and the
//! executor that issues `compose down` through them.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod channel;
pub mod command;
pub mod executor;
pub mod ssh;

pub use channel::{MockChannel, RecordedCall, RemoteChannel};
pub use command::{RemoteCommand, shell_quote};
pub use executor::Executor;
pub use ssh::SshChannel;

// Re-export commonly used types
pub use stackdown_core::{CancelToken, ExecutionResult, ExecutorConfig, SshConfig};
