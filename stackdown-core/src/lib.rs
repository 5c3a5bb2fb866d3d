//! stackdown core - domain types, errors, configuration and events
//!
//! This crate provides the abstractions shared by the resolver, the executor
//! and the command-line front end.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use cancel::CancelToken;
pub use config::{ExecutorConfig, MatchMode, ResolverConfig, SshConfig};
pub use error::{Error, ErrorCategory, RemoteFailure, Result};
pub use events::LifecycleEvent;
pub use types::{DeploymentTarget, ExecutionResult, ResolvedEndpoint};
