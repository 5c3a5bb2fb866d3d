//! Instance resolution with pluggable cloud backends
//!
//! This crate turns a deployment name into the public address of exactly one
//! cloud instance, through a trait-based listing backend with production and
//! mock implementations.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod resolver;
pub mod source;
pub mod yc;

pub use resolver::{Resolver, select_instance};
pub use source::{InstanceRecord, InstanceSource, MockSource};
pub use yc::YcCliSource;

// Re-export commonly used types
pub use stackdown_core::{MatchMode, ResolvedEndpoint, ResolverConfig};
