//! Name filter to public endpoint resolution

use stackdown_core::{Error, MatchMode, ResolvedEndpoint, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::source::{InstanceRecord, InstanceSource};

/// Resolves a deployment name to the public IP of exactly one instance
///
/// The endpoint is never cached: every call lists instances again.
pub struct Resolver {
    source: Arc<dyn InstanceSource>,
    match_mode: MatchMode,
}

impl Resolver {
    /// Create a resolver over an instance source
    #[must_use]
    pub fn new(source: Arc<dyn InstanceSource>) -> Self {
        Self {
            source,
            match_mode: MatchMode::default(),
        }
    }

    /// Set how names are compared against the filter
    #[must_use]
    pub const fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Current match mode
    #[must_use]
    pub const fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// Resolve `name_filter` to a public endpoint
    ///
    /// # Errors
    /// - [`Error::InvalidConfig`] for an empty filter
    /// - [`Error::NotFound`] when nothing matches
    /// - [`Error::AmbiguousMatch`] when more than one instance matches
    /// - [`Error::MalformedField`] when the match has no usable public IP
    /// - whatever the source returns when listing fails
    pub async fn resolve(&self, name_filter: &str) -> Result<ResolvedEndpoint> {
        if name_filter.trim().is_empty() {
            return Err(Error::invalid_config("Name filter cannot be empty"));
        }

        debug!(filter = name_filter, mode = ?self.match_mode, "Resolving instance");

        let instances = self.source.list_instances().await?;
        let instance = select_instance(&instances, name_filter, self.match_mode)?;

        let public_ip = instance.public_ip.as_deref().unwrap_or_default();
        let endpoint = ResolvedEndpoint::parse(&instance.name, public_ip)?;

        info!(
            filter = name_filter,
            instance = %instance.name,
            ip = %endpoint,
            status = %instance.status,
            "Resolved instance"
        );

        Ok(endpoint)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("match_mode", &self.match_mode)
            .finish_non_exhaustive()
    }
}

/// Pick the single instance whose name matches `filter`
///
/// # Errors
/// Returns [`Error::NotFound`] or [`Error::AmbiguousMatch`]
pub fn select_instance<'a>(
    instances: &'a [InstanceRecord],
    filter: &str,
    mode: MatchMode,
) -> Result<&'a InstanceRecord> {
    let matches: Vec<&InstanceRecord> = instances
        .iter()
        .filter(|instance| mode.matches(&instance.name, filter))
        .collect();

    match matches.as_slice() {
        [] => Err(Error::NotFound {
            filter: filter.to_string(),
        }),
        [only] => Ok(*only),
        many => Err(Error::AmbiguousMatch {
            filter: filter.to_string(),
            matches: many.iter().map(|i| i.name.clone()).collect(),
        }),
    }
}
