//! Instance source trait for pluggable cloud listings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stackdown_core::{Error, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One instance as reported by the cloud provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Provider-assigned identifier
    pub id: String,
    /// Human-assigned name
    pub name: String,
    /// Lifecycle status, e.g. `RUNNING`
    pub status: String,
    /// Public address, if the instance has one
    pub public_ip: Option<String>,
}

impl InstanceRecord {
    /// Create a running instance record
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        public_ip: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: "RUNNING".to_string(),
            public_ip: public_ip.map(str::to_string),
        }
    }

    /// Override the status
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// Trait for instance listing backends
///
/// This allows for different implementations:
/// - [`YcCliSource`](crate::YcCliSource) - Yandex Cloud CLI
/// - [`MockSource`] - Testing without a cloud account
///
/// # Thread Safety
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait InstanceSource: Send + Sync {
    /// List every instance visible to the configured credentials
    ///
    /// # Errors
    /// Returns error if the provider cannot be reached or rejects the caller
    async fn list_instances(&self) -> Result<Vec<InstanceRecord>>;
}

/// Scripted failure for [`MockSource`]
#[derive(Debug, Clone)]
enum MockFailure {
    Transport(String),
    Auth(String),
    Hang,
}

/// Mock source for testing (never talks to a cloud)
///
/// # Example
/// ```
/// use stackdown_resolver::{InstanceRecord, InstanceSource, MockSource};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let source = MockSource::new(vec![
///     InstanceRecord::new("fhm1", "pytrade2", Some("203.0.113.7")),
/// ]);
///
/// let instances = source.list_instances().await.unwrap();
/// assert_eq!(instances.len(), 1);
/// assert_eq!(source.call_count().await, 1);
/// # });
/// ```
#[derive(Clone)]
pub struct MockSource {
    state: Arc<Mutex<MockState>>,
}

struct MockState {
    instances: Vec<InstanceRecord>,
    failure: Option<MockFailure>,
    call_count: usize,
}

impl MockSource {
    /// Create a mock returning the given instances
    #[must_use]
    pub fn new(instances: Vec<InstanceRecord>) -> Self {
        Self::with_state(instances, None)
    }

    /// Create a mock whose listing fails with a transport error
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::with_state(Vec::new(), Some(MockFailure::Transport(message.into())))
    }

    /// Create a mock whose listing fails with an auth error
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_state(Vec::new(), Some(MockFailure::Auth(message.into())))
    }

    /// Create a mock whose listing never returns
    #[must_use]
    pub fn hanging() -> Self {
        Self::with_state(Vec::new(), Some(MockFailure::Hang))
    }

    fn with_state(instances: Vec<InstanceRecord>, failure: Option<MockFailure>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                instances,
                failure,
                call_count: 0,
            })),
        }
    }

    /// Get the number of listings made (for testing)
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.call_count
    }

    /// Replace the instance list (for testing)
    pub async fn set_instances(&self, instances: Vec<InstanceRecord>) {
        self.state.lock().await.instances = instances;
    }
}

impl std::fmt::Debug for MockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl InstanceSource for MockSource {
    async fn list_instances(&self) -> Result<Vec<InstanceRecord>> {
        let (instances, failure) = {
            let mut state = self.state.lock().await;
            state.call_count += 1;

            tracing::debug!(
                instances = state.instances.len(),
                call = state.call_count,
                "Mock: Listed instances"
            );

            (state.instances.clone(), state.failure.clone())
        };

        match failure {
            Some(MockFailure::Transport(message)) => Err(Error::transport(message)),
            Some(MockFailure::Auth(message)) => Err(Error::Auth { message }),
            Some(MockFailure::Hang) => std::future::pending().await,
            None => Ok(instances),
        }
    }
}
