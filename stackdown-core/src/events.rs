//! Stop lifecycle events with structured tracing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::{Duration, SystemTime};

/// Events emitted while stopping a deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Instance lookup started
    Resolving {
        /// Target name
        target: String,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Instance resolved to a public address
    Resolved {
        /// Target name
        target: String,
        /// Matched instance
        instance: String,
        /// Public address
        ip: IpAddr,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Remote command sent to the host
    CommandIssued {
        /// Target name
        target: String,
        /// Public address
        ip: IpAddr,
        /// Remote shell line
        command: String,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Remote command finished with exit code 0
    Completed {
        /// Target name
        target: String,
        /// Remote exit status
        exit_code: i32,
        /// Time spent on the remote command
        #[serde(with = "duration_serde")]
        elapsed: Duration,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },

    /// Any step failed
    Failed {
        /// Target name
        target: String,
        /// Error message
        message: String,
        /// Timestamp
        #[serde(with = "systemtime_serde")]
        timestamp: SystemTime,
    },
}

impl LifecycleEvent {
    /// Get the target name from any event
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Resolving { target, .. }
            | Self::Resolved { target, .. }
            | Self::CommandIssued { target, .. }
            | Self::Completed { target, .. }
            | Self::Failed { target, .. } => target,
        }
    }

    /// Get the timestamp from any event
    #[must_use]
    pub const fn timestamp(&self) -> SystemTime {
        match self {
            Self::Resolving { timestamp, .. }
            | Self::Resolved { timestamp, .. }
            | Self::CommandIssued { timestamp, .. }
            | Self::Completed { timestamp, .. }
            | Self::Failed { timestamp, .. } => *timestamp,
        }
    }

    /// Short machine name of the event kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Resolving { .. } => "resolving",
            Self::Resolved { .. } => "resolved",
            Self::CommandIssued { .. } => "command_issued",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    /// Emit structured tracing event
    pub fn emit_trace(&self) {
        match self {
            Self::Resolving { target, .. } => {
                tracing::debug!(target_name = %target, event = "resolving", "Resolving instance");
            }
            Self::Resolved {
                target,
                instance,
                ip,
                ..
            } => {
                tracing::info!(
                    target_name = %target,
                    instance = %instance,
                    ip = %ip,
                    event = "resolved",
                    "Instance resolved"
                );
            }
            Self::CommandIssued {
                target,
                ip,
                command,
                ..
            } => {
                tracing::info!(
                    target_name = %target,
                    ip = %ip,
                    command = %command,
                    event = "command_issued",
                    "Remote command issued"
                );
            }
            Self::Completed {
                target,
                exit_code,
                elapsed,
                ..
            } => {
                tracing::info!(
                    target_name = %target,
                    exit_code,
                    elapsed_ms = elapsed.as_millis(),
                    event = "completed",
                    "Stack stopped"
                );
            }
            Self::Failed {
                target, message, ..
            } => {
                tracing::error!(
                    target_name = %target,
                    message = %message,
                    event = "failed",
                    "Stop failed"
                );
            }
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolving { target, .. } => write!(f, "Resolving {target}"),
            Self::Resolved {
                target, instance, ip, ..
            } => write!(f, "{target} resolved to {instance} at {ip}"),
            Self::CommandIssued { target, ip, command, .. } => {
                write!(f, "{target}: running '{command}' on {ip}")
            }
            Self::Completed {
                target, elapsed, ..
            } => write!(f, "{target} stopped in {elapsed:?}"),
            Self::Failed {
                target, message, ..
            } => write!(f, "{target} failed: {message}"),
        }
    }
}

// Custom Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Custom SystemTime serialization
mod systemtime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_u64(since_epoch.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}
