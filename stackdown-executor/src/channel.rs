//! Remote channel trait for pluggable transports

use async_trait::async_trait;
use stackdown_core::{Error, ExecutionResult, Result};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::command::RemoteCommand;

/// Trait for remote command transports
///
/// This allows for different implementations:
/// - [`SshChannel`](crate::SshChannel) - OpenSSH client
/// - [`MockChannel`] - Testing without a host
///
/// Implementations report transport-level failures (unreachable host,
/// rejected credentials) as errors and return the remote exit status as-is
/// otherwise; interpreting a non-zero status is the executor's job.
///
/// # Thread Safety
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait RemoteChannel: Send + Sync {
    /// Run `command` on `host` as `user`
    ///
    /// # Errors
    /// Returns [`Error::Transport`] or [`Error::Auth`] if the session cannot
    /// be established
    async fn run(&self, host: IpAddr, user: &str, command: &RemoteCommand)
    -> Result<ExecutionResult>;
}

/// A call observed by [`MockChannel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Host the command was sent to
    pub host: IpAddr,
    /// Login used
    pub user: String,
    /// Command sent
    pub command: RemoteCommand,
}

#[derive(Debug, Clone)]
enum MockReply {
    Result(ExecutionResult),
    Unreachable(String),
    Rejected(String),
    Hang,
}

/// Mock channel for testing (never opens a connection)
///
/// # Example
/// ```
/// use stackdown_executor::{MockChannel, RemoteChannel, RemoteCommand};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let channel = MockChannel::exiting(137, "Killed");
/// let command = RemoteCommand::new("/srv", vec!["true".to_string()]);
///
/// let result = channel
///     .run("203.0.113.7".parse().unwrap(), "yc-user", &command)
///     .await
///     .unwrap();
/// assert_eq!(result.exit_code, 137);
/// assert_eq!(channel.call_count().await, 1);
/// # });
/// ```
#[derive(Clone)]
pub struct MockChannel {
    state: Arc<Mutex<MockState>>,
}

struct MockState {
    reply: MockReply,
    calls: Vec<RecordedCall>,
}

impl MockChannel {
    fn with_reply(reply: MockReply) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                reply,
                calls: Vec::new(),
            })),
        }
    }

    /// Every command exits 0
    #[must_use]
    pub fn succeeding() -> Self {
        Self::with_reply(MockReply::Result(ExecutionResult::success("")))
    }

    /// Every command exits with `exit_code`
    #[must_use]
    pub fn exiting(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Result(ExecutionResult::failure(exit_code, stderr)))
    }

    /// Every command returns exactly `result`
    #[must_use]
    pub fn replying(result: ExecutionResult) -> Self {
        Self::with_reply(MockReply::Result(result))
    }

    /// Every session fails to connect
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Unreachable(message.into()))
    }

    /// Every session is refused authentication
    #[must_use]
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Rejected(message.into()))
    }

    /// Every command hangs until dropped
    #[must_use]
    pub fn hanging() -> Self {
        Self::with_reply(MockReply::Hang)
    }

    /// Get the number of commands received (for testing)
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    /// Get every command received (for testing)
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }
}

impl std::fmt::Debug for MockChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChannel").finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteChannel for MockChannel {
    async fn run(
        &self,
        host: IpAddr,
        user: &str,
        command: &RemoteCommand,
    ) -> Result<ExecutionResult> {
        let reply = {
            let mut state = self.state.lock().await;
            state.calls.push(RecordedCall {
                host,
                user: user.to_string(),
                command: command.clone(),
            });

            tracing::debug!(
                host = %host,
                user,
                command = %command,
                calls = state.calls.len(),
                "Mock: Ran remote command"
            );

            state.reply.clone()
        };

        match reply {
            MockReply::Result(result) => Ok(result),
            MockReply::Unreachable(message) => Err(Error::transport(message)),
            MockReply::Rejected(message) => Err(Error::Auth { message }),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackdown_core::ErrorCategory;

    fn command() -> RemoteCommand {
        RemoteCommand::new("/srv", vec!["true".to_string()])
    }

    fn host() -> IpAddr {
        "203.0.113.7".parse().unwrap()
    }

    #[tokio::test]
    async fn test_mock_channel_records_calls() {
        let channel = MockChannel::succeeding();

        channel.run(host(), "yc-user", &command()).await.unwrap();
        channel.run(host(), "root", &command()).await.unwrap();

        let calls = channel.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].user, "yc-user");
        assert_eq!(calls[1].user, "root");
        assert_eq!(calls[0].host, host());
    }

    #[tokio::test]
    async fn test_mock_channel_errors() {
        let err = MockChannel::unreachable("Connection timed out")
            .run(host(), "u", &command())
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transport);

        let err = MockChannel::rejecting("Permission denied (publickey)")
            .run(host(), "u", &command())
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Auth);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_channel_hangs() {
        let channel = MockChannel::hanging();
        let cmd = command();
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            channel.run(host(), "u", &cmd),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(channel.call_count().await, 1);
    }
}
