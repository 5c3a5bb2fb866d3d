//! Guarded compose shutdown on a resolved host

use stackdown_core::{
    CancelToken, DeploymentTarget, Error, ExecutionResult, ExecutorConfig, RemoteFailure,
    ResolvedEndpoint, Result,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::channel::RemoteChannel;
use crate::command::RemoteCommand;

/// Issues `compose down` against a deployment on a resolved endpoint
///
/// The command is sent at most once per call; nothing here retries.
pub struct Executor {
    channel: Arc<dyn RemoteChannel>,
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor over a remote channel
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn new(channel: Arc<dyn RemoteChannel>, config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { channel, config })
    }

    /// Executor configuration
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// The command [`Executor::stop`] would send for `target`
    #[must_use]
    pub fn command_for(&self, target: &DeploymentTarget) -> RemoteCommand {
        RemoteCommand::compose_down(target, &self.config)
    }

    /// Bring the target's compose stack down
    ///
    /// # Errors
    /// - [`Error::Transport`] / [`Error::Auth`] from the channel
    /// - [`Error::RemoteCommand`] when the remote exit status is non-zero
    /// - [`Error::Timeout`] when the command outlives `command_timeout`
    /// - [`Error::Cancelled`] when `cancel` fires first
    pub async fn stop(
        &self,
        endpoint: &ResolvedEndpoint,
        target: &DeploymentTarget,
        cancel: &CancelToken,
    ) -> Result<ExecutionResult> {
        let operation = "remote command";

        if cancel.is_cancelled() {
            return Err(Error::Cancelled { operation });
        }

        let command = self.command_for(target);
        let host = endpoint.public_ip();

        info!(
            target_name = target.name(),
            host = %host,
            user = target.remote_user(),
            command = %command,
            "Stopping compose stack"
        );

        let started = Instant::now();
        let run = timeout(
            self.config.command_timeout,
            self.channel.run(host, target.remote_user(), &command),
        );

        let result = tokio::select! {
            outcome = run => match outcome {
                Ok(result) => result?,
                Err(_) => {
                    warn!(host = %host, timeout_secs = self.config.command_timeout.as_secs(), "Remote command timed out");
                    return Err(Error::Timeout {
                        operation,
                        after: self.config.command_timeout,
                    });
                }
            },
            () = cancel.cancelled() => {
                warn!(host = %host, "Remote command cancelled");
                return Err(Error::Cancelled { operation });
            }
        };

        debug!(
            host = %host,
            exit_code = result.exit_code,
            elapsed_ms = started.elapsed().as_millis(),
            "Remote command finished"
        );

        if !result.is_success() {
            let reason = RemoteFailure::from_exit_code(result.exit_code);
            warn!(host = %host, exit_code = result.exit_code, %reason, "Remote command failed");
            return Err(Error::RemoteCommand {
                reason,
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        Ok(result)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockChannel;
    use std::time::Duration;

    fn endpoint() -> ResolvedEndpoint {
        ResolvedEndpoint::parse("pytrade2", "203.0.113.7").unwrap()
    }

    fn target() -> DeploymentTarget {
        DeploymentTarget::with_default_directory("pytrade2", "yc-user").unwrap()
    }

    #[tokio::test]
    async fn test_stop_success() {
        let channel = Arc::new(MockChannel::succeeding());
        let executor = Executor::new(channel.clone(), ExecutorConfig::default()).unwrap();

        let result = executor
            .stop(&endpoint(), &target(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);

        let calls = channel.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].host.to_string(), "203.0.113.7");
        assert_eq!(calls[0].user, "yc-user");
        assert_eq!(
            calls[0].command.working_directory(),
            std::path::Path::new("/home/yc-user/pytrade2")
        );
    }

    #[tokio::test]
    async fn test_stop_surfaces_exit_code() {
        let channel = Arc::new(MockChannel::exiting(137, "Killed"));
        let executor = Executor::new(channel, ExecutorConfig::default()).unwrap();

        let err = executor
            .stop(&endpoint(), &target(), &CancelToken::new())
            .await
            .unwrap_err();

        match err {
            Error::RemoteCommand {
                reason,
                exit_code,
                stderr,
                ..
            } => {
                assert_eq!(reason, RemoteFailure::NonZeroExit);
                assert_eq!(exit_code, 137);
                assert_eq!(stderr, "Killed");
            }
            other => panic!("expected RemoteCommand, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stop_classifies_missing_directory() {
        let channel = Arc::new(MockChannel::exiting(
            96,
            "sh: cd: can't cd to /home/yc-user/pytrade2",
        ));
        let executor = Executor::new(channel, ExecutorConfig::default()).unwrap();

        let err = executor
            .stop(&endpoint(), &target(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RemoteCommand {
                reason: RemoteFailure::WorkingDirectoryMissing,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_times_out() {
        let channel = Arc::new(MockChannel::hanging());
        let executor = Executor::new(channel, ExecutorConfig::default()).unwrap();

        // Paused clock: the 300 s default elapses instantly
        let err = executor
            .stop(&endpoint(), &target(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Timeout { after, .. } if after == Duration::from_secs(300)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancelled_while_running() {
        let channel = Arc::new(MockChannel::hanging());
        let executor = Executor::new(channel, ExecutorConfig::default()).unwrap();
        let cancel = CancelToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = executor
            .stop(&endpoint(), &target(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_stop_already_cancelled_sends_nothing() {
        let channel = Arc::new(MockChannel::succeeding());
        let executor = Executor::new(channel.clone(), ExecutorConfig::default()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = executor
            .stop(&endpoint(), &target(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }));
        assert_eq!(channel.call_count().await, 0);
    }
}
