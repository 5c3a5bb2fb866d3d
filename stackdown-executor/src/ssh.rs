//! OpenSSH client channel

use async_trait::async_trait;
use stackdown_core::error::SSH_ERROR_EXIT;
use stackdown_core::{Error, ExecutionResult, Result, SshConfig};
use std::net::IpAddr;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::channel::RemoteChannel;
use crate::command::RemoteCommand;

/// Runs commands through the local `ssh` binary
///
/// Arguments are passed to the client directly, without a local shell. The
/// child is killed if the returned future is dropped, so timeouts and
/// cancellation terminate the session.
#[derive(Debug, Clone)]
pub struct SshChannel {
    config: SshConfig,
}

impl SshChannel {
    /// Create a channel from ssh configuration
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn new(config: SshConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configured ssh program
    #[must_use]
    pub fn program(&self) -> String {
        self.config.program.to_string_lossy().into_owned()
    }

    /// Arguments passed to the ssh program, without the program itself
    #[must_use]
    pub fn args(&self, host: IpAddr, user: &str, command: &RemoteCommand) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout.as_secs()),
            "-o".to_string(),
            format!(
                "StrictHostKeyChecking={}",
                self.config.strict_host_key_checking
            ),
        ];

        if let Some(port) = self.config.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }

        if let Some(ref identity) = self.config.identity_file {
            args.push("-i".to_string());
            args.push(identity.to_string_lossy().into_owned());
        }

        for option in &self.config.extra_options {
            args.push("-o".to_string());
            args.push(option.clone());
        }

        args.push("-l".to_string());
        args.push(user.to_string());
        args.push("--".to_string());
        args.push(host.to_string());
        args.push(command.render());

        args
    }
}

#[async_trait]
impl RemoteChannel for SshChannel {
    async fn run(
        &self,
        host: IpAddr,
        user: &str,
        command: &RemoteCommand,
    ) -> Result<ExecutionResult> {
        let args = self.args(host, user, command);
        debug!(program = %self.program(), ?args, "Spawning ssh");

        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::transport(format!(
                    "Failed to start ssh client '{}': {e}",
                    self.program()
                ))
            })?;

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        let Some(exit_code) = output.status.code() else {
            warn!(host = %host, "ssh terminated by signal");
            return Err(Error::transport(format!(
                "ssh to {host} was terminated by a signal"
            )));
        };

        if exit_code == SSH_ERROR_EXIT {
            return Err(classify_ssh_failure(host, &stderr));
        }

        debug!(host = %host, exit_code, "ssh finished");

        Ok(ExecutionResult {
            exit_code,
            stdout,
            stderr,
        })
    }
}

/// Map an ssh client failure (exit 255) to the error taxonomy
fn classify_ssh_failure(host: IpAddr, stderr: &str) -> Error {
    let lower = stderr.to_lowercase();
    let auth_markers = [
        "permission denied",
        "host key verification failed",
        "too many authentication failures",
        "no supported authentication methods",
    ];

    let message = format!("ssh to {host}: {}", stderr.trim());

    if auth_markers.iter().any(|marker| lower.contains(marker)) {
        Error::Auth { message }
    } else {
        Error::transport(message)
    }
}
