//! Explicit configuration for the resolver and executor
//!
//! Settings that would otherwise come from the ambient shell are spelled out
//! here and handed to constructors: the cloud CLI profile, ssh defaults and
//! the compose invocation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// How instance names are compared against the filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Name contains the filter
    #[default]
    Substring,
    /// Name equals the filter
    Exact,
}

impl MatchMode {
    /// Whether `name` matches `filter` under this mode
    #[must_use]
    pub fn matches(self, name: &str, filter: &str) -> bool {
        match self {
            Self::Substring => name.contains(filter),
            Self::Exact => name == filter,
        }
    }
}

/// Cloud CLI settings used by the resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Path or name of the `yc` binary
    pub cli_path: PathBuf,

    /// Folder to list instances from (CLI default when unset)
    pub folder_id: Option<String>,

    /// CLI profile (CLI default when unset)
    pub profile: Option<String>,

    /// Deadline for the instance listing
    pub list_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cli_path: PathBuf::from("yc"),
            folder_id: None,
            profile: None,
            list_timeout: Duration::from_secs(60),
        }
    }
}

impl ResolverConfig {
    /// Create a resolver configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific cloud CLI binary
    #[must_use]
    pub fn with_cli_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cli_path = path.into();
        self
    }

    /// Restrict listing to a folder
    #[must_use]
    pub fn with_folder_id(mut self, folder_id: Option<String>) -> Self {
        self.folder_id = folder_id;
        self
    }

    /// Use a named CLI profile
    #[must_use]
    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    /// Set listing deadline
    #[must_use]
    pub const fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns error if the CLI path is empty or the timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.cli_path.as_os_str().is_empty() {
            return Err(Error::invalid_config("Cloud CLI path cannot be empty"));
        }

        if self.list_timeout.is_zero() {
            return Err(Error::invalid_config("List timeout must be positive"));
        }

        Ok(())
    }
}

/// OpenSSH client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// Path or name of the `ssh` binary
    pub program: PathBuf,

    /// Remote port (ssh default when unset)
    pub port: Option<u16>,

    /// Private key file
    pub identity_file: Option<PathBuf>,

    /// `ConnectTimeout` passed to ssh
    pub connect_timeout: Duration,

    /// `StrictHostKeyChecking` policy
    pub strict_host_key_checking: String,

    /// Extra `-o` options, each `Key=Value`
    pub extra_options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ssh"),
            port: None,
            identity_file: None,
            connect_timeout: Duration::from_secs(10),
            strict_host_key_checking: "accept-new".to_string(),
            extra_options: Vec::new(),
        }
    }
}

impl SshConfig {
    /// Create an ssh configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific ssh binary
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set remote port
    #[must_use]
    pub const fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Set identity file
    #[must_use]
    pub fn with_identity_file(mut self, path: Option<PathBuf>) -> Self {
        self.identity_file = path;
        self
    }

    /// Set connect timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Add an extra `-o` option
    #[must_use]
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.extra_options.push(option.into());
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns error if the program is empty, the connect timeout is below
    /// one second or an extra option is not `Key=Value`
    pub fn validate(&self) -> Result<()> {
        if self.program.as_os_str().is_empty() {
            return Err(Error::invalid_config("ssh program cannot be empty"));
        }

        if self.connect_timeout.as_secs() == 0 {
            return Err(Error::invalid_config(
                "ssh connect timeout must be at least 1 second",
            ));
        }

        if self.port == Some(0) {
            return Err(Error::invalid_config("ssh port cannot be 0"));
        }

        for option in &self.extra_options {
            let valid = option
                .split_once('=')
                .is_some_and(|(key, _)| !key.is_empty() && !key.starts_with('-'));
            if !valid {
                return Err(Error::invalid_config(format!(
                    "ssh option must look like Key=Value, got: {option}"
                )));
            }
        }

        Ok(())
    }
}

/// What the executor runs on the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Compose invocation, e.g. `["docker", "compose"]`
    pub compose_command: Vec<String>,

    /// Prefix the command with `sudo`
    pub use_sudo: bool,

    /// Deadline for the remote command
    pub command_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            compose_command: vec!["docker".to_string(), "compose".to_string()],
            use_sudo: true,
            command_timeout: Duration::from_secs(300),
        }
    }
}

impl ExecutorConfig {
    /// Create an executor configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compose invocation from a whitespace separated string
    #[must_use]
    pub fn with_compose(mut self, compose: &str) -> Self {
        self.compose_command = compose.split_whitespace().map(str::to_string).collect();
        self
    }

    /// Enable or disable `sudo`
    #[must_use]
    pub const fn with_sudo(mut self, enable: bool) -> Self {
        self.use_sudo = enable;
        self
    }

    /// Set remote command deadline
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns error if the compose command is empty or the timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.compose_command.is_empty() {
            return Err(Error::invalid_config("Compose command cannot be empty"));
        }

        if self.command_timeout.is_zero() {
            return Err(Error::invalid_config("Command timeout must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_mode() {
        assert!(MatchMode::Substring.matches("pytrade2-dev", "pytrade2"));
        assert!(!MatchMode::Exact.matches("pytrade2-dev", "pytrade2"));
        assert!(MatchMode::Exact.matches("pytrade2", "pytrade2"));
    }

    #[test]
    fn test_defaults_validate() {
        assert!(ResolverConfig::default().validate().is_ok());
        assert!(SshConfig::default().validate().is_ok());
        assert!(ExecutorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_ssh_option_validation() {
        assert!(SshConfig::new()
            .with_option("ServerAliveInterval=30")
            .validate()
            .is_ok());
        assert!(SshConfig::new().with_option("-oFoo").validate().is_err());
        assert!(SshConfig::new().with_option("NoEquals").validate().is_err());
        assert!(SshConfig::new().with_port(Some(0)).validate().is_err());
    }

    #[test]
    fn test_compose_parsing() {
        let config = ExecutorConfig::new().with_compose("docker-compose  ");
        assert_eq!(config.compose_command, vec!["docker-compose"]);

        let empty = ExecutorConfig::new().with_compose("   ");
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        assert!(ResolverConfig::new()
            .with_list_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ExecutorConfig::new()
            .with_command_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }
}
