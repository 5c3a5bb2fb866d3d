//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A logical deployment: which instance, which login, which compose directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentTarget {
    name: String,
    remote_user: String,
    remote_working_directory: PathBuf,
}

impl DeploymentTarget {
    /// Target name used before any configuration is supplied
    pub const DEFAULT_NAME: &'static str = "pytrade2";

    /// Remote login used before any configuration is supplied
    pub const DEFAULT_USER: &'static str = "yc-user";

    /// Create a new `DeploymentTarget` with validation
    ///
    /// # Errors
    /// Returns error if the name or user is empty or contains characters
    /// that cannot appear in an ssh login, or if the directory is relative
    pub fn new(
        name: impl Into<String>,
        remote_user: impl Into<String>,
        remote_working_directory: impl Into<PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        let remote_user = remote_user.into();
        let remote_working_directory = remote_working_directory.into();

        Self::validate_name(&name)?;
        Self::validate_user(&remote_user)?;
        Self::validate_directory(&remote_working_directory)?;

        Ok(Self {
            name,
            remote_user,
            remote_working_directory,
        })
    }

    /// Build a target whose directory is `/home/<user>/<name>`
    ///
    /// # Errors
    /// Same as [`DeploymentTarget::new`]
    pub fn with_default_directory(
        name: impl Into<String>,
        remote_user: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let remote_user = remote_user.into();
        let dir = Self::default_directory(&name, &remote_user);
        Self::new(name, remote_user, dir)
    }

    /// Default compose directory for a user and target
    #[must_use]
    pub fn default_directory(name: &str, remote_user: &str) -> PathBuf {
        PathBuf::from("/home").join(remote_user).join(name)
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::invalid_config("Target name cannot be empty"));
        }

        // The name doubles as the last component of the default directory
        if name == "." || name == ".." || name.chars().any(|c| c == '/' || c.is_control()) {
            return Err(Error::invalid_config(format!(
                "Target name '{name}' is not a valid directory name"
            )));
        }

        Ok(())
    }

    fn validate_user(user: &str) -> Result<()> {
        if user.is_empty() {
            return Err(Error::invalid_config("Remote user cannot be empty"));
        }

        if user.starts_with('-') {
            return Err(Error::invalid_config("Remote user cannot start with '-'"));
        }

        if user
            .chars()
            .any(|c| c == '@' || c.is_whitespace() || c.is_control())
        {
            return Err(Error::invalid_config(format!(
                "Remote user '{user}' contains invalid characters"
            )));
        }

        Ok(())
    }

    fn validate_directory(dir: &Path) -> Result<()> {
        if !dir.is_absolute() {
            return Err(Error::invalid_config(format!(
                "Remote working directory must be absolute, got: {}",
                dir.display()
            )));
        }

        if dir.to_string_lossy().chars().any(char::is_control) {
            return Err(Error::invalid_config(
                "Remote working directory contains control characters",
            ));
        }

        Ok(())
    }

    /// Instance name filter
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Login on the remote host
    #[must_use]
    pub fn remote_user(&self) -> &str {
        &self.remote_user
    }

    /// Directory holding the compose file on the remote host
    #[must_use]
    pub fn remote_working_directory(&self) -> &Path {
        &self.remote_working_directory
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{})",
            self.name,
            self.remote_user,
            self.remote_working_directory.display()
        )
    }
}

/// Public address of a live instance
///
/// Only obtainable from a successfully parsed IP literal, so holding one
/// proves resolution succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEndpoint {
    instance: String,
    public_ip: IpAddr,
}

impl ResolvedEndpoint {
    /// Parse the public IP field of an instance
    ///
    /// # Errors
    /// Returns [`Error::MalformedField`] if the field is empty or not an
    /// IPv4/IPv6 literal
    pub fn parse(instance: impl Into<String>, public_ip: &str) -> Result<Self> {
        let instance = instance.into();
        let trimmed = public_ip.trim();

        if trimmed.is_empty() {
            return Err(Error::MalformedField {
                instance,
                field: "public IP",
                message: "field is empty".to_string(),
            });
        }

        match trimmed.parse::<IpAddr>() {
            Ok(public_ip) => Ok(Self {
                instance,
                public_ip,
            }),
            Err(e) => Err(Error::MalformedField {
                instance,
                field: "public IP",
                message: format!("'{trimmed}' is not an IP address ({e})"),
            }),
        }
    }

    /// Name of the instance this endpoint was resolved from
    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Public IP address
    #[must_use]
    pub const fn public_ip(&self) -> IpAddr {
        self.public_ip
    }
}

impl fmt::Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.public_ip)
    }
}

/// Outcome of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Remote exit status
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ExecutionResult {
    /// A result with exit code 0 and the given output
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A result with the given non-zero exit code and error output
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the remote command succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_validation() {
        assert!(DeploymentTarget::new("pytrade2", "yc-user", "/home/yc-user/pytrade2").is_ok());
        assert!(DeploymentTarget::new("", "yc-user", "/srv").is_err());
        assert!(DeploymentTarget::new("app", "", "/srv").is_err());
        assert!(DeploymentTarget::new("app", "root@evil", "/srv").is_err());
        assert!(DeploymentTarget::new("app", "-oProxyCommand=x", "/srv").is_err());
        assert!(DeploymentTarget::new("app", "user name", "/srv").is_err());
        assert!(DeploymentTarget::new("app", "user", "relative/dir").is_err());
    }

    #[test]
    fn test_target_name_stays_inside_home() {
        for name in ["/etc", "../root", "a/b", "..", "."] {
            let err = DeploymentTarget::with_default_directory(name, "yc-user").unwrap_err();
            assert_eq!(err.category(), crate::ErrorCategory::Config, "{name}");
        }

        let target = DeploymentTarget::with_default_directory("pytrade2.v2", "yc-user").unwrap();
        assert_eq!(
            target.remote_working_directory(),
            Path::new("/home/yc-user/pytrade2.v2")
        );
    }

    #[test]
    fn test_target_default_directory() {
        let target = DeploymentTarget::with_default_directory("pytrade2", "yc-user").unwrap();
        assert_eq!(
            target.remote_working_directory(),
            Path::new("/home/yc-user/pytrade2")
        );
    }

    #[test]
    fn test_endpoint_parse() {
        let ep = ResolvedEndpoint::parse("pytrade2", "203.0.113.7").unwrap();
        assert_eq!(ep.to_string(), "203.0.113.7");
        assert_eq!(ep.instance(), "pytrade2");

        let ep6 = ResolvedEndpoint::parse("v6", "2001:db8::1").unwrap();
        assert!(ep6.public_ip().is_ipv6());

        assert!(matches!(
            ResolvedEndpoint::parse("x", ""),
            Err(Error::MalformedField { .. })
        ));
        assert!(matches!(
            ResolvedEndpoint::parse("x", "not-an-ip"),
            Err(Error::MalformedField { .. })
        ));
        assert!(matches!(
            ResolvedEndpoint::parse("x", "203.0.113.7; rm -rf /"),
            Err(Error::MalformedField { .. })
        ));
    }

    #[test]
    fn test_execution_result() {
        assert!(ExecutionResult::success("done").is_success());
        assert!(!ExecutionResult::failure(137, "Killed").is_success());
    }
}
