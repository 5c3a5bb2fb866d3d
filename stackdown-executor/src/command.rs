//! Structured remote command construction
//!
//! ssh hands the remote side a single line that the login shell parses, so
//! the line is assembled here from individually quoted words and never from
//! raw interpolation.

use serde::Serialize;
use stackdown_core::error::{RESERVED_STATUS_EXIT, SSH_ERROR_EXIT, WORKDIR_MISSING_EXIT};
use stackdown_core::{DeploymentTarget, ExecutorConfig};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

/// A program to run inside a directory on the remote host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteCommand {
    working_directory: PathBuf,
    program: Vec<String>,
}

impl RemoteCommand {
    /// Create a command running `program` inside `working_directory`
    pub fn new(working_directory: impl Into<PathBuf>, program: Vec<String>) -> Self {
        Self {
            working_directory: working_directory.into(),
            program,
        }
    }

    /// `[sudo] <compose...> down` inside the target's directory
    #[must_use]
    pub fn compose_down(target: &DeploymentTarget, config: &ExecutorConfig) -> Self {
        let mut program = Vec::with_capacity(config.compose_command.len() + 2);

        if config.use_sudo {
            program.push("sudo".to_string());
        }
        program.extend(config.compose_command.iter().cloned());
        program.push("down".to_string());

        Self::new(target.remote_working_directory(), program)
    }

    /// Directory the program runs in
    #[must_use]
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Program and arguments
    #[must_use]
    pub fn program(&self) -> &[String] {
        &self.program
    }

    /// Render the line handed to the remote shell
    ///
    /// A failing `cd` exits with
    /// [`WORKDIR_MISSING_EXIT`](stackdown_core::error::WORKDIR_MISSING_EXIT)
    /// so it can be told apart from a failing program. A program status equal
    /// to that sentinel or to ssh's own 255 is reported as
    /// [`RESERVED_STATUS_EXIT`](stackdown_core::error::RESERVED_STATUS_EXIT);
    /// every other status passes through.
    #[must_use]
    pub fn render(&self) -> String {
        let dir = self.working_directory.to_string_lossy();
        let program = self
            .program
            .iter()
            .map(|word| shell_quote(word))
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "cd -- {} || exit {WORKDIR_MISSING_EXIT}; {program}; rc=$?; \
             case $rc in {WORKDIR_MISSING_EXIT}|{SSH_ERROR_EXIT}) exit {RESERVED_STATUS_EXIT};; esac; \
             exit $rc",
            shell_quote(&dir)
        )
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Quote a word for a POSIX shell
///
/// Words made only of safe characters are returned as-is; anything else is
/// wrapped in single quotes.
#[must_use]
pub fn shell_quote(word: &str) -> Cow<'_, str> {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:@+,%".contains(c));

    if safe {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', "'\\''")))
    }
}
