//! CLI argument definitions
//!
//! Every setting can come from a flag or an environment variable; the
//! defaults reproduce the hardcoded pytrade2 deployment.

use clap::{Args, Parser, Subcommand};
use stackdown_core::{
    DeploymentTarget, ExecutorConfig, MatchMode, ResolverConfig, Result, SshConfig,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "stackdown")]
#[command(
    about = "Resolve a cloud instance by name and bring its compose stack down",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print a JSON report on stdout instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub cloud: CloudArgs,

    #[command(flatten)]
    pub ssh: SshArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,

    // `stop` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the instance and run `compose down` on it
    Stop {
        /// Print the ssh invocation instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve the instance and print its public IP
    Resolve,

    /// Show version information
    Version,
}

#[derive(Args)]
pub struct TargetArgs {
    /// Instance name filter
    #[arg(long, global = true, env = "STACKDOWN_TARGET", default_value = DeploymentTarget::DEFAULT_NAME)]
    pub target: String,

    /// Remote login
    #[arg(long, global = true, env = "STACKDOWN_USER", default_value = DeploymentTarget::DEFAULT_USER)]
    pub user: String,

    /// Compose directory on the host [default: /home/<user>/<target>]
    #[arg(long, global = true, env = "STACKDOWN_WORKDIR")]
    pub workdir: Option<PathBuf>,

    /// Require the instance name to equal the filter
    #[arg(long, global = true, env = "STACKDOWN_EXACT")]
    pub exact: bool,
}

impl TargetArgs {
    pub fn to_target(&self) -> Result<DeploymentTarget> {
        match self.workdir {
            Some(ref dir) => DeploymentTarget::new(&self.target, &self.user, dir),
            None => DeploymentTarget::with_default_directory(&self.target, &self.user),
        }
    }

    pub const fn match_mode(&self) -> MatchMode {
        if self.exact {
            MatchMode::Exact
        } else {
            MatchMode::Substring
        }
    }
}

#[derive(Args)]
pub struct CloudArgs {
    /// Yandex Cloud CLI binary
    #[arg(long, global = true, env = "STACKDOWN_YC_BIN", default_value = "yc")]
    pub yc_bin: PathBuf,

    /// Cloud folder to search
    #[arg(long, global = true, env = "STACKDOWN_FOLDER_ID")]
    pub folder_id: Option<String>,

    /// Cloud CLI profile
    #[arg(long, global = true, env = "STACKDOWN_PROFILE")]
    pub profile: Option<String>,

    /// Instance listing timeout in seconds
    #[arg(long, global = true, env = "STACKDOWN_LIST_TIMEOUT", default_value = "60")]
    pub list_timeout: u64,
}

impl CloudArgs {
    pub fn to_config(&self) -> ResolverConfig {
        ResolverConfig::new()
            .with_cli_path(&self.yc_bin)
            .with_folder_id(self.folder_id.clone())
            .with_profile(self.profile.clone())
            .with_list_timeout(Duration::from_secs(self.list_timeout))
    }
}

#[derive(Args)]
pub struct SshArgs {
    /// ssh client binary
    #[arg(long, global = true, env = "STACKDOWN_SSH_BIN", default_value = "ssh")]
    pub ssh_bin: PathBuf,

    /// ssh port
    #[arg(long, global = true, env = "STACKDOWN_SSH_PORT")]
    pub ssh_port: Option<u16>,

    /// Private key for the remote login
    #[arg(long, global = true, env = "STACKDOWN_IDENTITY")]
    pub identity: Option<PathBuf>,

    /// Extra ssh option as Key=Value (repeatable)
    #[arg(short = 'o', long = "ssh-option", global = true)]
    pub ssh_options: Vec<String>,

    /// ssh connect timeout in seconds
    #[arg(long, global = true, env = "STACKDOWN_CONNECT_TIMEOUT", default_value = "10")]
    pub connect_timeout: u64,
}

impl SshArgs {
    pub fn to_config(&self) -> SshConfig {
        let mut config = SshConfig::new()
            .with_program(&self.ssh_bin)
            .with_port(self.ssh_port)
            .with_identity_file(self.identity.clone())
            .with_connect_timeout(Duration::from_secs(self.connect_timeout));

        for option in &self.ssh_options {
            config = config.with_option(option);
        }

        config
    }
}

#[derive(Args)]
pub struct RemoteArgs {
    /// Remote command timeout in seconds
    #[arg(long, global = true, env = "STACKDOWN_TIMEOUT", default_value = "300")]
    pub timeout: u64,

    /// Run compose without sudo
    #[arg(long, global = true, env = "STACKDOWN_NO_SUDO")]
    pub no_sudo: bool,

    /// Compose invocation on the host
    #[arg(long, global = true, env = "STACKDOWN_COMPOSE", default_value = "docker compose")]
    pub compose: String,
}

impl RemoteArgs {
    pub fn to_config(&self) -> ExecutorConfig {
        ExecutorConfig::new()
            .with_compose(&self.compose)
            .with_sudo(!self.no_sudo)
            .with_command_timeout(Duration::from_secs(self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_legacy_script() {
        let cli = Cli::try_parse_from(["stackdown"]).unwrap();
        assert!(cli.command.is_none());

        let target = cli.target.to_target().unwrap();
        assert_eq!(target.name(), "pytrade2");
        assert_eq!(target.remote_user(), "yc-user");
        assert_eq!(
            target.remote_working_directory(),
            std::path::Path::new("/home/yc-user/pytrade2")
        );

        let remote = cli.remote.to_config();
        assert!(remote.use_sudo);
        assert_eq!(remote.compose_command, vec!["docker", "compose"]);
    }

    #[test]
    fn test_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stackdown",
            "stop",
            "--target",
            "biml",
            "--user",
            "ubuntu",
            "--exact",
            "--no-sudo",
            "-o",
            "ServerAliveInterval=5",
            "--dry-run",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::Stop { dry_run: true })));
        assert_eq!(cli.target.match_mode(), MatchMode::Exact);
        assert_eq!(
            cli.target.to_target().unwrap().remote_working_directory(),
            std::path::Path::new("/home/ubuntu/biml")
        );
        assert!(!cli.remote.to_config().use_sudo);
        assert_eq!(cli.ssh.to_config().extra_options, vec!["ServerAliveInterval=5"]);
    }

    #[test]
    fn test_explicit_workdir() {
        let cli =
            Cli::try_parse_from(["stackdown", "resolve", "--workdir", "/opt/pytrade2"]).unwrap();
        assert_eq!(
            cli.target.to_target().unwrap().remote_working_directory(),
            std::path::Path::new("/opt/pytrade2")
        );
    }
}
