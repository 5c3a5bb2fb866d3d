use crate::cli::{Cli, Commands};
use crate::workflow::StopWorkflow;
use anyhow::{Context, Result};
use stackdown_core::{CancelToken, DeploymentTarget};
use stackdown_executor::{Executor, SshChannel};
use stackdown_resolver::{Resolver, YcCliSource};
use std::sync::Arc;
use tracing::warn;

pub mod resolve;
pub mod stop;
pub mod version;

/// Dispatch command to appropriate handler
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        None => stop::execute(&cli, false).await,
        Some(Commands::Stop { dry_run }) => stop::execute(&cli, dry_run).await,
        Some(Commands::Resolve) => resolve::execute(&cli).await,
        Some(Commands::Version) => {
            version::execute();
            Ok(())
        }
    }
}

/// Process exit status for a failed command
///
/// Follows the category of the first stackdown error in the chain; anything
/// else is an internal failure.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<stackdown_core::Error>())
        .map_or(1, stackdown_core::Error::exit_code)
}

/// Everything a command needs, built from flags and environment
pub struct Setup {
    pub target: DeploymentTarget,
    pub ssh: SshChannel,
    pub workflow: StopWorkflow,
}

impl Setup {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let target = cli.target.to_target().context("Invalid deployment target")?;
        let source =
            YcCliSource::new(cli.cloud.to_config()).context("Invalid cloud CLI settings")?;
        let resolver = Resolver::new(Arc::new(source)).with_match_mode(cli.target.match_mode());

        let ssh = SshChannel::new(cli.ssh.to_config()).context("Invalid ssh settings")?;
        let executor = Executor::new(Arc::new(ssh.clone()), cli.remote.to_config())
            .context("Invalid remote command settings")?;

        Ok(Self {
            target,
            ssh,
            workflow: StopWorkflow::new(resolver, executor),
        })
    }
}

/// Token tripped by the first Ctrl-C
pub fn interrupt_token() -> CancelToken {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            trigger.cancel();
        }
    });

    cancel
}
