//! Stop command implementation

use anyhow::Result;
use serde::Serialize;
use stackdown_core::{DeploymentTarget, Error, ExecutionResult, LifecycleEvent};
use stackdown_executor::shell_quote;
use std::net::IpAddr;
use tokio::sync::mpsc;

use super::{Setup, interrupt_token};
use crate::cli::Cli;

/// Lifecycle events buffered for the JSON report
const EVENT_BUFFER: usize = 16;

/// Machine-readable outcome of `stop`
#[derive(Debug, Serialize)]
struct StopReport {
    target: DeploymentTarget,
    ip: Option<IpAddr>,
    status: &'static str,
    command: Option<String>,
    invocation: Option<Vec<String>>,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    error: Option<String>,
    events: Vec<LifecycleEvent>,
}

pub async fn execute(cli: &Cli, dry_run: bool) -> Result<()> {
    let setup = Setup::from_cli(cli)?;
    let target = setup.target;
    let ssh = setup.ssh;

    tracing::info!(target_name = target.name(), deployment = %target, dry_run, "Stopping stack");

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let workflow = if cli.json {
        setup.workflow.with_events(tx)
    } else {
        setup.workflow
    };
    let cancel = interrupt_token();

    let mut report = StopReport {
        target: target.clone(),
        ip: None,
        status: "failed",
        command: Some(workflow.executor().command_for(&target).render()),
        invocation: None,
        exit_code: None,
        stdout: String::new(),
        stderr: String::new(),
        error: None,
        events: Vec::new(),
    };

    let outcome: stackdown_core::Result<()> = async {
        let endpoint = workflow.resolve(&target, &cancel).await?;
        report.ip = Some(endpoint.public_ip());

        if !cli.json {
            println!("IP: {endpoint}");
        }

        if dry_run {
            let command = workflow.executor().command_for(&target);
            let argv: Vec<String> = std::iter::once(ssh.program())
                .chain(ssh.args(endpoint.public_ip(), target.remote_user(), &command))
                .collect();

            if !cli.json {
                let line = argv
                    .iter()
                    .map(|word| shell_quote(word))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{line}");
            }

            report.invocation = Some(argv);
            report.status = "dry_run";
            return Ok(());
        }

        let result = workflow.stop(&endpoint, &target, &cancel).await?;
        record(&mut report, &result);
        report.status = "stopped";

        if !cli.json {
            relay(&result.stdout, &result.stderr);
            println!("✅ Stack '{}' stopped on {endpoint}", target.name());
        }

        Ok::<_, Error>(())
    }
    .await;

    if let Err(Error::RemoteCommand {
        exit_code,
        ref stdout,
        ref stderr,
        ..
    }) = outcome
    {
        report.exit_code = Some(exit_code);
        report.stdout.clone_from(stdout);
        report.stderr.clone_from(stderr);
        if !cli.json {
            relay(stdout, stderr);
        }
    }

    if cli.json {
        drop(workflow);
        while let Ok(event) = rx.try_recv() {
            report.events.push(event);
        }
        if let Err(ref e) = outcome {
            report.error = Some(e.to_string());
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    outcome.map_err(Into::into)
}

fn record(report: &mut StopReport, result: &ExecutionResult) {
    report.exit_code = Some(result.exit_code);
    report.stdout.clone_from(&result.stdout);
    report.stderr.clone_from(&result.stderr);
}

/// Pass the remote output through
fn relay(stdout: &str, stderr: &str) {
    if !stdout.is_empty() {
        print!("{stdout}");
    }
    if !stderr.is_empty() {
        eprint!("{stderr}");
    }
}
