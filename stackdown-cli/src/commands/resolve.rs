//! Resolve command implementation

use anyhow::Result;
use serde_json::json;

use super::{Setup, interrupt_token};
use crate::cli::Cli;

pub async fn execute(cli: &Cli) -> Result<()> {
    let setup = Setup::from_cli(cli)?;
    let target = setup.target;

    let endpoint = setup
        .workflow
        .resolve(&target, &interrupt_token())
        .await?;

    if cli.json {
        let report = json!({
            "target": target.name(),
            "instance": endpoint.instance(),
            "ip": endpoint.public_ip(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{endpoint}");
    }

    Ok(())
}
