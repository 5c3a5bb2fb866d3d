//! Yandex Cloud CLI instance source

use async_trait::async_trait;
use serde::Deserialize;
use stackdown_core::{Error, ResolverConfig, Result};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::source::{InstanceRecord, InstanceSource};

/// Lists instances by running `yc compute instance list --format json`
#[derive(Debug, Clone)]
pub struct YcCliSource {
    config: ResolverConfig,
}

impl YcCliSource {
    /// Create a source from resolver configuration
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn new(config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Arguments passed to the CLI, without the program itself
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["compute", "instance", "list", "--format", "json"]
            .iter()
            .map(ToString::to_string)
            .collect();

        if let Some(ref folder_id) = self.config.folder_id {
            args.push("--folder-id".to_string());
            args.push(folder_id.clone());
        }

        if let Some(ref profile) = self.config.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }

        args
    }

    async fn run_cli(&self) -> Result<std::process::Output> {
        let cli = &self.config.cli_path;

        let child = Command::new(cli)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::transport(format!("Failed to start cloud CLI '{}': {e}", cli.display()))
            })?;

        match timeout(self.config.list_timeout, child.wait_with_output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(Error::Timeout {
                operation: "instance listing",
                after: self.config.list_timeout,
            }),
        }
    }
}

#[async_trait]
impl InstanceSource for YcCliSource {
    async fn list_instances(&self) -> Result<Vec<InstanceRecord>> {
        debug!(cli = %self.config.cli_path.display(), args = ?self.args(), "Listing instances");

        let output = self.run_cli().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_cli_failure(output.status.code(), &stderr));
        }

        let instances = parse_instances(&output.stdout)?;
        debug!(count = instances.len(), "Instances listed");

        Ok(instances)
    }
}

/// Map a failed CLI run to the error taxonomy
fn classify_cli_failure(code: Option<i32>, stderr: &str) -> Error {
    let lower = stderr.to_lowercase();
    let auth_markers = [
        "unauthenticated",
        "permissiondenied",
        "permission denied",
        "iam token",
        "oauth token",
        "authentication",
    ];

    let message = match code {
        Some(code) => format!("cloud CLI exited with code {code}: {stderr}"),
        None => format!("cloud CLI was killed by a signal: {stderr}"),
    };

    if auth_markers.iter().any(|marker| lower.contains(marker)) {
        Error::Auth { message }
    } else {
        Error::transport(message)
    }
}

#[derive(Deserialize)]
struct YcInstance {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    network_interfaces: Vec<YcInterface>,
}

#[derive(Deserialize)]
struct YcInterface {
    primary_v4_address: Option<YcAddress>,
    primary_v6_address: Option<YcAddress>,
}

#[derive(Deserialize)]
struct YcAddress {
    address: Option<String>,
    one_to_one_nat: Option<YcNat>,
}

#[derive(Deserialize)]
struct YcNat {
    address: Option<String>,
}

impl YcInstance {
    /// First NAT v4 address, then the first v6 address
    fn public_ip(&self) -> Option<String> {
        let nat_v4 = self.network_interfaces.iter().find_map(|iface| {
            iface
                .primary_v4_address
                .as_ref()
                .and_then(|addr| addr.one_to_one_nat.as_ref())
                .and_then(|nat| nat.address.clone())
        });

        nat_v4.or_else(|| {
            self.network_interfaces.iter().find_map(|iface| {
                iface
                    .primary_v6_address
                    .as_ref()
                    .and_then(|addr| addr.address.clone())
            })
        })
    }
}

/// Parse the JSON printed by `yc compute instance list --format json`
///
/// # Errors
/// Returns [`Error::Transport`] if the output is not the expected JSON array
pub fn parse_instances(json: &[u8]) -> Result<Vec<InstanceRecord>> {
    // `yc` prints nothing at all for an empty folder
    if json.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let raw: Vec<YcInstance> = serde_json::from_slice(json)
        .map_err(|e| Error::transport(format!("Unexpected cloud CLI output: {e}")))?;

    Ok(raw
        .into_iter()
        .map(|instance| {
            let public_ip = instance.public_ip();
            InstanceRecord {
                id: instance.id,
                name: instance.name,
                status: instance.status,
                public_ip,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackdown_core::ErrorCategory;

    const LISTING: &str = r#"[
      {
        "id": "fhm0example1",
        "folder_id": "b1gexample",
        "name": "pytrade2",
        "zone_id": "ru-central1-a",
        "status": "RUNNING",
        "network_interfaces": [
          {
            "index": "0",
            "primary_v4_address": {
              "address": "10.128.0.5",
              "one_to_one_nat": { "address": "203.0.113.7", "ip_version": "IPV4" }
            }
          }
        ]
      },
      {
        "id": "fhm0example2",
        "name": "biml",
        "status": "STOPPED",
        "network_interfaces": [
          { "index": "0", "primary_v4_address": { "address": "10.128.0.6" } }
        ]
      },
      {
        "id": "fhm0example3",
        "name": "ipv6-only",
        "status": "RUNNING",
        "network_interfaces": [
          { "index": "0", "primary_v6_address": { "address": "2001:db8::7" } }
        ]
      }
    ]"#;

    #[test]
    fn test_parse_listing() {
        let instances = parse_instances(LISTING.as_bytes()).unwrap();
        assert_eq!(instances.len(), 3);

        assert_eq!(instances[0].name, "pytrade2");
        assert_eq!(instances[0].public_ip.as_deref(), Some("203.0.113.7"));

        // Private address only: no public IP
        assert_eq!(instances[1].status, "STOPPED");
        assert_eq!(instances[1].public_ip, None);

        assert_eq!(instances[2].public_ip.as_deref(), Some("2001:db8::7"));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_instances(b"").unwrap().is_empty());
        assert!(parse_instances(b"\n").unwrap().is_empty());
        assert!(parse_instances(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_instances(b"ERROR: something").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transport);
    }

    #[test]
    fn test_args() {
        let source = YcCliSource::new(
            ResolverConfig::new()
                .with_folder_id(Some("b1gexample".to_string()))
                .with_profile(Some("prod".to_string())),
        )
        .unwrap();

        assert_eq!(
            source.args(),
            vec![
                "compute",
                "instance",
                "list",
                "--format",
                "json",
                "--folder-id",
                "b1gexample",
                "--profile",
                "prod"
            ]
        );
    }

    #[test]
    fn test_classify_cli_failure() {
        let err = classify_cli_failure(
            Some(1),
            "ERROR: rpc error: code = Unauthenticated desc = iam token is expired",
        );
        assert_eq!(err.category(), ErrorCategory::Auth);

        let err = classify_cli_failure(Some(1), "ERROR: dial tcp: lookup api.cloud.yandex.net: no such host");
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert!(err.to_string().contains("no such host"));
    }

    #[tokio::test]
    async fn test_missing_cli_is_transport_error() {
        let source = YcCliSource::new(
            ResolverConfig::new().with_cli_path("/nonexistent/stackdown-test/yc"),
        )
        .unwrap();

        let err = source.list_instances().await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transport);
    }
}
