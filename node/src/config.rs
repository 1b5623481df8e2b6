//! # Node Configuration
//!
//! Settings are layered, lowest priority first:
//!
//! 1. built-in defaults ([`NodeConfig::default`])
//! 2. the TOML file (`--config`, or `config.toml` in the data directory)
//! 3. environment variables and CLI flags (`HUMANLINK_*`, via clap)
//!
//! [`NodeConfig::validate`] runs last and turns an unusable combination
//! into a startup error.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use humanlink_contracts::RegistryConfig;
use humanlink_protocol::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT, NETWORK_ID_DEVNET};
use humanlink_protocol::{Address, NetworkId};

use crate::cli::RunArgs;
use crate::logging::LogFormat;

/// File name looked up inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "~/.humanlink";

/// Full node configuration, as stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Network this instance runs on.
    pub network_id: u64,
    /// The only network that accepts links.
    pub home_network_id: u64,
    pub credential_contract: Address,
    pub credential_issuer: Address,
    pub verifier_contract: Address,
    /// Compressed Groth16 verification key. Relative paths resolve against
    /// the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifying_key_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relayer: Option<Address>,
    pub data_dir: PathBuf,
    pub rpc_port: u16,
    pub metrics_port: u16,
    pub log_format: LogFormat,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network_id: NETWORK_ID_DEVNET,
            home_network_id: NETWORK_ID_DEVNET,
            credential_contract: Address::ZERO,
            credential_issuer: Address::ZERO,
            verifier_contract: Address::ZERO,
            verifying_key_path: None,
            relayer: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            rpc_port: DEFAULT_RPC_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
            log_format: LogFormat::Pretty,
        }
    }
}

impl NodeConfig {
    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Resolve the configuration for `run`: file (if any) overlaid with the
    /// CLI/environment values in `args`, then validated.
    pub fn load(args: &RunArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => {
                let data_dir = expand_home(
                    args.data_dir
                        .as_deref()
                        .unwrap_or_else(|| Path::new(DEFAULT_DATA_DIR)),
                );
                let candidate = data_dir.join(CONFIG_FILE_NAME);
                if candidate.exists() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(args);
        config.data_dir = expand_home(&config.data_dir);
        config.validate()?;
        Ok(config)
    }

    /// Overlay every value that was given on the command line or in the
    /// environment.
    pub fn apply_overrides(&mut self, args: &RunArgs) {
        if let Some(v) = &args.data_dir {
            self.data_dir = v.clone();
        }
        if let Some(v) = args.network_id {
            self.network_id = v;
        }
        if let Some(v) = args.home_network_id {
            self.home_network_id = v;
        }
        if let Some(v) = args.credential_contract {
            self.credential_contract = v;
        }
        if let Some(v) = args.credential_issuer {
            self.credential_issuer = v;
        }
        if let Some(v) = args.verifier_contract {
            self.verifier_contract = v;
        }
        if let Some(v) = &args.verifying_key_path {
            self.verifying_key_path = Some(v.clone());
        }
        if let Some(v) = args.relayer {
            self.relayer = Some(v);
        }
        if let Some(v) = args.rpc_port {
            self.rpc_port = v;
        }
        if let Some(v) = args.metrics_port {
            self.metrics_port = v;
        }
        if let Some(v) = args.log_format {
            self.log_format = v;
        }
    }

    /// Reject configurations the registry or the node cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.credential_contract.is_zero() {
            bail!("credential_contract must be set to a non-zero address");
        }
        if self.credential_issuer.is_zero() {
            bail!("credential_issuer must be set to a non-zero address");
        }
        if self.verifier_contract.is_zero() {
            bail!("verifier_contract must be set to a non-zero address");
        }
        if self.relayer.is_some_and(|r| r.is_zero()) {
            bail!("relayer must be a non-zero address when set");
        }
        if self.verifying_key_path.is_none() {
            bail!("verifying_key_path must point to a Groth16 verification key");
        }
        if self.rpc_port == self.metrics_port {
            bail!("rpc_port and metrics_port must differ (both {})", self.rpc_port);
        }
        Ok(())
    }

    pub fn network(&self) -> NetworkId {
        NetworkId(self.network_id)
    }

    pub fn is_home(&self) -> bool {
        self.network_id == self.home_network_id
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            home: NetworkId(self.home_network_id),
            relayer: self.relayer,
        }
    }

    /// The verification key path, resolved against the data directory.
    pub fn resolved_verifying_key_path(&self) -> Option<PathBuf> {
        self.verifying_key_path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                self.data_dir.join(p)
            }
        })
    }

    pub fn registry_db_path(&self) -> PathBuf {
        self.data_dir.join("registry")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join("credentials.json")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }
}

/// Expand a leading `~` to `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn valid() -> NodeConfig {
        NodeConfig {
            credential_contract: addr(0xC0),
            credential_issuer: addr(0x1A),
            verifier_contract: addr(0xD0),
            verifying_key_path: Some(PathBuf::from("claim.vk")),
            ..NodeConfig::default()
        }
    }

    #[test]
    fn default_config_is_not_runnable() {
        let err = NodeConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("credential_contract"));
    }

    #[test]
    fn missing_verifying_key_rejected() {
        let config = NodeConfig {
            verifying_key_path: None,
            ..valid()
        };
        assert!(config.validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn zero_relayer_rejected() {
        let config = NodeConfig {
            relayer: Some(Address::ZERO),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let config = NodeConfig {
            relayer: Some(addr(0xEE)),
            log_format: LogFormat::Json,
            ..valid()
        };
        let text = config.to_toml().unwrap();
        assert!(text.contains("log_format = \"json\""));
        let back: NodeConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: NodeConfig = toml::from_str(
            r#"
            network_id = 8453
            home_network_id = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.network_id, 8453);
        assert_eq!(config.rpc_port, DEFAULT_RPC_PORT);
        assert!(!config.is_home());
    }

    #[test]
    fn cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let file_config = NodeConfig {
            data_dir: dir.path().to_path_buf(),
            rpc_port: 7000,
            ..valid()
        };
        std::fs::write(&path, file_config.to_toml().unwrap()).unwrap();

        let args = RunArgs {
            config: Some(path),
            rpc_port: Some(7100),
            network_id: Some(10),
            ..RunArgs::default()
        };
        let config = NodeConfig::load(&args).unwrap();
        assert_eq!(config.rpc_port, 7100);
        assert_eq!(config.network(), NetworkId(10));
        assert_eq!(config.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(config.credential_issuer, addr(0x1A));
    }

    #[test]
    fn relative_key_path_resolves_in_data_dir() {
        let config = NodeConfig {
            data_dir: PathBuf::from("/var/lib/humanlink"),
            ..valid()
        };
        assert_eq!(
            config.resolved_verifying_key_path(),
            Some(PathBuf::from("/var/lib/humanlink/claim.vk"))
        );
    }
}
