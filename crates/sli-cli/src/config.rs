use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sli_backend::BackendConfig;
use sli_ingest::StateChangePolicy;
use sli_source::RpcConfig;
use tracing::level_filters::LevelFilter;

use crate::cli::Cli;

pub const DEFAULT_NETWORK_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Settings for the `sli` binary, loaded from an optional TOML file and
/// overridden by command-line flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliConfig {
    pub network_passphrase: String,
    /// `error`, `warn`, `info`, `debug`, `trace` or `off`.
    pub log_level: String,
    pub rpc: RpcConfig,
    pub backend: BackendConfig,
    pub ingest: IngestSettings,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub state_changes: StateChangePolicy,
    pub max_ledger_retries: u32,
}

impl Default for SliConfig {
    fn default() -> Self {
        Self {
            network_passphrase: DEFAULT_NETWORK_PASSPHRASE.into(),
            log_level: "error".into(),
            rpc: RpcConfig::default(),
            backend: BackendConfig::default(),
            ingest: IngestSettings::default(),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            state_changes: StateChangePolicy::All,
            max_ledger_retries: 3,
        }
    }
}

impl SliConfig {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(url) = &cli.rpc_url {
            config.rpc.url = url.clone();
        }
        if let Some(network) = &cli.network {
            config.network_passphrase = network.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| anyhow::anyhow!("invalid log_level {:?}", self.log_level))?;
        anyhow::ensure!(
            !self.network_passphrase.is_empty(),
            "network passphrase must not be empty"
        );
        Ok(())
    }

    /// Configured level, raised by each `-v`.
    pub fn max_log_level(&self, verbose: u8) -> LevelFilter {
        let configured = self.log_level.parse().unwrap_or(LevelFilter::ERROR);
        let requested = match verbose {
            0 => LevelFilter::OFF,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        configured.max(requested)
    }
}
