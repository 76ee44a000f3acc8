use std::collections::HashMap;
use std::time::Duration;
use std::{fs, path::Path};

use anyhow::Context;
use dotenv::dotenv;
use envsubst::substitute;
use serde::Deserialize;

use crate::network::{Network, NetworkConfig};
use crate::service::TradeSettings;
use crate::service::executor::DEFAULT_CONFIRMATION_TIMEOUT;

/// Environment variable prefixes that may be interpolated into the YAML file.
const ENV_PREFIXES: [&str; 5] = ["SERVER_", "WALLET_", "ETH_", "BSC_", "ALCHEMY_"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub networks: NetworksConfig,
    pub wallet: WalletConfig,
    #[serde(default)]
    pub trading: TradingConfig,
}

impl Config {
    pub async fn from_yaml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenv().ok();

        let path = path.as_ref();
        let file_content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file from path: {}", path.display()))?;

        let env_vars: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| ENV_PREFIXES.iter().any(|prefix| key.starts_with(prefix)))
            .collect();

        let interpolated = substitute(&file_content, &env_vars)
            .context("failed to substitute environment variables in YAML")?;

        Self::from_yaml_str(&interpolated)
    }

    /// Parses already-interpolated YAML and rejects trading defaults no trade
    /// could run with.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).context("failed to parse YAML configuration")?;
        config.trading.validate()?;
        Ok(config)
    }

    pub fn server_uri(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn network_config(&self, network: Network) -> NetworkConfig {
        let rpc = match network {
            Network::Ethereum => &self.networks.eth,
            Network::Bsc => &self.networks.bsc,
        };
        NetworkConfig::new(network, rpc.rpc_url.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworksConfig {
    pub eth: RpcConfig,
    pub bsc: RpcConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub rpc_url: String,
}

#[derive(Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub private_key: String,
}

// Keep the key out of logs.
impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let private_key = if self.private_key.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        f.debug_struct("WalletConfig")
            .field("private_key", &private_key)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u32,
    #[serde(default = "default_gas_limit")]
    pub default_gas_limit: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

impl TradingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.default_settings()
            .validate()
            .context("invalid trading defaults in configuration")?;
        if self.confirmation_timeout_secs == 0 {
            anyhow::bail!("trading.confirmation_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn default_settings(&self) -> TradeSettings {
        TradeSettings {
            slippage_bps: self.default_slippage_bps,
            gas_limit: self.default_gas_limit,
        }
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_slippage_bps: default_slippage_bps(),
            default_gas_limit: default_gas_limit(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
        }
    }
}

fn default_slippage_bps() -> u32 {
    TradeSettings::DEFAULT_SLIPPAGE_BPS
}

fn default_gas_limit() -> u64 {
    TradeSettings::DEFAULT_GAS_LIMIT
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT.as_secs()
}
