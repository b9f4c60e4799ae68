use anyhow::{Context, Result};
use para_staking::network::{known_profile, NetworkProfile};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::time::Duration;

/// `Decimal` cannot scale past 28 digits
const MAX_DECIMALS: u32 = 28;

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub server: ServerConfig,
    pub networks: Vec<NetworkConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    /// Network key, e.g. `moonbeam` or `bifrost`
    pub key: String,
    /// Base URL of the node gateway
    pub gateway_url: String,
    /// Required for networks without a built-in profile
    pub decimals: Option<u32>,
    pub symbol: Option<String>,
    pub era_length_hours: Option<Decimal>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl NetworkConfig {
    /// Built-in profile with the configured overrides applied
    pub fn profile(&self) -> Result<NetworkProfile> {
        let known = known_profile(&self.key);

        let decimals = match (self.decimals, &known) {
            (Some(decimals), _) => decimals,
            (None, Some(profile)) => profile.decimals,
            (None, None) => anyhow::bail!("Network {} needs `decimals`", self.key),
        };
        let symbol = match (&self.symbol, &known) {
            (Some(symbol), _) => symbol.clone(),
            (None, Some(profile)) => profile.symbol.clone(),
            (None, None) => anyhow::bail!("Network {} needs `symbol`", self.key),
        };

        let mut profile = NetworkProfile::new(self.key.clone(), decimals, symbol);
        if let Some(hours) = self.era_length_hours {
            profile = profile.with_era_length(hours);
        }

        Ok(profile)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ConfigFile {
    pub fn load(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;

        let config = Self::parse(&content)?;

        tracing::info!(
            "Loaded staking config: {} networks ({})",
            config.networks.len(),
            config
                .networks
                .iter()
                .map(|n| n.key.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ConfigFile = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.networks.is_empty() {
            anyhow::bail!("At least one [[networks]] entry is required");
        }

        let mut keys = HashSet::new();
        for network in &self.networks {
            if !keys.insert(network.key.as_str()) {
                anyhow::bail!("Network {} is configured twice", network.key);
            }

            if !network.gateway_url.starts_with("http://")
                && !network.gateway_url.starts_with("https://")
            {
                anyhow::bail!(
                    "Network {} gateway_url must be an http(s) URL: {}",
                    network.key,
                    network.gateway_url
                );
            }

            if network.request_timeout_secs == 0 {
                anyhow::bail!("Network {} request_timeout_secs must be positive", network.key);
            }

            let profile = network.profile()?;
            if profile.decimals > MAX_DECIMALS {
                anyhow::bail!(
                    "Network {} decimals {} exceeds {}",
                    network.key,
                    profile.decimals,
                    MAX_DECIMALS
                );
            }
            if profile.era_length_hours <= Decimal::ZERO {
                anyhow::bail!("Network {} era_length_hours must be positive", network.key);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use para_staking::RequestStorage;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
        [server]
        host = "0.0.0.0"
        port = 8080

        [[networks]]
        key = "moonbeam"
        gateway_url = "http://localhost:8081"

        [[networks]]
        key = "bifrost"
        gateway_url = "https://bifrost-gateway.example"
        era_length_hours = 2
        request_timeout_secs = 10

        [[networks]]
        key = "devnet"
        gateway_url = "http://127.0.0.1:9000"
        decimals = 12
        symbol = "UNIT"
    "#;

    #[test]
    fn test_parse_sample() {
        let config = ConfigFile::parse(SAMPLE).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.networks.len(), 3);

        let moonbeam = config.networks[0].profile().unwrap();
        assert_eq!(moonbeam.symbol, "GLMR");
        assert_eq!(moonbeam.era_length_hours, dec!(6));
        assert_eq!(config.networks[0].request_timeout_secs, 30);

        let bifrost = config.networks[1].profile().unwrap();
        assert_eq!(bifrost.era_length_hours, dec!(2));
        assert_eq!(bifrost.request_storage, RequestStorage::Embedded);

        let devnet = config.networks[2].profile().unwrap();
        assert_eq!(devnet.decimals, 12);
        assert_eq!(devnet.era_length_hours, dec!(24));
    }

    #[test]
    fn test_unknown_network_needs_token() {
        let content = r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [[networks]]
            key = "devnet"
            gateway_url = "http://127.0.0.1:9000"
        "#;
        assert!(ConfigFile::parse(content).is_err());
    }

    #[test]
    fn test_rejects_duplicates_and_bad_urls() {
        let duplicate = r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [[networks]]
            key = "moonbeam"
            gateway_url = "http://a"

            [[networks]]
            key = "moonbeam"
            gateway_url = "http://b"
        "#;
        assert!(ConfigFile::parse(duplicate).is_err());

        let bad_url = r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [[networks]]
            key = "moonbeam"
            gateway_url = "localhost:8081"
        "#;
        assert!(ConfigFile::parse(bad_url).is_err());
    }
}
