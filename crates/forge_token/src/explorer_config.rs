use std::collections::HashMap;

use forge_core::ExplorerApiKeys;
use serde::{Deserialize, Serialize};

use crate::networks::{Network, get_explorer_profiles};

/// Explorer API endpoint configuration for a single network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    pub network: Network,
    pub api_url: String,
    pub is_custom: bool,
}

/// A fully resolved verification endpoint: URL plus the API key to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEndpoint {
    pub network: Network,
    pub api_url: String,
    pub api_key: String,
}

impl VerificationEndpoint {
    pub fn name(&self) -> &'static str {
        self.network.label()
    }

    pub fn chain_id(&self) -> u64 {
        self.network.chain_id()
    }
}

/// Manages per-network explorer API URLs with custom override support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfigStore {
    configs: HashMap<Network, ExplorerConfig>,
}

impl ExplorerConfigStore {
    /// Create a store populated with the default explorer URLs from
    /// [`get_explorer_profiles`].
    pub fn with_defaults() -> Self {
        let configs = get_explorer_profiles()
            .into_iter()
            .map(|(network, profile)| {
                let config = ExplorerConfig {
                    network,
                    api_url: profile.explorer_api_url,
                    is_custom: false,
                };
                (network, config)
            })
            .collect();

        Self { configs }
    }

    pub fn get(&self, network: Network) -> Option<&ExplorerConfig> {
        self.configs.get(&network)
    }

    /// Resolve the endpoint and API key used to verify on `network`.
    pub fn endpoint(&self, network: Network, keys: &ExplorerApiKeys) -> Option<VerificationEndpoint> {
        self.configs.get(&network).map(|config| VerificationEndpoint {
            network,
            api_url: config.api_url.clone(),
            api_key: keys.get(network.api_key_env()).to_string(),
        })
    }

    /// Point a network at a custom explorer API (self-hosted or a mock).
    ///
    /// Returns `Err` if the URL fails validation.
    pub fn set_custom_url(&mut self, network: Network, url: String) -> anyhow::Result<()> {
        if !validate_url(&url) {
            anyhow::bail!("invalid explorer URL: {url}");
        }

        let entry = self.configs.entry(network).or_insert_with(|| ExplorerConfig {
            network,
            api_url: String::new(),
            is_custom: false,
        });
        entry.api_url = url;
        entry.is_custom = true;
        Ok(())
    }

    /// Reset a network's explorer URL back to the built-in default.
    pub fn reset_to_default(&mut self, network: Network) {
        if let Some(profile) = get_explorer_profiles().remove(&network) {
            self.configs.insert(
                network,
                ExplorerConfig {
                    network,
                    api_url: profile.explorer_api_url,
                    is_custom: false,
                },
            );
        }
    }
}

impl Default for ExplorerConfigStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_not_custom() {
        let store = ExplorerConfigStore::with_defaults();
        for network in Network::ALL {
            assert!(!store.get(network).unwrap().is_custom);
        }
    }

    #[test]
    fn endpoint_resolves_key_from_family() {
        let store = ExplorerConfigStore::with_defaults();
        let mut keys = ExplorerApiKeys::default();
        keys.set("ETHERSCAN_API_KEY", "abc123");

        let endpoint = store.endpoint(Network::Sepolia, &keys).unwrap();
        assert_eq!(endpoint.api_url, "https://api-sepolia.etherscan.io/api");
        assert_eq!(endpoint.api_key, "abc123");
        assert_eq!(endpoint.chain_id(), 11_155_111);

        let bsc = store.endpoint(Network::BscTestnet, &keys).unwrap();
        assert_eq!(bsc.api_key, "");
    }

    #[test]
    fn set_custom_url_marks_as_custom() {
        let mut store = ExplorerConfigStore::with_defaults();
        store
            .set_custom_url(Network::Sepolia, "http://localhost:4000/api".into())
            .unwrap();

        let config = store.get(Network::Sepolia).unwrap();
        assert!(config.is_custom);
        assert_eq!(config.api_url, "http://localhost:4000/api");
    }

    #[test]
    fn set_custom_url_rejects_invalid_url() {
        let mut store = ExplorerConfigStore::with_defaults();
        assert!(store.set_custom_url(Network::Bsc, "not-a-url".into()).is_err());
        assert!(store.set_custom_url(Network::Bsc, "ftp://files.example.com".into()).is_err());
    }

    #[test]
    fn reset_to_default_restores_original_url() {
        let mut store = ExplorerConfigStore::with_defaults();
        let original = store.get(Network::Polygon).unwrap().api_url.clone();

        store
            .set_custom_url(Network::Polygon, "https://custom.example.com/api".into())
            .unwrap();
        assert_ne!(store.get(Network::Polygon).unwrap().api_url, original);

        store.reset_to_default(Network::Polygon);
        let after_reset = store.get(Network::Polygon).unwrap();
        assert_eq!(after_reset.api_url, original);
        assert!(!after_reset.is_custom);
    }

    #[test]
    fn validate_url_rejects_garbage() {
        assert!(validate_url("https://api.etherscan.io/api"));
        assert!(validate_url("http://localhost:8545"));
        assert!(!validate_url(""));
        assert!(!validate_url("not a url"));
        assert!(!validate_url("file:///etc/passwd"));
    }
}
