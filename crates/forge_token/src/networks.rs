use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported EVM networks. Each mainnet has a matching testnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    Ethereum,
    Arbitrum,
    Avalanche,
    Polygon,
    Bsc,
    Optimism,
    Sepolia,
    ArbitrumGoerli,
    AvalancheFuji,
    PolygonMumbai,
    BscTestnet,
    OptimismGoerli,
}

impl Network {
    pub const ALL: [Network; 12] = [
        Network::Ethereum,
        Network::Arbitrum,
        Network::Avalanche,
        Network::Polygon,
        Network::Bsc,
        Network::Optimism,
        Network::Sepolia,
        Network::ArbitrumGoerli,
        Network::AvalancheFuji,
        Network::PolygonMumbai,
        Network::BscTestnet,
        Network::OptimismGoerli,
    ];

    /// Identifier used by the configuration wizard (`"bsc-testnet"`, ...).
    pub fn slug(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Arbitrum => "arbitrum",
            Network::Avalanche => "avalanche",
            Network::Polygon => "polygon",
            Network::Bsc => "bsc",
            Network::Optimism => "optimism",
            Network::Sepolia => "sepolia",
            Network::ArbitrumGoerli => "arbitrum-goerli",
            Network::AvalancheFuji => "avalanche-fuji",
            Network::PolygonMumbai => "polygon-mumbai",
            Network::BscTestnet => "bsc-testnet",
            Network::OptimismGoerli => "optimism-goerli",
        }
    }

    /// Human-readable label for the network.
    pub fn label(&self) -> &'static str {
        match self {
            Network::Ethereum => "Ethereum",
            Network::Arbitrum => "Arbitrum",
            Network::Avalanche => "Avalanche",
            Network::Polygon => "Polygon",
            Network::Bsc => "BSC",
            Network::Optimism => "Optimism",
            Network::Sepolia => "Sepolia",
            Network::ArbitrumGoerli => "Arbitrum Goerli",
            Network::AvalancheFuji => "Avalanche Fuji",
            Network::PolygonMumbai => "Polygon Mumbai",
            Network::BscTestnet => "BSC Testnet",
            Network::OptimismGoerli => "Optimism Goerli",
        }
    }

    /// EVM chain ID.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Arbitrum => 42_161,
            Network::Avalanche => 43_114,
            Network::Polygon => 137,
            Network::Bsc => 56,
            Network::Optimism => 10,
            Network::Sepolia => 11_155_111,
            Network::ArbitrumGoerli => 421_613,
            Network::AvalancheFuji => 43_113,
            Network::PolygonMumbai => 80_001,
            Network::BscTestnet => 97,
            Network::OptimismGoerli => 420,
        }
    }

    pub fn is_testnet(&self) -> bool {
        !matches!(
            self,
            Network::Ethereum
                | Network::Arbitrum
                | Network::Avalanche
                | Network::Polygon
                | Network::Bsc
                | Network::Optimism
        )
    }

    /// Environment variable holding the explorer API key for this network.
    /// Testnets share the key of their mainnet explorer family.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Network::Ethereum | Network::Sepolia => "ETHERSCAN_API_KEY",
            Network::Arbitrum | Network::ArbitrumGoerli => "ARBISCAN_API_KEY",
            Network::Avalanche | Network::AvalancheFuji => "SNOWTRACE_API_KEY",
            Network::Polygon | Network::PolygonMumbai => "POLYGONSCAN_API_KEY",
            Network::Bsc | Network::BscTestnet => "BSCSCAN_API_KEY",
            Network::Optimism | Network::OptimismGoerli => "OPTIMISM_API_KEY",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Network::ALL
            .into_iter()
            .find(|n| n.slug() == needle)
            .ok_or_else(|| format!("unsupported network: {s}"))
    }
}

/// Map a connected wallet's chain ID to the network whose explorer accepts
/// verification submissions. Only the test networks are wired up; every
/// other chain ID skips verification.
pub fn verification_network_for_chain_id(chain_id: u64) -> Option<Network> {
    match chain_id {
        11_155_111 => Some(Network::Sepolia),
        421_613 => Some(Network::ArbitrumGoerli),
        43_113 => Some(Network::AvalancheFuji),
        80_001 => Some(Network::PolygonMumbai),
        97 => Some(Network::BscTestnet),
        420 => Some(Network::OptimismGoerli),
        _ => None,
    }
}

/// Verification-endpoint profile for a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerProfile {
    pub name: String,
    pub chain_id: u64,
    pub explorer_api_url: String,
    pub api_key_env: String,
}

/// Returns the default explorer profile for every supported network.
pub fn get_explorer_profiles() -> HashMap<Network, ExplorerProfile> {
    Network::ALL
        .into_iter()
        .map(|network| {
            let profile = ExplorerProfile {
                name: network.label().to_string(),
                chain_id: network.chain_id(),
                explorer_api_url: default_explorer_api_url(network).to_string(),
                api_key_env: network.api_key_env().to_string(),
            };
            (network, profile)
        })
        .collect()
}

fn default_explorer_api_url(network: Network) -> &'static str {
    match network {
        Network::Ethereum => "https://api.etherscan.io/api",
        Network::Arbitrum => "https://api.arbiscan.io/api",
        Network::Avalanche => "https://api.snowtrace.io/api",
        Network::Polygon => "https://api.polygonscan.com/api",
        Network::Bsc => "https://api.bscscan.com/api",
        Network::Optimism => "https://api-optimistic.etherscan.io/api",
        Network::Sepolia => "https://api-sepolia.etherscan.io/api",
        Network::ArbitrumGoerli => "https://api-goerli.arbiscan.io/api",
        Network::AvalancheFuji => "https://api-testnet.snowtrace.io/api",
        Network::PolygonMumbai => "https://api-testnet.polygonscan.com/api",
        Network::BscTestnet => "https://api-testnet.bscscan.com/api",
        Network::OptimismGoerli => "https://api-goerli-optimistic.etherscan.io/api",
    }
}
