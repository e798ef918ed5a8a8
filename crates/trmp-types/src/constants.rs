//! TrumPOW network parameters.
//!
//! Version bytes, BIP32 prefixes and derivation path per network, plus the
//! platform-fee address and default API endpoint used by the wallet.

use serde::{Deserialize, Serialize};

// =============================================================================
// Network Types
// =============================================================================

/// Network type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn config(&self) -> &'static NetworkConfig {
        network_config(*self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" | "regtest" => Ok(Network::Testnet),
            _ => Err(format!("unknown network: {} (use mainnet or testnet)", s)),
        }
    }
}

// =============================================================================
// Network Configuration
// =============================================================================

/// Static per-network parameters.
#[derive(Debug)]
pub struct NetworkConfig {
    pub network: Network,
    /// Version byte of pay-to-public-key-hash addresses.
    pub pub_key_hash: u8,
    /// Version byte of pay-to-script-hash addresses.
    pub script_hash: u8,
    pub derivation_path: &'static str,
    /// Recipient of the platform fee output.
    pub app_fee_address: &'static str,
    pub default_api_url: &'static str,
}

pub static MAINNET_CONFIG: NetworkConfig = NetworkConfig {
    network: Network::Mainnet,
    pub_key_hash: 0x41,
    script_hash: 0x1c,
    derivation_path: "m/44'/3'/0'/0/0",
    app_fee_address: "TE1WqowKDtoAb8PwQr4LgHArbvVPSH83JE",
    default_api_url: "https://api.trumpow.meme",
};

pub static TESTNET_CONFIG: NetworkConfig = NetworkConfig {
    network: Network::Testnet,
    pub_key_hash: 0x6f,
    script_hash: 0xc4,
    derivation_path: "m/44'/3'/0'/0/0",
    app_fee_address: "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn",
    default_api_url: "http://127.0.0.1:18332",
};

/// Get the network configuration for a given network.
pub fn network_config(network: Network) -> &'static NetworkConfig {
    match network {
        Network::Mainnet => &MAINNET_CONFIG,
        Network::Testnet => &TESTNET_CONFIG,
    }
}

/// Ticker shown next to amounts.
pub const TICKER: &str = "TRMP";
