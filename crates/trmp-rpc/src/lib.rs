//! TrumPOW wallet API client.
//!
//! Async HTTP client for the hosted collaborators of the wallet engine:
//! UTXO listing, unsigned-transaction templates, broadcast, and fee rate.
//!
//! # Example
//!
//! ```ignore
//! use trmp_rpc::ApiClient;
//!
//! #[tokio::main]
//! async fn main() {
//!     let api = ApiClient::new("https://api.trumpow.meme");
//!     let rate = api.fee_rate().await.unwrap();
//!     println!("fee rate: {} per kB", rate);
//! }
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, ApiConfig};
pub use error::RpcError;
pub use types::{BroadcastRequest, TxStatus};

/// Endpoint paths relative to the API base URL.
pub mod endpoints {
    pub const UNSPENT: &str = "/api/wallet/unspent";
    pub const CREATE_RAW_TRANSACTION: &str = "/api/wallet/createrawtransaction";
    pub const BROADCAST: &str = "/api/wallet/broadcast";
    pub const FEE_RATE: &str = "/api/wallet/feerate";
    pub const RAW_TRANSACTION: &str = "/api/wallet/getrawtransaction";
}
