//! Unspent outputs and outpoint references as exchanged with the API.

use serde::{Deserialize, Serialize};

use crate::amount::serde_coin;

/// Reference to a transaction output. `txid` is in display byte order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: String,
    pub vout: u32,
}

impl std::fmt::Display for OutPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

fn default_true() -> bool {
    true
}

/// A spendable output owned by the wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentOutput {
    pub txid: String,
    pub vout: u32,
    /// Atomic units.
    #[serde(with = "serde_coin")]
    pub amount: u64,
    #[serde(default)]
    pub height: u64,
    #[serde(default = "default_true")]
    pub is_usable: bool,
    /// Already referenced by an unconfirmed spend in the mempool.
    #[serde(default, alias = "isHasMemPool")]
    pub is_has_mem_pool_spend: bool,
}

impl UnspentOutput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid.clone(),
            vout: self.vout,
        }
    }

    /// Usable and not already being spent.
    pub fn is_spendable(&self) -> bool {
        self.is_usable && !self.is_has_mem_pool_spend
    }
}
