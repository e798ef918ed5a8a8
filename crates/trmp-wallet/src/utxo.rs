//! Coin selection and fee quoting.
//!
//! Selection is oldest-first accumulation over spendable outputs: filter out
//! unusable and mempool-locked outputs, sort ascending by height, and take
//! outputs until the requested total is covered. Fees are quoted on top of
//! the picked set; when the picked inputs leave no positive change after
//! fees, the fee is forced onto one of the requested outputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use trmp_types::address::decode_address_for;
use trmp_types::amount::{parse_amount, serde_coin};
use trmp_types::{Network, UnspentOutput};

use crate::error::WalletError;
use crate::fee_tier::FeeTierTable;

/// Outputs reserved in the size estimate beyond the requested ones
/// (change and platform fee, with room to spare).
pub const DEFAULT_OUTPUT_HEADROOM: usize = 5;

/// A requested payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutput {
    pub address: String,
    /// Atomic units.
    #[serde(with = "serde_coin")]
    pub amount: u64,
}

impl PaymentOutput {
    /// Build from user text: an address and a decimal coin amount.
    pub fn parse(address: &str, amount: &str) -> Result<Self, WalletError> {
        Ok(Self {
            address: address.trim().to_string(),
            amount: parse_amount(amount)?,
        })
    }

    pub fn validate(&self, network: Network) -> Result<(), WalletError> {
        decode_address_for(&self.address, network)?;
        if self.amount == 0 {
            return Err(WalletError::InvalidAmount(format!(
                "zero amount to {}",
                self.address
            )));
        }
        Ok(())
    }
}

/// Outputs picked to fund a payment, in spending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub picked: Vec<UnspentOutput>,
    pub total: u64,
}

/// Spendable outputs, oldest first. The sort is stable so equal heights keep
/// provider order.
pub fn spendable_sorted(unspent: &[UnspentOutput]) -> Vec<UnspentOutput> {
    let mut candidates: Vec<UnspentOutput> = unspent
        .iter()
        .filter(|u| u.is_spendable())
        .cloned()
        .collect();
    candidates.sort_by_key(|u| u.height);
    candidates
}

/// Accumulate spendable outputs oldest-first until `target` is reached.
///
/// Nothing is picked on failure.
pub fn select_oldest_first(
    unspent: &[UnspentOutput],
    target: u64,
) -> Result<Selection, WalletError> {
    let candidates = spendable_sorted(unspent);
    let mut picked = Vec::new();
    let mut total = 0u64;

    for candidate in candidates {
        total = total.saturating_add(candidate.amount);
        picked.push(candidate);
        if total >= target {
            log::debug!("picked {} inputs totalling {}", picked.len(), total);
            return Ok(Selection { picked, total });
        }
    }

    Err(WalletError::InsufficientFunds {
        need: target,
        have: total,
    })
}

/// Result of selecting inputs and pricing a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    pub picked: Vec<UnspentOutput>,
    #[serde(with = "serde_coin")]
    pub picked_total: u64,
    #[serde(with = "serde_coin")]
    pub requested_total: u64,
    #[serde(with = "serde_coin")]
    pub network_fee: u64,
    #[serde(with = "serde_coin")]
    pub app_fee: u64,
    #[serde(with = "serde_coin")]
    pub total_fee: u64,
    /// The picked inputs could not pay the fee as change, so it was taken
    /// from a requested output regardless of the caller's choice.
    pub forced_deduction: bool,
    pub deduct_fee_from_amount: bool,
    /// Requested outputs after any fee deduction.
    pub outputs: Vec<PaymentOutput>,
    #[serde(with = "serde_coin")]
    pub change: u64,
    pub estimated_size: u64,
}

impl FeeQuote {
    /// Sum of the outputs actually paid to recipients.
    pub fn recipients_total(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }
}

/// Select inputs for `outputs` and price the payment.
///
/// `fee_rate_per_kb` is in atomic units per 1000 bytes. The size estimate
/// counts `outputs.len() + output_headroom` outputs.
pub fn select_and_quote(
    unspent: &[UnspentOutput],
    outputs: &[PaymentOutput],
    fee_rate_per_kb: u64,
    deduct_fee_from_amount: bool,
    tiers: &FeeTierTable,
    output_headroom: usize,
) -> Result<FeeQuote, WalletError> {
    if outputs.is_empty() {
        return Err(WalletError::NoDestinations);
    }
    let mut requested_total = 0u64;
    for output in outputs {
        if output.amount == 0 {
            return Err(WalletError::InvalidAmount(format!(
                "zero amount to {}",
                output.address
            )));
        }
        requested_total = requested_total
            .checked_add(output.amount)
            .ok_or_else(|| WalletError::InvalidAmount("requested total overflows".into()))?;
    }

    let selection = select_oldest_first(unspent, requested_total)?;

    let app_fee = tiers.app_fee(requested_total);
    let estimate = trmp_tx::fee::estimate_network_fee(
        selection.picked.len(),
        outputs.len() + output_headroom,
        fee_rate_per_kb,
    );
    let network_fee = estimate.fee;
    let total_fee = app_fee
        .checked_add(network_fee)
        .ok_or_else(|| WalletError::InvalidAmount("fee overflows".into()))?;

    let surplus = selection.total - requested_total;
    let forced_deduction = surplus <= total_fee;
    let deduct = forced_deduction || deduct_fee_from_amount;

    let mut final_outputs = outputs.to_vec();
    let change = if deduct {
        let target = final_outputs
            .iter_mut()
            .rev()
            .find(|o| o.amount >= total_fee)
            .ok_or_else(|| WalletError::InsufficientFunds {
                need: total_fee,
                have: outputs.iter().map(|o| o.amount).max().unwrap_or(0),
            })?;
        target.amount -= total_fee;
        surplus
    } else {
        surplus - total_fee
    };

    log::debug!(
        "quote: {} inputs, network fee {}, app fee {}, change {}, forced {}",
        selection.picked.len(),
        network_fee,
        app_fee,
        change,
        forced_deduction
    );

    Ok(FeeQuote {
        picked: selection.picked,
        picked_total: selection.total,
        requested_total,
        network_fee,
        app_fee,
        total_fee,
        forced_deduction,
        deduct_fee_from_amount: deduct,
        outputs: final_outputs,
        change,
        estimated_size: estimate.size,
    })
}

/// Outputs handed to the template provider: recipients, the platform fee
/// when non-zero, and change back to `own_address` when positive. Amounts
/// to the same address are summed; zero amounts are left out.
pub fn plan_outputs(
    quote: &FeeQuote,
    own_address: &str,
    fee_address: &str,
) -> Result<BTreeMap<String, u64>, WalletError> {
    let mut plan: BTreeMap<String, u64> = BTreeMap::new();
    let mut add = |address: &str, amount: u64| -> Result<(), WalletError> {
        if amount == 0 {
            return Ok(());
        }
        let slot = plan.entry(address.to_string()).or_insert(0);
        *slot = slot
            .checked_add(amount)
            .ok_or_else(|| WalletError::InvalidAmount(format!("total to {} overflows", address)))?;
        Ok(())
    };

    for output in &quote.outputs {
        add(&output.address, output.amount)?;
    }
    add(fee_address, quote.app_fee)?;
    add(own_address, quote.change)?;
    Ok(plan)
}

/// Balance of an address split by spendability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    #[serde(with = "serde_coin")]
    pub total: u64,
    #[serde(with = "serde_coin")]
    pub spendable: u64,
    /// Unusable or already being spent.
    #[serde(with = "serde_coin")]
    pub locked: u64,
    pub output_count: usize,
}

pub fn balance(unspent: &[UnspentOutput]) -> Balance {
    unspent.iter().fold(Balance::default(), |mut acc, u| {
        acc.total = acc.total.saturating_add(u.amount);
        if u.is_spendable() {
            acc.spendable = acc.spendable.saturating_add(u.amount);
        } else {
            acc.locked = acc.locked.saturating_add(u.amount);
        }
        acc.output_count += 1;
        acc
    })
}
