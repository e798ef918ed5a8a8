//! Payment pipeline.
//!
//! `send_payment` runs one payment end to end against a [`WalletBackend`]:
//! fee rate and UTXOs are fetched, inputs are selected and priced, the
//! template provider assembles the unsigned transaction, the engine signs
//! and re-verifies it, and the result is broadcast.
//!
//! The signing key is derived from the vault secret inside the signing step
//! and dropped before the broadcast is sent.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use trmp_rpc::{ApiClient, BroadcastRequest, RpcError};
use trmp_tx::{verify_format_with, VerifyOptions};
use trmp_types::address::decode_address_for;
use trmp_types::{Network, OutPoint, UnspentOutput};

use crate::encryption::WalletSecret;
use crate::error::WalletError;
use crate::fee_tier::FeeTierTable;
use crate::keys::WalletKeys;
use crate::utxo::{
    plan_outputs, select_and_quote, FeeQuote, PaymentOutput, DEFAULT_OUTPUT_HEADROOM,
};

/// The remote collaborators a payment needs.
#[async_trait]
pub trait WalletBackend {
    async fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, RpcError>;

    async fn create_raw_transaction(
        &self,
        inputs: &[OutPoint],
        outputs: &BTreeMap<String, u64>,
    ) -> Result<String, RpcError>;

    async fn broadcast(&self, request: &BroadcastRequest) -> Result<String, RpcError>;

    /// Atomic units per 1000 bytes.
    async fn fee_rate(&self) -> Result<u64, RpcError>;
}

#[async_trait]
impl WalletBackend for ApiClient {
    async fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, RpcError> {
        ApiClient::list_unspent(self, address).await
    }

    async fn create_raw_transaction(
        &self,
        inputs: &[OutPoint],
        outputs: &BTreeMap<String, u64>,
    ) -> Result<String, RpcError> {
        ApiClient::create_raw_transaction(self, inputs, outputs).await
    }

    async fn broadcast(&self, request: &BroadcastRequest) -> Result<String, RpcError> {
        ApiClient::broadcast(self, request).await
    }

    async fn fee_rate(&self) -> Result<u64, RpcError> {
        ApiClient::fee_rate(self).await
    }
}

fn default_headroom() -> usize {
    DEFAULT_OUTPUT_HEADROOM
}

/// Settings for the payment pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendConfig {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub fee_tiers: FeeTierTable,
    /// Extra outputs counted when estimating the transaction size.
    #[serde(default = "default_headroom")]
    pub output_headroom: usize,
    /// Overrides the network's platform-fee address.
    #[serde(default)]
    pub fee_address: Option<String>,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self::for_network(Network::Mainnet)
    }
}

impl SendConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            fee_tiers: FeeTierTable::default(),
            output_headroom: DEFAULT_OUTPUT_HEADROOM,
            fee_address: None,
        }
    }

    pub fn fee_address(&self) -> &str {
        self.fee_address
            .as_deref()
            .unwrap_or(self.network.config().app_fee_address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub outputs: Vec<PaymentOutput>,
    pub deduct_fee_from_amount: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub txid: String,
    pub raw_tx: String,
    pub quote: FeeQuote,
    /// Outputs requested from the template provider.
    pub planned_outputs: BTreeMap<String, String>,
}

/// The wallet's own receive address.
pub fn wallet_address(secret: &WalletSecret, network: Network) -> Result<String, WalletError> {
    let keys = WalletKeys::derive(&secret.mnemonic, &secret.derivation_path, network)?;
    Ok(keys.address().to_string())
}

/// Price a payment without building it.
pub async fn quote_payment<B: WalletBackend + Sync>(
    backend: &B,
    own_address: &str,
    request: &SendRequest,
    config: &SendConfig,
) -> Result<FeeQuote, WalletError> {
    for output in &request.outputs {
        output.validate(config.network)?;
    }
    let fee_rate = backend.fee_rate().await?;
    let unspent = backend.list_unspent(own_address).await?;
    select_and_quote(
        &unspent,
        &request.outputs,
        fee_rate,
        request.deduct_fee_from_amount,
        &config.fee_tiers,
        config.output_headroom,
    )
}

/// Sign `template` with a key derived for this call only.
fn sign_template(
    secret: &WalletSecret,
    network: Network,
    template: &str,
    inputs: &[OutPoint],
) -> Result<String, WalletError> {
    let keys = WalletKeys::derive(&secret.mnemonic, &secret.derivation_path, network)?;
    let signed = trmp_tx::sign_raw_transaction(template, inputs, keys.signing_key())?;
    drop(keys);
    Ok(signed)
}

/// Run a payment end to end and return the broadcast txid.
pub async fn send_payment<B: WalletBackend + Sync>(
    backend: &B,
    secret: &WalletSecret,
    request: &SendRequest,
    config: &SendConfig,
) -> Result<SendReceipt, WalletError> {
    let own_address = wallet_address(secret, config.network)?;
    let quote = quote_payment(backend, &own_address, request, config).await?;
    build_and_broadcast(backend, secret, config, own_address, quote).await
}

/// Like [`send_payment`], but only if a fresh quote still equals `approved`.
///
/// Fee rate and UTXOs are fetched again; if the inputs, fees, deductions or
/// change moved since the caller showed `approved` to the user, nothing is
/// built and [`WalletError::QuoteChanged`] is returned.
pub async fn send_approved_payment<B: WalletBackend + Sync>(
    backend: &B,
    secret: &WalletSecret,
    request: &SendRequest,
    config: &SendConfig,
    approved: &FeeQuote,
) -> Result<SendReceipt, WalletError> {
    let own_address = wallet_address(secret, config.network)?;
    let quote = quote_payment(backend, &own_address, request, config).await?;
    if quote != *approved {
        return Err(WalletError::QuoteChanged(format!(
            "total fee {} -> {}, {} -> {} inputs, recipients {} -> {}, change {} -> {}",
            approved.total_fee,
            quote.total_fee,
            approved.picked.len(),
            quote.picked.len(),
            approved.recipients_total(),
            quote.recipients_total(),
            approved.change,
            quote.change
        )));
    }
    build_and_broadcast(backend, secret, config, own_address, quote).await
}

async fn build_and_broadcast<B: WalletBackend + Sync>(
    backend: &B,
    secret: &WalletSecret,
    config: &SendConfig,
    own_address: String,
    quote: FeeQuote,
) -> Result<SendReceipt, WalletError> {
    let fee_address = config.fee_address();
    decode_address_for(fee_address, config.network)?;

    let plan = plan_outputs(&quote, &own_address, fee_address)?;
    let inputs: Vec<OutPoint> = quote.picked.iter().map(UnspentOutput::outpoint).collect();

    let template = backend.create_raw_transaction(&inputs, &plan).await?;
    let unsigned = verify_format_with(&template, VerifyOptions::default());
    if !unsigned.valid {
        return Err(WalletError::Verification(format!(
            "template: {}",
            unsigned.error.unwrap_or_default()
        )));
    }
    if unsigned.output_count != plan.len() {
        return Err(WalletError::Verification(format!(
            "template has {} outputs, expected {}",
            unsigned.output_count,
            plan.len()
        )));
    }

    let signed = sign_template(secret, config.network, &template, &inputs)?;
    let report = verify_format_with(
        &signed,
        VerifyOptions {
            strict_script_sig: true,
        },
    );
    let local_txid = match (report.valid, report.tx_hash) {
        (true, Some(id)) => id,
        _ => {
            return Err(WalletError::Verification(
                report.error.unwrap_or_else(|| "signed transaction rejected".into()),
            ))
        }
    };

    let broadcast = BroadcastRequest {
        address: own_address,
        txid: local_txid.clone(),
        rawtx: signed.clone(),
        total_input: quote.picked_total,
        total_output: quote.recipients_total(),
        change: quote.change,
        fee_rate: quote.total_fee,
        app_fee: quote.app_fee,
    };
    let txid = match backend.broadcast(&broadcast).await {
        Ok(txid) => txid,
        Err(RpcError::Api { code, message }) => {
            return Err(WalletError::Broadcast { code, message })
        }
        Err(e) => return Err(e.into()),
    };
    if !txid.eq_ignore_ascii_case(&local_txid) {
        log::warn!("broadcast returned txid {}, computed {}", txid, local_txid);
    }
    log::info!(
        "sent {} to {} recipient(s) in {}",
        trmp_types::format_amount(quote.recipients_total()),
        quote.outputs.len(),
        txid
    );

    Ok(SendReceipt {
        txid,
        raw_tx: signed,
        planned_outputs: plan
            .iter()
            .map(|(a, v)| (a.clone(), trmp_types::format_amount(*v)))
            .collect(),
        quote,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_config_defaults() {
        let cfg = SendConfig::default();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.output_headroom, 5);
        assert_eq!(cfg.fee_address(), "TE1WqowKDtoAb8PwQr4LgHArbvVPSH83JE");
        assert_eq!(
            SendConfig::for_network(Network::Testnet).fee_address(),
            "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn"
        );
    }

    #[test]
    fn test_sign_template_holds_no_key() {
        // Borrows the secret and hands back only the signed hex.
        let sign: fn(&WalletSecret, Network, &str, &[OutPoint]) -> Result<String, WalletError> =
            sign_template;

        let secret = WalletSecret::new(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            "correct horse",
            "m/44'/3'/0'/0/0",
        )
        .unwrap();
        let input = OutPoint {
            txid: "ab".repeat(32),
            vout: 1,
        };
        let script = decode_address_for("TLeUZDGLWnyiJVFcp3m3M1782uBsGWa8uf", Network::Mainnet)
            .unwrap()
            .script_pubkey();
        let mut tx = 1u32.to_le_bytes().to_vec();
        tx.push(1);
        tx.extend_from_slice(&[0xab; 32]);
        tx.extend_from_slice(&1u32.to_le_bytes());
        tx.push(0);
        tx.extend_from_slice(&0xffff_ffffu32.to_le_bytes());
        tx.push(1);
        tx.extend_from_slice(&50_000u64.to_le_bytes());
        tx.push(script.len() as u8);
        tx.extend_from_slice(&script);
        tx.extend_from_slice(&0u32.to_le_bytes());

        let signed = sign(&secret, Network::Mainnet, &hex::encode(tx), &[input]).unwrap();
        let report = verify_format_with(
            &signed,
            VerifyOptions {
                strict_script_sig: true,
            },
        );
        assert!(report.valid);
        assert_eq!(secret.mnemonic.split(' ').count(), 12);
    }

    #[test]
    fn test_send_config_from_json() {
        let cfg: SendConfig = serde_json::from_str(
            r#"{
                "network": "testnet",
                "feeTiers": [{"min": 0, "max": 10, "fee": 0.5}, {"min": 10, "fee": 1}],
                "feeAddress": "mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.output_headroom, 5);
        assert_eq!(cfg.fee_tiers.app_fee(trmp_types::COIN), 50_000_000);
        assert_eq!(cfg.fee_address(), "mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r");

        let cfg: SendConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, SendConfig::default());
    }
}
