//! send_payment against an in-memory backend that assembles real templates.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use trmp_rpc::{BroadcastRequest, RpcError};
use trmp_tx::script::p2pkh_script;
use trmp_tx::sighash::signature_hash;
use trmp_tx::{parse_transaction, txid};
use trmp_types::address::decode_address;
use trmp_types::hash::hash160;
use trmp_types::{OutPoint, UnspentOutput, COIN};
use trmp_wallet::send::{quote_payment, wallet_address};
use trmp_wallet::{
    send_approved_payment, send_payment, PaymentOutput, SendConfig, SendRequest, WalletBackend,
    WalletError, WalletSecret,
};

const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const OWN: &str = "TGjyWQ1rG3ty6W4LkEByDNk3S5xFtYeGV4";
const OWN_PUBKEY: &str = "02cc6b0dc33aabcf3a23643e5e2919a80c50fb3dd2129ce409bbc5f0d4643d05e0";
const RECIPIENT: &str = "TLeUZDGLWnyiJVFcp3m3M1782uBsGWa8uf";
const FEE_ADDRESS: &str = "TE1WqowKDtoAb8PwQr4LgHArbvVPSH83JE";
// 0.01 coin per kB.
const FEE_RATE: u64 = 1_000_000;

#[derive(Default)]
struct MockBackend {
    unspent: Vec<UnspentOutput>,
    reject_broadcast: Option<(i64, String)>,
    /// Build the template from a different outpoint than requested.
    swap_first_input: bool,
    /// Fee rate served from the second request on.
    raised_fee_rate: Option<u64>,
    fee_rate_calls: AtomicUsize,
    templates: Mutex<Vec<(Vec<OutPoint>, BTreeMap<String, u64>)>>,
    broadcasts: Mutex<Vec<BroadcastRequest>>,
}

fn assemble(inputs: &[OutPoint], outputs: &BTreeMap<String, u64>) -> String {
    let mut tx = 1u32.to_le_bytes().to_vec();
    tx.push(inputs.len() as u8);
    for input in inputs {
        let mut hash: [u8; 32] = hex::decode(&input.txid).unwrap().try_into().unwrap();
        hash.reverse();
        tx.extend_from_slice(&hash);
        tx.extend_from_slice(&input.vout.to_le_bytes());
        tx.push(0);
        tx.extend_from_slice(&0xffff_ffffu32.to_le_bytes());
    }
    tx.push(outputs.len() as u8);
    for (address, amount) in outputs {
        let script = decode_address(address).unwrap().script_pubkey();
        tx.extend_from_slice(&amount.to_le_bytes());
        tx.push(script.len() as u8);
        tx.extend_from_slice(&script);
    }
    tx.extend_from_slice(&0u32.to_le_bytes());
    hex::encode(tx)
}

#[async_trait]
impl WalletBackend for MockBackend {
    async fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, RpcError> {
        assert_eq!(address, OWN);
        Ok(self.unspent.clone())
    }

    async fn create_raw_transaction(
        &self,
        inputs: &[OutPoint],
        outputs: &BTreeMap<String, u64>,
    ) -> Result<String, RpcError> {
        self.templates
            .lock()
            .unwrap()
            .push((inputs.to_vec(), outputs.clone()));
        let mut inputs = inputs.to_vec();
        if self.swap_first_input {
            inputs[0].vout += 1;
        }
        Ok(assemble(&inputs, outputs))
    }

    async fn broadcast(&self, request: &BroadcastRequest) -> Result<String, RpcError> {
        self.broadcasts.lock().unwrap().push(request.clone());
        if let Some((code, message)) = &self.reject_broadcast {
            return Err(RpcError::Api {
                code: *code,
                message: message.clone(),
            });
        }
        Ok(txid(&hex::decode(&request.rawtx).unwrap()))
    }

    async fn fee_rate(&self) -> Result<u64, RpcError> {
        let call = self.fee_rate_calls.fetch_add(1, Ordering::SeqCst);
        match self.raised_fee_rate {
            Some(rate) if call > 0 => Ok(rate),
            _ => Ok(FEE_RATE),
        }
    }
}

fn utxo(fill: char, amount: u64, height: u64) -> UnspentOutput {
    UnspentOutput {
        txid: fill.to_string().repeat(64),
        vout: 0,
        amount,
        height,
        is_usable: true,
        is_has_mem_pool_spend: false,
    }
}

fn secret() -> WalletSecret {
    WalletSecret::new(MNEMONIC, "correct horse", "m/44'/3'/0'/0/0").unwrap()
}

fn request(amount: u64) -> SendRequest {
    SendRequest {
        outputs: vec![PaymentOutput {
            address: RECIPIENT.into(),
            amount,
        }],
        deduct_fee_from_amount: false,
    }
}

#[tokio::test]
async fn test_send_payment_end_to_end() {
    let backend = MockBackend {
        unspent: vec![utxo('b', 2 * COIN, 5), utxo('a', COIN, 1), utxo('c', 9 * COIN, 9)],
        ..Default::default()
    };
    let receipt = send_payment(&backend, &secret(), &request(3 * COIN / 2), &SendConfig::default())
        .await
        .unwrap();

    // Oldest two outputs cover 1.5 coins.
    let quote = &receipt.quote;
    assert_eq!(quote.picked.len(), 2);
    assert_eq!(quote.picked[0].txid, "a".repeat(64));
    assert_eq!(quote.picked_total, 3 * COIN);
    // 1.5 coins sits in the (1, 50] tier.
    assert_eq!(quote.app_fee, COIN / 10);
    // 2 inputs, 1 + 5 outputs = 332 bytes at 0.01/kB.
    assert_eq!(quote.network_fee, 332_000);
    assert!(!quote.forced_deduction);
    assert_eq!(quote.change, 3 * COIN - 3 * COIN / 2 - COIN / 10 - 332_000);

    let templates = backend.templates.lock().unwrap();
    let (inputs, outputs) = &templates[0];
    assert_eq!(inputs.len(), 2);
    assert_eq!(outputs[RECIPIENT], 3 * COIN / 2);
    assert_eq!(outputs[FEE_ADDRESS], COIN / 10);
    assert_eq!(outputs[OWN], quote.change);

    let broadcasts = backend.broadcasts.lock().unwrap();
    let sent = &broadcasts[0];
    assert_eq!(sent.address, OWN);
    assert_eq!(sent.txid, receipt.txid);
    assert_eq!(sent.total_input, 3 * COIN);
    assert_eq!(sent.total_output, 3 * COIN / 2);
    assert_eq!(sent.fee_rate, quote.total_fee);
    assert_eq!(sent.app_fee, COIN / 10);
    assert_eq!(sent.rawtx, receipt.raw_tx);

    // Every input carries a valid signature by the wallet key.
    let raw = hex::decode(&receipt.raw_tx).unwrap();
    assert_eq!(receipt.txid, txid(&raw));
    let tx = parse_transaction(&raw).unwrap();
    let pubkey = hex::decode(OWN_PUBKEY).unwrap();
    let vk = VerifyingKey::from_sec1_bytes(&pubkey).unwrap();
    let spend_script = p2pkh_script(&hash160(&pubkey));
    for (i, input) in tx.inputs.iter().enumerate() {
        let script = input.script;
        let sig_len = script[0] as usize;
        let der = &script[1..sig_len];
        assert_eq!(script[sig_len], 0x01);
        assert_eq!(&script[sig_len + 2..], pubkey.as_slice());
        let digest = signature_hash(&tx, i, &spend_script).unwrap();
        let sig = Signature::from_der(der).unwrap();
        vk.verify_prehash(&digest, &sig).unwrap();
    }
    assert_eq!(receipt.planned_outputs[RECIPIENT], "1.5");
}

#[tokio::test]
async fn test_forced_deduction_leaves_no_change() {
    let backend = MockBackend {
        unspent: vec![utxo('a', COIN, 1)],
        ..Default::default()
    };
    let receipt = send_payment(&backend, &secret(), &request(COIN), &SendConfig::default())
        .await
        .unwrap();
    let quote = &receipt.quote;
    assert!(quote.forced_deduction);
    assert_eq!(quote.change, 0);

    let templates = backend.templates.lock().unwrap();
    let outputs = &templates[0].1;
    assert_eq!(outputs.len(), 2);
    assert!(!outputs.contains_key(OWN));
    assert_eq!(outputs[RECIPIENT], COIN - quote.total_fee);
    assert_eq!(outputs[FEE_ADDRESS], quote.app_fee);
}

#[tokio::test]
async fn test_insufficient_funds_builds_nothing() {
    let mut locked = utxo('b', 100 * COIN, 2);
    locked.is_has_mem_pool_spend = true;
    let backend = MockBackend {
        unspent: vec![utxo('a', COIN, 1), locked],
        ..Default::default()
    };
    let err = send_payment(&backend, &secret(), &request(2 * COIN), &SendConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { .. }));
    assert!(backend.templates.lock().unwrap().is_empty());
    assert!(backend.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_broadcast_rejection_is_surfaced() {
    let backend = MockBackend {
        unspent: vec![utxo('a', 5 * COIN, 1)],
        reject_broadcast: Some((-26, "min relay fee not met".into())),
        ..Default::default()
    };
    let err = send_payment(&backend, &secret(), &request(COIN), &SendConfig::default())
        .await
        .unwrap_err();
    match err {
        WalletError::Broadcast { code, message } => {
            assert_eq!(code, -26);
            assert_eq!(message, "min relay fee not met");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_mismatched_template_is_not_signed() {
    let backend = MockBackend {
        unspent: vec![utxo('a', 5 * COIN, 1)],
        swap_first_input: true,
        ..Default::default()
    };
    let err = send_payment(&backend, &secret(), &request(COIN), &SendConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Tx(trmp_tx::TxError::Signing(_))));
    assert!(backend.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_network_recipient_rejected() {
    let backend = MockBackend {
        unspent: vec![utxo('a', 5 * COIN, 1)],
        ..Default::default()
    };
    let req = SendRequest {
        outputs: vec![PaymentOutput {
            address: "mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r".into(),
            amount: COIN,
        }],
        deduct_fee_from_amount: false,
    };
    let err = send_payment(&backend, &secret(), &req, &SendConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidAddress(_)));
}

#[tokio::test]
async fn test_approved_quote_is_sent() {
    let backend = MockBackend {
        unspent: vec![utxo('a', 5 * COIN, 1)],
        ..Default::default()
    };
    let config = SendConfig::default();
    let secret = secret();
    let own = wallet_address(&secret, config.network).unwrap();
    let approved = quote_payment(&backend, &own, &request(COIN), &config)
        .await
        .unwrap();

    let receipt = send_approved_payment(&backend, &secret, &request(COIN), &config, &approved)
        .await
        .unwrap();
    assert_eq!(receipt.quote, approved);
    assert_eq!(backend.broadcasts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_fee_rise_after_approval_is_rejected() {
    let backend = MockBackend {
        unspent: vec![utxo('a', 5 * COIN, 1)],
        raised_fee_rate: Some(10 * FEE_RATE),
        ..Default::default()
    };
    let config = SendConfig::default();
    let secret = secret();
    let own = wallet_address(&secret, config.network).unwrap();
    let approved = quote_payment(&backend, &own, &request(COIN), &config)
        .await
        .unwrap();

    let err = send_approved_payment(&backend, &secret, &request(COIN), &config, &approved)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::QuoteChanged(_)));
    assert!(backend.templates.lock().unwrap().is_empty());
    assert!(backend.broadcasts.lock().unwrap().is_empty());
}
