//! P2PKH transaction signing.
//!
//! Takes an unsigned legacy transaction (as produced by the template
//! provider) and fills in every input's scriptSig:
//!   1. Parse the template and check its outpoints against the UTXO list
//!   2. For each input, in index order, hash the SIGHASH_ALL preimage with
//!      the signer's own P2PKH locking script substituted
//!   3. Sign (RFC6979, low-S), DER-encode, append the hash-type byte
//!   4. Re-serialize with `push(sig) push(pubkey)` scripts; outputs and
//!      lock time are copied from the template untouched
//!
//! A single key controls every input.

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use trmp_types::hash::hash160;
pub use trmp_types::OutPoint;

use crate::parse::parse_transaction;
use crate::script::{build_script_sig, p2pkh_script};
use crate::sighash::{signature_hash, SIGHASH_ALL};
use crate::TxError;

/// 33-byte SEC1 compressed public key of `key`.
pub fn compressed_pubkey(key: &SigningKey) -> [u8; 33] {
    let point = key.verifying_key().to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(point.as_bytes());
    out
}

/// Sign a 32-byte digest and return `DER || SIGHASH_ALL`.
pub fn sign_digest(key: &SigningKey, digest: &[u8; 32]) -> Result<Vec<u8>, TxError> {
    let sig: Signature = key
        .sign_prehash(digest)
        .map_err(|e| TxError::Signing(format!("ecdsa: {}", e)))?;
    let sig = sig.normalize_s().unwrap_or(sig);
    let mut out = sig.to_der().as_bytes().to_vec();
    out.push(SIGHASH_ALL);
    Ok(out)
}

/// Sign every input of `raw` with `key`. `utxos[i]` must be the outpoint
/// spent by input `i`.
pub fn sign_transaction_bytes(
    raw: &[u8],
    utxos: &[OutPoint],
    key: &SigningKey,
) -> Result<Vec<u8>, TxError> {
    let tx = parse_transaction(raw)?;

    if tx.input_count() == 0 {
        return Err(TxError::Signing("transaction has no inputs".into()));
    }
    if utxos.len() != tx.input_count() {
        return Err(TxError::Signing(format!(
            "template has {} inputs but {} utxos were selected",
            tx.input_count(),
            utxos.len()
        )));
    }
    for (i, (input, utxo)) in tx.inputs.iter().zip(utxos).enumerate() {
        if !input.prev_txid().eq_ignore_ascii_case(&utxo.txid)
            || input.prev_output_index != utxo.vout
        {
            return Err(TxError::Signing(format!(
                "input {} spends {}:{}, expected {}:{}",
                i,
                input.prev_txid(),
                input.prev_output_index,
                utxo.txid,
                utxo.vout
            )));
        }
    }

    let pubkey = compressed_pubkey(key);
    let spend_script = p2pkh_script(&hash160(&pubkey));

    let mut script_sigs = Vec::with_capacity(tx.input_count());
    for i in 0..tx.input_count() {
        let digest = signature_hash(&tx, i, &spend_script)?;
        let sig = sign_digest(key, &digest)?;
        script_sigs.push(build_script_sig(&sig, &pubkey));
        log::debug!("signed input {} of {}", i + 1, tx.input_count());
    }

    let scripts: Vec<&[u8]> = script_sigs.iter().map(Vec::as_slice).collect();
    tx.serialize_with_scripts(&scripts)
}

/// Hex in, hex out.
pub fn sign_raw_transaction(
    raw_hex: &str,
    utxos: &[OutPoint],
    key: &SigningKey,
) -> Result<String, TxError> {
    let raw = hex::decode(raw_hex.trim())?;
    sign_transaction_bytes(&raw, utxos, key).map(hex::encode)
}
