//! Structural transaction verification.
//!
//! `verify_format` walks a raw transaction field by field and reports the
//! first structural problem as data; it never returns `Err` and never
//! panics. Amount fields are only checked for presence. It is not consensus
//! validation: signatures are not checked and scripts are not executed.

use serde::{Deserialize, Serialize};
use trmp_types::hash::sha256d;

use crate::reader::ByteReader;
use crate::script::check_script_sig_shape;
use crate::TxError;

/// Transaction id: double SHA-256 of the raw bytes, in display order.
pub fn txid(raw: &[u8]) -> String {
    let mut h = sha256d(raw);
    h.reverse();
    hex::encode(h)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOptions {
    /// Treat a non-standard scriptSig shape as a failure instead of a warning.
    pub strict_script_sig: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub version: Option<u32>,
    pub input_count: usize,
    pub output_count: usize,
    pub lock_time: Option<u32>,
    pub size: usize,
    /// One entry per input whose non-empty scriptSig failed the shape check.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub script_sig_warnings: Vec<String>,
}

/// Verify with default options.
pub fn verify_format(raw_hex: &str) -> VerificationReport {
    verify_format_with(raw_hex, VerifyOptions::default())
}

pub fn verify_format_with(raw_hex: &str, opts: VerifyOptions) -> VerificationReport {
    let raw = match hex::decode(raw_hex.trim()) {
        Ok(raw) => raw,
        Err(e) => {
            return VerificationReport {
                error: Some(format!("invalid hex: {}", e)),
                ..Default::default()
            }
        }
    };
    verify_bytes(&raw, opts)
}

/// Verify an already-decoded transaction.
pub fn verify_bytes(raw: &[u8], opts: VerifyOptions) -> VerificationReport {
    let mut report = VerificationReport {
        size: raw.len(),
        ..Default::default()
    };
    match walk(raw, opts, &mut report) {
        Ok(()) => {
            let id = txid(raw);
            log::info!("transaction {} passed structural verification", id);
            report.valid = true;
            report.tx_hash = Some(id);
        }
        Err(e) => {
            log::debug!("structural verification failed: {}", e);
            report.valid = false;
            report.error = Some(e.to_string());
        }
    }
    report
}

fn walk(raw: &[u8], opts: VerifyOptions, report: &mut VerificationReport) -> Result<(), TxError> {
    let mut r = ByteReader::new(raw);

    if raw.len() < 4 {
        return Err(TxError::Malformed(format!(
            "{} bytes is too short for a version field",
            raw.len()
        )));
    }
    report.version = Some(r.read_u32_le()?);

    let input_count = r.read_varint()? as usize;
    if input_count == 0 {
        return Err(TxError::Malformed("transaction has no inputs".into()));
    }
    report.input_count = input_count;

    for i in 0..input_count {
        r.read_bytes(36)
            .map_err(|_| field_error("input", i, "outpoint"))?;
        let script = r
            .read_var_bytes()
            .map_err(|_| field_error("input", i, "script"))?;
        r.read_u32_le()
            .map_err(|_| field_error("input", i, "sequence"))?;

        if !script.is_empty() {
            if let Err(reason) = check_script_sig_shape(script) {
                let msg = format!("input {}: non-standard scriptSig ({})", i, reason);
                if opts.strict_script_sig {
                    return Err(TxError::Malformed(msg));
                }
                log::warn!("{}", msg);
                report.script_sig_warnings.push(msg);
            }
        }
    }

    let output_count = r.read_varint()? as usize;
    if output_count == 0 {
        return Err(TxError::Malformed("transaction has no outputs".into()));
    }
    report.output_count = output_count;

    for i in 0..output_count {
        r.read_bytes(8)
            .map_err(|_| field_error("output", i, "amount"))?;
        r.read_var_bytes()
            .map_err(|_| field_error("output", i, "script"))?;
    }

    report.lock_time = Some(
        r.read_u32_le()
            .map_err(|_| TxError::Malformed("missing lock time".into()))?,
    );

    if !r.is_at_end() {
        return Err(TxError::Malformed(format!(
            "parsed {} bytes but transaction is {} bytes",
            r.offset(),
            raw.len()
        )));
    }
    Ok(())
}

fn field_error(kind: &str, index: usize, field: &str) -> TxError {
    TxError::Malformed(format!("{} {}: truncated {}", kind, index, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::build_script_sig;

    // Bitcoin genesis coinbase.
    const GENESIS_TX: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff4d04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73ffffffff0100f2052a01000000434104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac00000000";
    const GENESIS_TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    fn tx_with_script(script: &[u8], amount: [u8; 8]) -> String {
        let mut tx = 2u32.to_le_bytes().to_vec();
        tx.push(1);
        tx.extend_from_slice(&[0x99; 32]);
        tx.extend_from_slice(&5u32.to_le_bytes());
        tx.push(script.len() as u8);
        tx.extend_from_slice(script);
        tx.extend_from_slice(&0xffff_ffffu32.to_le_bytes());
        tx.push(1);
        tx.extend_from_slice(&amount);
        tx.push(0);
        tx.extend_from_slice(&7u32.to_le_bytes());
        hex::encode(tx)
    }

    #[test]
    fn test_genesis_txid() {
        let report = verify_format(GENESIS_TX);
        assert!(report.valid, "{:?}", report.error);
        assert_eq!(report.tx_hash.as_deref(), Some(GENESIS_TXID));
        assert_eq!(report.version, Some(1));
        assert_eq!(report.input_count, 1);
        assert_eq!(report.output_count, 1);
        assert_eq!(report.lock_time, Some(0));
        assert_eq!(report.size, GENESIS_TX.len() / 2);
        // The coinbase script is not a signature + key pair.
        assert_eq!(report.script_sig_warnings.len(), 1);
    }

    #[test]
    fn test_strict_script_sig() {
        let report = verify_format_with(
            GENESIS_TX,
            VerifyOptions {
                strict_script_sig: true,
            },
        );
        assert!(!report.valid);
        assert!(report.error.unwrap().contains("non-standard scriptSig"));
        assert!(report.tx_hash.is_none());
    }

    #[test]
    fn test_amount_blind_above_2_pow_53() {
        let amount = ((1u64 << 53) + 1).to_le_bytes();
        let report = verify_format(&tx_with_script(&[], amount));
        assert!(report.valid);
        let report = verify_format(&tx_with_script(&[], [0xff; 8]));
        assert!(report.valid);
    }

    #[test]
    fn test_standard_script_sig_no_warning() {
        let script = build_script_sig(&[0x30; 72], &[0x02; 33]);
        let report = verify_format(&tx_with_script(&script, [0; 8]));
        assert!(report.valid);
        assert!(report.script_sig_warnings.is_empty());
    }

    #[test]
    fn test_failures_are_data() {
        let cases = [
            ("", "too short"),
            ("0100", "too short"),
            ("zz", "invalid hex"),
            ("0100000000", "no inputs"),
        ];
        for (hex_in, needle) in cases {
            let report = verify_format(hex_in);
            assert!(!report.valid);
            let err = report.error.unwrap();
            assert!(err.contains(needle), "{} -> {}", hex_in, err);
        }
    }

    #[test]
    fn test_no_outputs() {
        let mut raw = hex::decode(tx_with_script(&[], [0; 8])).unwrap();
        // Replace output section with a zero count + lock time.
        raw.truncate(4 + 1 + 41);
        raw.push(0);
        raw.extend_from_slice(&0u32.to_le_bytes());
        let report = verify_bytes(&raw, VerifyOptions::default());
        assert_eq!(report.error.as_deref(), Some("malformed transaction: transaction has no outputs"));
    }

    #[test]
    fn test_truncated_fields() {
        let raw = hex::decode(GENESIS_TX).unwrap();
        let short = verify_bytes(&raw[..raw.len() - 2], VerifyOptions::default());
        assert!(short.error.unwrap().contains("lock time"));
        let short = verify_bytes(&raw[..60], VerifyOptions::default());
        assert!(short.error.unwrap().contains("input 0: truncated script"));
        let mut long = raw.clone();
        long.push(0);
        let report = verify_bytes(&long, VerifyOptions::default());
        assert!(report.error.unwrap().contains("parsed"));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let json = serde_json::to_value(verify_format(GENESIS_TX)).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["txHash"], GENESIS_TXID);
        assert!(json.get("error").is_none());
    }
}
