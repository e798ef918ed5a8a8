//! Legacy (pre-segwit) signature hash, SIGHASH_ALL only.
//!
//! ## Preimage layout
//!
//! ```text
//! version                      4 bytes
//! input count                  varint
//! for each input j:
//!   prev hash, prev index      36 bytes, unchanged
//!   script                     scriptPubKey if j == signed input, else empty
//!   sequence                   4 bytes, unchanged
//! output section + lock time  copied verbatim from the source buffer
//! sighash type                 4 bytes LE (0x00000001)
//! ```
//!
//! The digest is `SHA256(SHA256(preimage))`.

use trmp_types::hash::sha256d;

use crate::parse::ParsedTransaction;
use crate::varint::{varint_len, write_varint_into};
use crate::TxError;

pub const SIGHASH_ALL: u8 = 0x01;

/// Build the preimage for signing input `input_index` against `script_pubkey`.
pub fn build_preimage(
    tx: &ParsedTransaction<'_>,
    input_index: usize,
    script_pubkey: &[u8],
) -> Result<Vec<u8>, TxError> {
    let count = tx.input_count();
    if input_index >= count {
        return Err(TxError::InputIndexOutOfRange {
            index: input_index,
            count,
        });
    }

    let tail = tx.output_section();
    let mut buf = Vec::with_capacity(
        4 + varint_len(count as u64)
            + count * 41
            + varint_len(script_pubkey.len() as u64)
            + script_pubkey.len()
            + tail.len()
            + 4,
    );

    buf.extend_from_slice(&tx.version.to_le_bytes());
    write_varint_into(&mut buf, count as u64);
    for (j, input) in tx.inputs.iter().enumerate() {
        buf.extend_from_slice(input.prev_tx_hash);
        buf.extend_from_slice(&input.prev_output_index.to_le_bytes());
        if j == input_index {
            write_varint_into(&mut buf, script_pubkey.len() as u64);
            buf.extend_from_slice(script_pubkey);
        } else {
            buf.push(0x00);
        }
        buf.extend_from_slice(&input.sequence.to_le_bytes());
    }
    buf.extend_from_slice(tail);
    buf.extend_from_slice(&(SIGHASH_ALL as u32).to_le_bytes());

    Ok(buf)
}

/// Double SHA-256 of a preimage.
pub fn hash_preimage(preimage: &[u8]) -> [u8; 32] {
    sha256d(preimage)
}

/// Convenience: preimage then digest.
pub fn signature_hash(
    tx: &ParsedTransaction<'_>,
    input_index: usize,
    script_pubkey: &[u8],
) -> Result<[u8; 32], TxError> {
    Ok(hash_preimage(&build_preimage(tx, input_index, script_pubkey)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_transaction;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;
    use k256::ecdsa::{Signature, VerifyingKey};

    // Mainnet tx f4184fc5...9e16, the first pay-to-pubkey spend.
    const TX_170: &str = "0100000001c997a5e56e104102fa209c6a852dd90660a20b2d9c352423edce25857fcd3704000000004847304402204e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd410220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d0901ffffffff0200ca9a3b00000000434104ae1a62fe09c5f51b13905f07f06b99a2f7159b2225f374cd378d71302fa28414e7aab37397f554a7df5f142c21c1b7303b8a0626f1baded5c72a704f7e6cd84cac00286bee0000000043410411db93e1dcdb8a016b49840f8c53bc1eb68a382e97b1482ecad7b148a6909a5cb2e0eaddfb84ccf9744464f82e160bfa9b8b64f9d4c03f999b8643f656b412a3ac00000000";
    // Locking script of the spent coinbase output.
    const SPENT_SPK: &str = "410411db93e1dcdb8a016b49840f8c53bc1eb68a382e97b1482ecad7b148a6909a5cb2e0eaddfb84ccf9744464f82e160bfa9b8b64f9d4c03f999b8643f656b412a3ac";
    const EXPECTED_SIGHASH: &str =
        "7a05c6145f10101e9d6325494245adf1297d80f8f38d4d576d57cdba220bcb19";

    #[test]
    fn test_preimage_layout() {
        let raw = hex::decode(TX_170).unwrap();
        let tx = parse_transaction(&raw).unwrap();
        let spk = hex::decode(SPENT_SPK).unwrap();
        let pre = build_preimage(&tx, 0, &spk).unwrap();

        assert_eq!(&pre[..5], &raw[..5]);
        assert_eq!(&pre[5..41], &raw[5..41]);
        assert_eq!(pre[41] as usize, spk.len());
        assert_eq!(&pre[42..42 + spk.len()], spk.as_slice());
        assert!(pre.ends_with(&[0x01, 0x00, 0x00, 0x00]));
        let tail = tx.output_section();
        assert_eq!(&pre[pre.len() - 4 - tail.len()..pre.len() - 4], tail);
    }

    #[test]
    fn test_known_sighash_and_signature() {
        let raw = hex::decode(TX_170).unwrap();
        let tx = parse_transaction(&raw).unwrap();
        let spk = hex::decode(SPENT_SPK).unwrap();
        let digest = signature_hash(&tx, 0, &spk).unwrap();
        assert_eq!(hex::encode(digest), EXPECTED_SIGHASH);

        // The historic signature verifies over our digest.
        let script_sig = tx.inputs[0].script;
        let sig_len = script_sig[0] as usize;
        let der = &script_sig[1..sig_len];
        assert_eq!(script_sig[sig_len], SIGHASH_ALL);
        let sig = Signature::from_der(der).unwrap();
        let sig = sig.normalize_s().unwrap_or(sig);
        let vk = VerifyingKey::from_sec1_bytes(&spk[1..66]).unwrap();
        vk.verify_prehash(&digest, &sig).unwrap();
    }

    #[test]
    fn test_other_inputs_get_empty_scripts() {
        let mut raw = 1u32.to_le_bytes().to_vec();
        raw.push(2);
        for fill in [0x01u8, 0x02] {
            raw.extend_from_slice(&[fill; 32]);
            raw.extend_from_slice(&0u32.to_le_bytes());
            raw.extend_from_slice(&[3, 0xaa, 0xbb, 0xcc]);
            raw.extend_from_slice(&0xffff_fffeu32.to_le_bytes());
        }
        raw.push(1);
        raw.extend_from_slice(&[0u8; 8]);
        raw.push(0);
        raw.extend_from_slice(&0u32.to_le_bytes());
        let tx = parse_transaction(&raw).unwrap();

        let pre = build_preimage(&tx, 1, &[0x51]).unwrap();
        // First input: outpoint, empty script, sequence.
        assert_eq!(pre[5 + 36], 0x00);
        assert_eq!(&pre[5 + 37..5 + 41], &0xffff_fffeu32.to_le_bytes());
        // Second input carries the substituted script.
        assert_eq!(&pre[5 + 41 + 36..5 + 41 + 38], &[0x01, 0x51]);

        assert_ne!(
            signature_hash(&tx, 0, &[0x51]).unwrap(),
            signature_hash(&tx, 1, &[0x51]).unwrap()
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let raw = hex::decode(TX_170).unwrap();
        let tx = parse_transaction(&raw).unwrap();
        assert_eq!(
            build_preimage(&tx, 1, &[]),
            Err(TxError::InputIndexOutOfRange { index: 1, count: 1 })
        );
    }
}
