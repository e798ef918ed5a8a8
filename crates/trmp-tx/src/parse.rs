//! Amount-blind legacy transaction parser.
//!
//! Layout:
//! ```text
//! version        u32 LE
//! input count    varint
//!   prev hash    32 bytes (internal byte order)
//!   prev index   u32 LE
//!   script       varint length + bytes
//!   sequence     u32 LE
//! output count   varint
//!   amount       8 bytes, never decoded
//!   script       varint length + bytes
//! lock time      u32 LE
//! ```
//!
//! The parse borrows the source buffer; inputs, outputs, and the trailing
//! output section are views into it, so the outputs can be re-emitted
//! byte-for-byte without interpreting any amount.

use serde::Serialize;

use crate::reader::ByteReader;
use crate::varint::write_varint_into;
use crate::verify::txid;
use crate::TxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInput<'a> {
    /// Previous transaction hash in wire (internal) byte order.
    pub prev_tx_hash: &'a [u8; 32],
    pub prev_output_index: u32,
    pub script: &'a [u8],
    pub sequence: u32,
    /// Offset of the first byte of this input in the raw buffer.
    pub start_offset: usize,
    /// Offset one past the last byte of this input.
    pub end_offset: usize,
}

impl ParsedInput<'_> {
    pub fn script_length(&self) -> usize {
        self.script.len()
    }

    /// Previous txid in display order (reversed hex).
    pub fn prev_txid(&self) -> String {
        let mut h = *self.prev_tx_hash;
        h.reverse();
        hex::encode(h)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutput<'a> {
    /// Raw little-endian amount field, kept opaque.
    pub amount_bytes: &'a [u8; 8],
    pub script_pubkey: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransaction<'a> {
    pub version: u32,
    pub inputs: Vec<ParsedInput<'a>>,
    pub outputs: Vec<ParsedOutput<'a>>,
    pub lock_time: u32,
    raw: &'a [u8],
    outputs_offset: usize,
}

/// Parse a raw legacy transaction. The whole buffer must be consumed.
pub fn parse_transaction(raw: &[u8]) -> Result<ParsedTransaction<'_>, TxError> {
    let mut r = ByteReader::new(raw);

    let version = r.read_u32_le()?;

    let input_count = r.read_varint()?;
    let mut inputs = Vec::with_capacity(capacity_hint(input_count, r.remaining(), 41));
    for i in 0..input_count {
        let start_offset = r.offset();
        let prev_tx_hash = r.read_array::<32>()?;
        let prev_output_index = r.read_u32_le()?;
        let script = r.read_var_bytes()?;
        let sequence = r.read_u32_le()?;
        log::trace!("input {} spans {}..{}", i, start_offset, r.offset());
        inputs.push(ParsedInput {
            prev_tx_hash,
            prev_output_index,
            script,
            sequence,
            start_offset,
            end_offset: r.offset(),
        });
    }

    let outputs_offset = r.offset();
    let output_count = r.read_varint()?;
    let mut outputs = Vec::with_capacity(capacity_hint(output_count, r.remaining(), 9));
    for _ in 0..output_count {
        let amount_bytes = r.read_array::<8>()?;
        let script_pubkey = r.read_var_bytes()?;
        outputs.push(ParsedOutput {
            amount_bytes,
            script_pubkey,
        });
    }

    let lock_time = r.read_u32_le()?;

    if !r.is_at_end() {
        return Err(TxError::Malformed(format!(
            "{} trailing bytes after lock time (parsed {} of {})",
            r.remaining(),
            r.offset(),
            raw.len()
        )));
    }

    Ok(ParsedTransaction {
        version,
        inputs,
        outputs,
        lock_time,
        raw,
        outputs_offset,
    })
}

// A count larger than the remaining bytes could ever hold is malformed and
// will fail on the first short read; don't let it drive an allocation.
fn capacity_hint(count: u64, remaining: usize, min_item: usize) -> usize {
    (count as usize).min(remaining / min_item)
}

impl<'a> ParsedTransaction<'a> {
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn raw_bytes(&self) -> &'a [u8] {
        self.raw
    }

    /// Output count, outputs, and lock time exactly as they appear on the wire.
    pub fn output_section(&self) -> &'a [u8] {
        &self.raw[self.outputs_offset..]
    }

    /// Re-serialize with `scripts[i]` replacing the script of input `i`.
    /// The output section is copied verbatim from the source buffer.
    pub fn serialize_with_scripts(&self, scripts: &[&[u8]]) -> Result<Vec<u8>, TxError> {
        if scripts.len() != self.inputs.len() {
            return Err(TxError::Malformed(format!(
                "expected {} input scripts, got {}",
                self.inputs.len(),
                scripts.len()
            )));
        }

        let script_bytes: usize = scripts.iter().map(|s| s.len() + 9).sum();
        let mut out = Vec::with_capacity(
            self.raw.len() + script_bytes + self.inputs.len() * 40,
        );
        out.extend_from_slice(&self.version.to_le_bytes());
        write_varint_into(&mut out, self.inputs.len() as u64);
        for (input, script) in self.inputs.iter().zip(scripts) {
            out.extend_from_slice(input.prev_tx_hash);
            out.extend_from_slice(&input.prev_output_index.to_le_bytes());
            write_varint_into(&mut out, script.len() as u64);
            out.extend_from_slice(script);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        out.extend_from_slice(self.output_section());
        Ok(out)
    }

    /// Rebuild the transaction from its parsed parts.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.raw.len());
        out.extend_from_slice(&self.version.to_le_bytes());
        write_varint_into(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(&self.raw[input.start_offset..input.end_offset]);
        }
        out.extend_from_slice(self.output_section());
        out
    }

    /// JSON-friendly view for display.
    pub fn describe(&self) -> DecodedTransaction {
        DecodedTransaction {
            txid: txid(self.raw),
            version: self.version,
            size: self.raw.len(),
            lock_time: self.lock_time,
            inputs: self
                .inputs
                .iter()
                .map(|i| DecodedInput {
                    txid: i.prev_txid(),
                    vout: i.prev_output_index,
                    script_sig: hex::encode(i.script),
                    sequence: i.sequence,
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|o| DecodedOutput {
                    amount_le: hex::encode(o.amount_bytes),
                    script_pub_key: hex::encode(o.script_pubkey),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedInput {
    pub txid: String,
    pub vout: u32,
    pub script_sig: String,
    pub sequence: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedOutput {
    /// Raw amount field as little-endian hex.
    pub amount_le: String,
    pub script_pub_key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedTransaction {
    pub txid: String,
    pub version: u32,
    pub size: usize,
    pub lock_time: u32,
    pub inputs: Vec<DecodedInput>,
    pub outputs: Vec<DecodedOutput>,
}
