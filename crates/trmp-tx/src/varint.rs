//! Bitcoin-style compact size integers.
//!
//! | prefix | payload                |
//! |--------|------------------------|
//! | < 0xfd | the byte itself        |
//! | 0xfd   | 2-byte little-endian   |
//! | 0xfe   | 4-byte little-endian   |
//! | 0xff   | 8-byte little-endian   |
//!
//! Counts and script lengths never legitimately exceed 32 bits, so an
//! 8-byte payload above `u32::MAX` is rejected instead of truncated.

use crate::TxError;

/// Decode a varint at `offset`. Returns `(value, next_offset)`.
pub fn read_varint(data: &[u8], offset: usize) -> Result<(u64, usize), TxError> {
    let prefix = *data
        .get(offset)
        .ok_or_else(|| eof(offset, 1, data.len()))?;

    let width = match prefix {
        0xfd => 2,
        0xfe => 4,
        0xff => 8,
        b => return Ok((b as u64, offset + 1)),
    };

    let start = offset + 1;
    let payload = data
        .get(start..start + width)
        .ok_or_else(|| eof(start, width, data.len()))?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(payload);
    let value = u64::from_le_bytes(buf);

    if value > u32::MAX as u64 {
        return Err(TxError::Malformed(format!(
            "varint at offset {} exceeds 32 bits ({})",
            offset, value
        )));
    }
    Ok((value, start + width))
}

/// Encode `value` with the smallest valid prefix.
pub fn write_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(varint_len(value));
    write_varint_into(&mut out, value);
    out
}

/// Append the encoding of `value` to `out`.
pub fn write_varint_into(out: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => out.push(value as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Encoded size of `value` in bytes.
pub fn varint_len(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

fn eof(offset: usize, need: usize, len: usize) -> TxError {
    TxError::Malformed(format!(
        "unexpected end of data at offset {} (need {} bytes, have {})",
        offset,
        need,
        len.saturating_sub(offset)
    ))
}
