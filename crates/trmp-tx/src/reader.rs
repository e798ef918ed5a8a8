//! Bounds-checked cursor over a borrowed byte slice.

use crate::varint::read_varint;
use crate::TxError;

/// Forward-only reader. Every read either returns a sub-slice of the
/// original buffer or fails with [`TxError::Malformed`]; nothing is copied.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub fn is_at_end(&self) -> bool {
        self.offset == self.data.len()
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], TxError> {
        if count > self.remaining() {
            return Err(TxError::Malformed(format!(
                "unexpected end of data at offset {} (need {} bytes, have {})",
                self.offset,
                count,
                self.remaining()
            )));
        }
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<&'a [u8; N], TxError> {
        let bytes = self.read_bytes(N)?;
        bytes
            .try_into()
            .map_err(|_| TxError::Malformed(format!("expected {} bytes", N)))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, TxError> {
        Ok(u32::from_le_bytes(*self.read_array::<4>()?))
    }

    pub fn read_varint(&mut self) -> Result<u64, TxError> {
        let (value, next) = read_varint(self.data, self.offset)?;
        self.offset = next;
        Ok(value)
    }

    /// Length-prefixed byte string.
    pub fn read_var_bytes(&mut self) -> Result<&'a [u8], TxError> {
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| TxError::Malformed(format!("length {} too large", len)))?;
        self.read_bytes(len)
    }
}
