//! TrumPOW legacy transaction engine.
//!
//! Amount-blind parsing of raw transactions, SIGHASH_ALL preimage
//! construction, P2PKH signing, structural verification, and network fee
//! estimation. Output amounts are carried as raw 8-byte spans and are
//! never decoded.

pub mod fee;
pub mod parse;
pub mod reader;
pub mod script;
pub mod sighash;
pub mod sign;
pub mod varint;
pub mod verify;

pub use fee::{estimate_vsize, network_fee};
pub use parse::{parse_transaction, ParsedInput, ParsedOutput, ParsedTransaction};
pub use sign::{sign_raw_transaction, OutPoint};
pub use verify::{txid, verify_format, verify_format_with, VerificationReport, VerifyOptions};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("malformed transaction: {0}")]
    Malformed(String),

    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("input index {index} out of range ({count} inputs)")]
    InputIndexOutOfRange { index: usize, count: usize },

    #[error("signing error: {0}")]
    Signing(String),
}

impl From<hex::FromHexError> for TxError {
    fn from(e: hex::FromHexError) -> Self {
        TxError::Hex(e.to_string())
    }
}
