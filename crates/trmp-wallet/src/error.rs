//! Wallet error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] trmp_rpc::RpcError),

    #[error("transaction error: {0}")]
    Tx(#[from] trmp_tx::TxError),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("decryption failed (wrong password or corrupted data)")]
    DecryptionFailed,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: u64, have: u64 },

    #[error("no destinations specified")]
    NoDestinations,

    #[error("invalid fee tier table: {0}")]
    InvalidFeeTiers(String),

    #[error("broadcast rejected ({code}): {message}")]
    Broadcast { code: i64, message: String },

    #[error("quote changed since it was approved: {0}")]
    QuoteChanged(String),

    #[error("template verification failed: {0}")]
    Verification(String),

    #[error("invalid wallet file: {0}")]
    InvalidFile(String),
}

impl From<trmp_types::AddressError> for WalletError {
    fn from(e: trmp_types::AddressError) -> Self {
        WalletError::InvalidAddress(e.to_string())
    }
}

impl From<trmp_types::AmountError> for WalletError {
    fn from(e: trmp_types::AmountError) -> Self {
        WalletError::InvalidAmount(e.to_string())
    }
}
