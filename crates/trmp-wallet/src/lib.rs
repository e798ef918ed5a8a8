//! TrumPOW wallet core.
//!
//! Coin selection and fee quoting, the platform fee schedule, the encrypted
//! wallet-secret vault and its file envelope, per-call key derivation, and
//! the payment pipeline that ties them to the remote API.

pub mod encryption;
pub mod error;
pub mod fee_tier;
pub mod keys;
pub mod send;
pub mod utxo;
pub mod wallet_file;

pub use encryption::{
    change_password, create_vault, decrypt_wallet, encrypt_wallet, password_hash,
    verify_password, DecryptOutcome, WalletSecret,
};
pub use error::WalletError;
pub use fee_tier::{FeeTierTable, Tier};
pub use keys::{generate_mnemonic, validate_mnemonic, WalletKeys};
pub use send::{
    send_approved_payment, send_payment, SendConfig, SendReceipt, SendRequest, WalletBackend,
};
pub use utxo::{balance, plan_outputs, select_and_quote, Balance, FeeQuote, PaymentOutput};
pub use wallet_file::WalletFileData;
