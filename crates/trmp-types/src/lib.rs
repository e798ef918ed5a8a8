//! Core types and constants for the TrumPOW wallet engine.
//!
//! Network parameters, fixed-point amounts, hash primitives, Base58Check
//! address handling, and the UTXO records shared by every other crate.

pub mod address;
pub mod amount;
pub mod constants;
pub mod hash;
pub mod utxo;

pub use address::{Address, AddressError, AddressKind};
pub use amount::{format_amount, parse_amount, AmountError, COIN};
pub use constants::{Network, NetworkConfig};
pub use utxo::{OutPoint, UnspentOutput};
