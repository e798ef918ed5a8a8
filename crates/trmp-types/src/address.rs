//! TrumPOW address parsing, validation, and creation.
//!
//! Addresses are Base58Check strings over `version || hash160`. The version
//! byte selects the network and whether the payload is a public key hash
//! (P2PKH) or a script hash (P2SH).

use crate::constants::{network_config, Network};
use crate::hash::hash160;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must be a non-empty string")]
    Empty,

    #[error("base58 decode error: {0}")]
    Base58(String),

    #[error("invalid data length: expected 21 bytes, got {0}")]
    InvalidDataLength(usize),

    #[error("unknown address version: 0x{0:02x}")]
    UnknownVersion(u8),

    #[error("address belongs to {actual}, expected {expected}")]
    WrongNetwork { expected: Network, actual: Network },

    #[error("public key must be 33 bytes (compressed), got {0}")]
    InvalidPublicKey(usize),
}

/// What the 20-byte payload commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    P2pkh,
    P2sh,
}

/// A decoded address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub network: Network,
    pub kind: AddressKind,
    pub hash: [u8; 20],
}

impl Address {
    /// Version byte for this address's network and kind.
    pub fn version(&self) -> u8 {
        let cfg = network_config(self.network);
        match self.kind {
            AddressKind::P2pkh => cfg.pub_key_hash,
            AddressKind::P2sh => cfg.script_hash,
        }
    }

    /// Re-encode to the Base58Check string form.
    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.version());
        payload.extend_from_slice(&self.hash);
        bs58::encode(payload).with_check().into_string()
    }

    /// Locking script paying to this address.
    pub fn script_pubkey(&self) -> Vec<u8> {
        match self.kind {
            // OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
            AddressKind::P2pkh => {
                let mut s = Vec::with_capacity(25);
                s.extend_from_slice(&[0x76, 0xa9, 0x14]);
                s.extend_from_slice(&self.hash);
                s.extend_from_slice(&[0x88, 0xac]);
                s
            }
            // OP_HASH160 <20> OP_EQUAL
            AddressKind::P2sh => {
                let mut s = Vec::with_capacity(23);
                s.extend_from_slice(&[0xa9, 0x14]);
                s.extend_from_slice(&self.hash);
                s.push(0x87);
                s
            }
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, AddressError> {
        decode_address(s)
    }
}

fn classify(version: u8) -> Option<(Network, AddressKind)> {
    [Network::Mainnet, Network::Testnet]
        .into_iter()
        .find_map(|network| {
            let cfg = network_config(network);
            if version == cfg.pub_key_hash {
                Some((network, AddressKind::P2pkh))
            } else if version == cfg.script_hash {
                Some((network, AddressKind::P2sh))
            } else {
                None
            }
        })
}

/// Decode an address on any known network.
pub fn decode_address(address: &str) -> Result<Address, AddressError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AddressError::Empty);
    }

    let data = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| AddressError::Base58(e.to_string()))?;
    if data.len() != 21 {
        return Err(AddressError::InvalidDataLength(data.len()));
    }

    let (network, kind) = classify(data[0]).ok_or(AddressError::UnknownVersion(data[0]))?;
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&data[1..]);
    Ok(Address { network, kind, hash })
}

/// Decode an address and require it to belong to `network`.
pub fn decode_address_for(address: &str, network: Network) -> Result<Address, AddressError> {
    let parsed = decode_address(address)?;
    if parsed.network != network {
        return Err(AddressError::WrongNetwork {
            expected: network,
            actual: parsed.network,
        });
    }
    Ok(parsed)
}

/// Whether `address` is a well-formed address on `network`.
pub fn is_valid_address(address: &str, network: Network) -> bool {
    decode_address_for(address, network).is_ok()
}

/// Build the P2PKH address of a compressed secp256k1 public key.
pub fn p2pkh_address(public_key: &[u8], network: Network) -> Result<Address, AddressError> {
    if public_key.len() != 33 {
        return Err(AddressError::InvalidPublicKey(public_key.len()));
    }
    Ok(Address {
        network,
        kind: AddressKind::P2pkh,
        hash: hash160(public_key),
    })
}
