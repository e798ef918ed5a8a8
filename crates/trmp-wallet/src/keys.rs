//! Wallet key management.
//!
//! BIP39 mnemonic → 64-byte seed → BIP44 path → secp256k1 signing key.
//! A [`WalletKeys`] is derived for one signing operation and dropped at the
//! end of it; the extended key and seed never outlive [`WalletKeys::derive`].

use bip32::{DerivationPath, Language, Mnemonic, XPrv};
use k256::ecdsa::SigningKey;
use trmp_types::address::{p2pkh_address, Address};
use trmp_types::Network;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::error::WalletError;

/// Lowercase and collapse whitespace so pasted phrases derive the same seed.
pub fn normalize_mnemonic(phrase: &str) -> Zeroizing<String> {
    Zeroizing::new(
        phrase
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// A new 24-word English mnemonic from the OS RNG.
pub fn generate_mnemonic() -> Zeroizing<String> {
    let mnemonic = Mnemonic::random(&mut rand::rngs::OsRng, Language::English);
    Zeroizing::new(mnemonic.phrase().to_string())
}

/// Check word list membership and checksum.
pub fn validate_mnemonic(phrase: &str) -> Result<(), WalletError> {
    let normalized = normalize_mnemonic(phrase);
    Mnemonic::new(normalized.as_str(), Language::English)
        .map(|_| ())
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}

/// Signing key material for one address.
pub struct WalletKeys {
    signing_key: SigningKey,
    public_key: [u8; 33],
    address: Address,
}

impl WalletKeys {
    pub fn derive(phrase: &str, path: &str, network: Network) -> Result<Self, WalletError> {
        let normalized = normalize_mnemonic(phrase);
        let mnemonic = Mnemonic::new(normalized.as_str(), Language::English)
            .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
        let path: DerivationPath = path
            .parse()
            .map_err(|e: bip32::Error| WalletError::KeyDerivation(format!("{}: {}", path, e)))?;

        let seed = mnemonic.to_seed("");
        let xprv = XPrv::derive_from_path(seed.as_bytes(), &path)
            .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
        let signing_key = xprv.private_key().clone();

        let public_key = trmp_tx::sign::compressed_pubkey(&signing_key);
        let address = p2pkh_address(&public_key, network)?;
        Ok(Self {
            signing_key,
            public_key,
            address,
        })
    }

    /// Keys for the network's default path.
    pub fn derive_default(phrase: &str, network: Network) -> Result<Self, WalletError> {
        Self::derive(phrase, network.config().derivation_path, network)
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    pub fn address(&self) -> &Address {
        &self.address
    }
}

// `SigningKey` wipes its scalar on drop; the rest is public data.
impl ZeroizeOnDrop for WalletKeys {}

impl std::fmt::Debug for WalletKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKeys")
            .field("public_key", &hex::encode(self.public_key))
            .field("address", &self.address.encode())
            .finish_non_exhaustive()
    }
}
