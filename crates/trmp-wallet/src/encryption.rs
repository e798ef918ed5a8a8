//! Wallet secret vault.
//!
//! The password is first reduced to a keyed hash (HMAC-SHA256 under a fixed
//! application string); that hash, never the raw password, is expanded with
//! HKDF-SHA256 into the AES-256-GCM key. The vault blob is
//! `hex(nonce || ciphertext)` over the JSON-serialized [`WalletSecret`].
//!
//! Decryption never errors: a wrong password, a corrupted blob, or a payload
//! that is not a wallet all come back as `DecryptOutcome { is_success: false }`.

use std::collections::BTreeMap;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::WalletError;

/// HMAC key for the password hash.
const PASSWORD_SALT: &[u8] = b"trumPOW_password";

/// HKDF info string for the vault key.
const KEY_INFO: &[u8] = b"walletFile";

const NONCE_LEN: usize = 12;

/// AES-GCM tag length; a blob must hold at least nonce + tag.
const TAG_LEN: usize = 16;

pub const MIN_PASSWORD_LEN: usize = 8;

/// The secret wallet payload. Unknown fields are carried through
/// re-encryption untouched.
///
/// Not `Clone`: the only copy of the mnemonic is the one decrypted from the
/// vault, and it is wiped when dropped.
#[derive(PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSecret {
    pub mnemonic: String,
    pub password_hash: String,
    pub derivation_path: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl WalletSecret {
    pub fn new(
        mnemonic: &str,
        password: &str,
        derivation_path: &str,
    ) -> Result<Self, WalletError> {
        Ok(Self {
            mnemonic: mnemonic.to_string(),
            password_hash: password_hash(password)?,
            derivation_path: derivation_path.to_string(),
            extra: BTreeMap::new(),
        })
    }
}

impl Zeroize for WalletSecret {
    fn zeroize(&mut self) {
        self.mnemonic.zeroize();
        self.password_hash.zeroize();
    }
}

impl Drop for WalletSecret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for WalletSecret {}

impl std::fmt::Debug for WalletSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSecret")
            .field("mnemonic", &"<redacted>")
            .field("password_hash", &"<redacted>")
            .field("derivation_path", &self.derivation_path)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Result of a decryption attempt. Check `is_success` before using `wallet`.
#[derive(Debug)]
pub struct DecryptOutcome {
    pub is_success: bool,
    pub wallet: Option<WalletSecret>,
}

impl DecryptOutcome {
    fn failed() -> Self {
        Self {
            is_success: false,
            wallet: None,
        }
    }

    pub fn into_result(self) -> Result<WalletSecret, WalletError> {
        match self.wallet {
            Some(wallet) if self.is_success => Ok(wallet),
            _ => Err(WalletError::DecryptionFailed),
        }
    }
}

/// Keyed hash of a password, hex encoded.
pub fn password_hash(password: &str) -> Result<String, WalletError> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(PASSWORD_SALT)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    mac.update(password.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn derive_key(password_hash: &str) -> Result<Zeroizing<[u8; 32]>, WalletError> {
    let hk = Hkdf::<Sha256>::new(None, password_hash.as_bytes());
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(KEY_INFO, &mut key[..])
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    Ok(key)
}

/// Encrypt `secret` under the key derived from `password_hash`.
#[allow(deprecated)] // aes-gcm 0.10 uses generic-array 0.x
pub fn encrypt_wallet(secret: &WalletSecret, password_hash: &str) -> Result<String, WalletError> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(secret).map_err(|e| WalletError::Encryption(e.to_string()))?,
    );

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let key_bytes = derive_key(password_hash)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes[..]));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
        .map_err(|e| WalletError::Encryption(e.to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(hex::encode(blob))
}

#[allow(deprecated)]
fn try_decrypt(blob_hex: &str, password_hash: &str) -> Result<WalletSecret, WalletError> {
    let blob = hex::decode(blob_hex.trim()).map_err(|_| WalletError::DecryptionFailed)?;
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(WalletError::DecryptionFailed);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);

    let key_bytes = derive_key(password_hash)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes[..]));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| WalletError::DecryptionFailed)?,
    );

    serde_json::from_slice(&plaintext).map_err(|_| WalletError::DecryptionFailed)
}

/// Decrypt a vault blob with the user's password.
pub fn decrypt_wallet(blob_hex: &str, password: &str) -> DecryptOutcome {
    let result = password_hash(password)
        .map(Zeroizing::new)
        .and_then(|hash| try_decrypt(blob_hex, &hash));
    match result {
        Ok(wallet) => DecryptOutcome {
            is_success: true,
            wallet: Some(wallet),
        },
        Err(_) => {
            log::warn!("wallet decryption failed");
            DecryptOutcome::failed()
        }
    }
}

pub fn verify_password(blob_hex: &str, password: &str) -> bool {
    decrypt_wallet(blob_hex, password).is_success
}

/// Build a fresh vault blob for a new or restored wallet.
pub fn create_vault(
    mnemonic: &str,
    password: &str,
    derivation_path: &str,
) -> Result<String, WalletError> {
    check_password(password)?;
    let secret = WalletSecret::new(mnemonic, password, derivation_path)?;
    encrypt_wallet(&secret, &secret.password_hash)
}

/// Re-encrypt under `new_password`. The returned blob is built from scratch
/// with a fresh nonce; `passwordHash` inside the payload is updated.
pub fn change_password(
    blob_hex: &str,
    old_password: &str,
    new_password: &str,
) -> Result<String, WalletError> {
    check_password(new_password)?;
    let mut secret = decrypt_wallet(blob_hex, old_password).into_result()?;
    let new_hash = password_hash(new_password)?;
    secret.password_hash.zeroize();
    secret.password_hash = new_hash;
    encrypt_wallet(&secret, &secret.password_hash)
}

fn check_password(password: &str) -> Result<(), WalletError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(WalletError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}
