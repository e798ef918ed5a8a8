//! On-disk wallet file: a JSON envelope around the encrypted vault blob.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::WalletError;

pub const WALLET_FILE_VERSION: &str = "1.2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletFileData {
    pub version: String,
    pub encrypted: bool,
    /// Hex vault blob, see [`crate::encryption`].
    pub data: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl WalletFileData {
    pub fn new(data: String) -> Self {
        Self {
            version: WALLET_FILE_VERSION.to_string(),
            encrypted: true,
            data,
            timestamp: now_millis(),
        }
    }

    /// Replace the blob (after a password change) and restamp.
    pub fn replace_data(&mut self, data: String) {
        self.data = data;
        self.timestamp = now_millis();
    }

    pub fn to_json(&self) -> Result<String, WalletError> {
        serde_json::to_string_pretty(self).map_err(|e| WalletError::Storage(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, WalletError> {
        let file: Self =
            serde_json::from_str(text).map_err(|e| WalletError::InvalidFile(e.to_string()))?;
        if !file.encrypted {
            return Err(WalletError::InvalidFile("wallet data is not encrypted".into()));
        }
        if file.data.is_empty() || hex::decode(&file.data).is_err() {
            return Err(WalletError::InvalidFile("wallet data is not a hex blob".into()));
        }
        if file.version != WALLET_FILE_VERSION {
            log::warn!(
                "wallet file version {} (expected {})",
                file.version,
                WALLET_FILE_VERSION
            );
        }
        Ok(file)
    }

    /// Write atomically: a sibling temp file is renamed over `path`.
    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| WalletError::Storage(e.to_string()))?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_json()?).map_err(|e| WalletError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| WalletError::Storage(e.to_string()))?;
        log::debug!("wallet file written to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Storage(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }
}
