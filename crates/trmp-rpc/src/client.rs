//! Async HTTP client for the wallet API.
//!
//! Every endpoint is a JSON POST answered with the
//! `{success, rpcData, error}` envelope. Supports Basic auth, configurable
//! timeout, and retry with exponential backoff on transient failures.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use trmp_types::{Network, OutPoint, UnspentOutput};

use crate::endpoints;
use crate::error::RpcError;
use crate::types::{
    BroadcastRequest, BroadcastResult, CreateRawTransactionRequest, Envelope, FeeRate,
    RawTemplate, TxStatus, UnspentRequest,
};

/// Configuration for an API client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL (e.g., `https://api.trumpow.meme`).
    pub url: String,
    /// Optional username for Basic auth.
    pub username: Option<String>,
    /// Optional password for Basic auth.
    pub password: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Number of retry attempts on transient failure.
    pub retries: u32,
    /// Initial delay between retries (doubles each attempt).
    pub retry_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::for_network(Network::Mainnet)
    }
}

impl ApiConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            url: network.config().default_api_url.to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Async client for the UTXO, template, broadcast, and fee-rate endpoints.
pub struct ApiClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    /// Create a new client with the given URL.
    pub fn new(url: &str) -> Self {
        Self::with_config(ApiConfig {
            url: url.to_string(),
            ..Default::default()
        })
    }

    /// Create a new client with full configuration.
    pub fn with_config(mut config: ApiConfig) -> Self {
        config.url = config.url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to create HTTP client");

        Self { client, config }
    }

    /// Get the configured base URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn auth_header(&self) -> Option<HeaderValue> {
        match (&self.config.username, &self.config.password) {
            (Some(user), Some(pass)) => {
                let creds = format!("{}:{}", user, pass);
                let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
                HeaderValue::from_str(&format!("Basic {}", encoded)).ok()
            }
            _ => None,
        }
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(auth) = self.auth_header() {
            headers.insert(AUTHORIZATION, auth);
        }
        headers
    }

    /// POST `body` to `endpoint` and return the unwrapped `rpcData`.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Value, RpcError> {
        let url = format!("{}{}", self.config.url, endpoint);
        let attempts = self.config.retries + 1;
        let mut last_err = RpcError::NoResult {
            context: endpoint.to_string(),
        };

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.config.backoff(attempt);
                log::debug!("retrying {} in {:?} (attempt {})", endpoint, delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            match self.do_post(&url, body, endpoint).await {
                Ok(val) => return Ok(val),
                Err(e) => {
                    let should_retry = e.is_transient() && attempt + 1 < attempts;
                    if !should_retry {
                        return Err(e);
                    }
                    log::warn!("{} failed: {}", endpoint, e);
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }

    async fn do_post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        endpoint: &str,
    ) -> Result<Value, RpcError> {
        let resp = self
            .client
            .post(url)
            .headers(self.build_headers())
            .json(body)
            .send()
            .await
            .map_err(|e| RpcError::Http {
                endpoint: endpoint.to_string(),
                url: url.to_string(),
                source: e,
            })?;

        let status = resp.status().as_u16();

        if status == 401 {
            return Err(RpcError::AuthFailed {
                url: url.to_string(),
            });
        }

        if status >= 400 {
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcError::HttpStatus {
                endpoint: endpoint.to_string(),
                url: url.to_string(),
                status,
                body: body.chars().take(500).collect(),
            });
        }

        let text = resp.text().await.map_err(|e| RpcError::Http {
            endpoint: endpoint.to_string(),
            url: url.to_string(),
            source: e,
        })?;
        let envelope: Envelope = serde_json::from_str(&text).map_err(|e| RpcError::Decode {
            context: endpoint.to_string(),
            message: e.to_string(),
        })?;
        envelope.into_result(endpoint)
    }

    async fn post_typed<B, T>(&self, endpoint: &str, body: &B) -> Result<T, RpcError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.post(endpoint, body).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode {
            context: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    /// Unspent outputs of `address`.
    pub async fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, RpcError> {
        let utxos: Vec<UnspentOutput> = self
            .post_typed(endpoints::UNSPENT, &UnspentRequest { address })
            .await?;
        log::debug!("{} unspent outputs for {}", utxos.len(), address);
        Ok(utxos)
    }

    /// Ask the template provider for an unsigned transaction.
    pub async fn create_raw_transaction(
        &self,
        inputs: &[OutPoint],
        outputs: &BTreeMap<String, u64>,
    ) -> Result<String, RpcError> {
        let req = CreateRawTransactionRequest::new(inputs, outputs);
        let template: RawTemplate = self.post_typed(endpoints::CREATE_RAW_TRANSACTION, &req).await?;
        Ok(template.raw_tx_hex)
    }

    /// Submit a signed transaction. Returns the txid.
    pub async fn broadcast(&self, req: &BroadcastRequest) -> Result<String, RpcError> {
        let result: BroadcastResult = self.post_typed(endpoints::BROADCAST, req).await?;
        log::info!("broadcast accepted: {}", result.txid);
        Ok(result.txid)
    }

    /// Base fee rate in atomic units per 1000 bytes.
    pub async fn fee_rate(&self) -> Result<u64, RpcError> {
        let rate: FeeRate = self
            .post_typed(endpoints::FEE_RATE, &serde_json::json!({}))
            .await?;
        Ok(rate.feerate)
    }

    /// Confirmation status of a previously broadcast transaction.
    pub async fn transaction_status(&self, txid: &str) -> Result<TxStatus, RpcError> {
        self.post_typed(endpoints::RAW_TRANSACTION, &serde_json::json!({ "txid": txid }))
            .await
    }
}
