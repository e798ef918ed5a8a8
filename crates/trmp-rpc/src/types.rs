//! Request and response bodies of the wallet API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trmp_types::amount::{format_amount, serde_coin, serde_coin_number};
use trmp_types::OutPoint;

use crate::error::RpcError;

/// `{success, rpcData, error: {error: {code, message}}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub rpc_data: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorWrapper {
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl Envelope {
    /// Unwrap `rpcData`, turning any reported error into [`RpcError::Api`].
    pub fn into_result(self, context: &str) -> Result<Value, RpcError> {
        let reported = self.error.and_then(|w| w.error);
        if let Some(err) = reported {
            return Err(RpcError::Api {
                code: err.code,
                message: err.message,
            });
        }
        if !self.success {
            return Err(RpcError::Api {
                code: 0,
                message: format!("{} reported failure without details", context),
            });
        }
        match self.rpc_data {
            Some(Value::Null) | None => Err(RpcError::NoResult {
                context: context.to_string(),
            }),
            Some(v) => Ok(v),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnspentRequest<'a> {
    pub address: &'a str,
}

/// Body for the transaction-template provider. Amounts are decimal coin
/// strings keyed by recipient address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRawTransactionRequest {
    pub inputs: Vec<OutPoint>,
    pub outputs: BTreeMap<String, String>,
}

impl CreateRawTransactionRequest {
    pub fn new(inputs: &[OutPoint], outputs: &BTreeMap<String, u64>) -> Self {
        Self {
            inputs: inputs.to_vec(),
            outputs: outputs
                .iter()
                .map(|(addr, amount)| (addr.clone(), format_amount(*amount)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTemplate {
    pub raw_tx_hex: String,
}

/// Body for the broadcast sink. Amounts go out as exact JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    pub address: String,
    /// Locally computed txid of `rawtx`, recorded by the sink as the
    /// pending transaction id.
    #[serde(default)]
    pub txid: String,
    pub rawtx: String,
    #[serde(with = "serde_coin_number")]
    pub total_input: u64,
    #[serde(with = "serde_coin_number")]
    pub total_output: u64,
    #[serde(with = "serde_coin_number")]
    pub change: u64,
    /// Total fee charged (network plus platform).
    #[serde(with = "serde_coin_number")]
    pub fee_rate: u64,
    #[serde(with = "serde_coin_number")]
    pub app_fee: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastResult {
    pub txid: String,
}

/// Fee rate in atomic units per 1000 bytes.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeeRate {
    #[serde(alias = "feeRate", with = "serde_coin")]
    pub feerate: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TxStatus {
    #[serde(default)]
    pub blockhash: Option<String>,
    #[serde(default)]
    pub confirmations: Option<u64>,
}

impl TxStatus {
    pub fn is_confirmed(&self) -> bool {
        self.blockhash.as_deref().is_some_and(|h| !h.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> Envelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_envelope_success() {
        let v = envelope(r#"{"success": true, "rpcData": {"txid": "ab"}}"#)
            .into_result("broadcast")
            .unwrap();
        assert_eq!(v["txid"], "ab");
    }

    #[test]
    fn test_envelope_error() {
        let err = envelope(
            r#"{"success": false, "error": {"error": {"code": -26, "message": "min relay fee not met"}}}"#,
        )
        .into_result("broadcast")
        .unwrap_err();
        match err {
            RpcError::Api { code, message } => {
                assert_eq!(code, -26);
                assert_eq!(message, "min relay fee not met");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_envelope_missing_data() {
        let err = envelope(r#"{"success": true, "rpcData": null}"#)
            .into_result("feerate")
            .unwrap_err();
        assert!(matches!(err, RpcError::NoResult { .. }));
        let err = envelope(r#"{"success": false}"#).into_result("feerate").unwrap_err();
        assert!(matches!(err, RpcError::Api { code: 0, .. }));
    }

    #[test]
    fn test_create_request_amounts_are_strings() {
        let mut outputs = BTreeMap::new();
        outputs.insert("TAddr".to_string(), 150_000_000u64);
        let req = CreateRawTransactionRequest::new(
            &[OutPoint {
                txid: "aa".into(),
                vout: 1,
            }],
            &outputs,
        );
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["outputs"]["TAddr"], "1.5");
        assert_eq!(v["inputs"][0]["vout"], 1);
    }

    #[test]
    fn test_broadcast_request_numbers() {
        let req = BroadcastRequest {
            address: "TAddr".into(),
            txid: String::new(),
            rawtx: "00".into(),
            total_input: 1_000_000_000,
            total_output: 900_000_000,
            change: 99_000_000,
            fee_rate: 1_000_000,
            app_fee: 0,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""totalInput":10"#));
        assert!(json.contains(r#""change":0.99"#));
        assert!(json.contains(r#""feeRate":0.01"#));
        assert!(json.contains(r#""appFee":0"#));
    }

    #[test]
    fn test_fee_rate_and_status() {
        let fr: FeeRate = serde_json::from_str(r#"{"feerate": 0.01}"#).unwrap();
        assert_eq!(fr.feerate, 1_000_000);
        let st: TxStatus = serde_json::from_str(r#"{"blockhash": "00ff"}"#).unwrap();
        assert!(st.is_confirmed());
        assert!(!TxStatus::default().is_confirmed());
    }
}
