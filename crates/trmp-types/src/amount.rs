//! Fixed-point amount helpers.
//!
//! All amount math happens on `u64` atomic units (10^8 per coin). Decimal
//! text is converted digit-by-digit, never through floating point, so the
//! user-facing value always matches the integer on the wire.

use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

/// Atomic units per coin (10^8).
pub const COIN: u64 = 100_000_000;

/// Number of decimal places for display.
pub const DISPLAY_DECIMAL_POINT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount must be a non-empty decimal string")]
    Empty,

    #[error("invalid amount '{0}'")]
    Invalid(String),

    #[error("too many decimal places in '{0}' (max 8)")]
    TooPrecise(String),

    #[error("amount '{0}' overflows 64-bit atomic units")]
    Overflow(String),
}

/// Format an atomic amount as a human-readable string (e.g., 1.23456789).
pub fn format_amount(atomic: u64) -> String {
    let whole = atomic / COIN;
    let frac = atomic % COIN;
    if frac == 0 {
        format!("{}", whole)
    } else {
        let frac_str = format!("{:08}", frac);
        let trimmed = frac_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}

/// Parse a human-readable amount string to atomic units.
pub fn parse_amount(s: &str) -> Result<u64, AmountError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole_str, frac_str) = match s.find('.') {
        Some(dot_pos) => (&s[..dot_pos], &s[dot_pos + 1..]),
        None => (s, ""),
    };

    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(AmountError::Invalid(s.to_string()));
    }
    let all_digits = |t: &str| t.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole_str) || !all_digits(frac_str) {
        return Err(AmountError::Invalid(s.to_string()));
    }
    if frac_str.len() > DISPLAY_DECIMAL_POINT {
        return Err(AmountError::TooPrecise(s.to_string()));
    }

    let whole: u64 = if whole_str.is_empty() {
        0
    } else {
        whole_str
            .parse()
            .map_err(|_| AmountError::Overflow(s.to_string()))?
    };
    let frac: u64 = if frac_str.is_empty() {
        0
    } else {
        let padded = format!("{:0<8}", frac_str);
        padded
            .parse()
            .map_err(|_| AmountError::Invalid(s.to_string()))?
    };

    whole
        .checked_mul(COIN)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| AmountError::Overflow(s.to_string()))
}

/// Serde adapter: atomic `u64` in memory, decimal coin text or JSON number
/// on the wire.
///
/// Numbers are read from their literal text (`serde_json` is built with
/// `arbitrary_precision`), so `0.1` stays exactly ten million atomic units.
pub mod serde_coin {
    use super::*;

    pub fn serialize<S: Serializer>(atomic: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_amount(*atomic))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        let text = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected amount, got {}",
                    other
                )))
            }
        };
        parse_amount(&text).map_err(serde::de::Error::custom)
    }
}

/// Like [`serde_coin`] but writes a JSON number with the exact decimal
/// digits, for endpoints that expect numeric amounts.
pub mod serde_coin_number {
    use super::*;
    use serde::Serialize;

    pub fn serialize<S: Serializer>(atomic: &u64, s: S) -> Result<S::Ok, S::Error> {
        let n: serde_json::Number = format_amount(*atomic)
            .parse()
            .map_err(serde::ser::Error::custom)?;
        n.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        serde_coin::deserialize(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(100_000_000), "1");
        assert_eq!(format_amount(123_456_789), "1.23456789");
        assert_eq!(format_amount(100_000_001), "1.00000001");
        assert_eq!(format_amount(50_000_000), "0.5");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("0"), Ok(0));
        assert_eq!(parse_amount("1.0"), Ok(100_000_000));
        assert_eq!(parse_amount("1.23456789"), Ok(123_456_789));
        assert_eq!(parse_amount("0.5"), Ok(50_000_000));
        assert_eq!(parse_amount(".5"), Ok(50_000_000));
        assert_eq!(parse_amount("100"), Ok(10_000_000_000));
        assert_eq!(parse_amount(" 2. "), Ok(200_000_000));
    }

    #[test]
    fn test_parse_amount_rejects() {
        assert_eq!(parse_amount(""), Err(AmountError::Empty));
        assert!(matches!(parse_amount("."), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_amount("-1"), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_amount("1e-8"), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_amount("0.000000001"), Err(AmountError::TooPrecise(_))));
        assert!(matches!(parse_amount("184467440738"), Err(AmountError::Overflow(_))));
    }

    #[test]
    fn test_decimal_is_exact() {
        // 0.1 + 0.2 is exactly 0.3 in atomic units.
        let sum = parse_amount("0.1").unwrap() + parse_amount("0.2").unwrap();
        assert_eq!(sum, parse_amount("0.3").unwrap());
    }

    #[derive(Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "serde_coin")]
        amount: u64,
    }

    #[test]
    fn test_serde_coin_number_and_string() {
        let h: Holder = serde_json::from_str(r#"{"amount": 0.1}"#).unwrap();
        assert_eq!(h.amount, 10_000_000);
        let h: Holder = serde_json::from_str(r#"{"amount": "12.5"}"#).unwrap();
        assert_eq!(h.amount, 1_250_000_000);
        let h: Holder = serde_json::from_str(r#"{"amount": 7}"#).unwrap();
        assert_eq!(h.amount, 700_000_000);
        assert_eq!(serde_json::to_string(&h).unwrap(), r#"{"amount":"7"}"#);
    }

    #[derive(Serialize, Deserialize)]
    struct NumericHolder {
        #[serde(with = "serde_coin_number")]
        amount: u64,
    }

    #[test]
    fn test_serde_coin_number_is_exact() {
        let h = NumericHolder {
            amount: 2_100_000_000_000_001,
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"amount":21000000.00000001}"#);
        let back: NumericHolder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.amount, h.amount);
    }

    #[test]
    fn test_serde_coin_rejects_bool() {
        let r: Result<Holder, _> = serde_json::from_str(r#"{"amount": true}"#);
        assert!(r.is_err());
    }
}
