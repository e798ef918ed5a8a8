//! Platform fee schedule.
//!
//! A [`FeeTierTable`] maps the total requested amount to a flat platform
//! fee. Two boundary conventions are accepted on load:
//!
//! | loader            | entry                | matches                     |
//! |-------------------|----------------------|-----------------------------|
//! | `from_less_than`  | `{"lt": x, "fee": f}` | `amount <= x`               |
//! |                   | `{"gt": x, "fee": f}` | `amount > x`                |
//! | `from_min_max`    | `{"min": a, "max": b, "fee": f}` | `a <= amount < b` |
//!
//! Both are normalised to explicit [`Tier`] bounds and validated to cover
//! `[0, u64::MAX]` exactly once: no gaps, no overlaps, first tier starting
//! at zero, last tier unbounded above.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use trmp_types::amount::{format_amount, parse_amount};

use crate::error::WalletError;

/// One side of a tier interval, in atomic units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bound {
    pub amount: u64,
    pub inclusive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// `None` means unbounded below.
    pub lower: Option<Bound>,
    /// `None` means unbounded above.
    pub upper: Option<Bound>,
    /// Atomic units.
    pub fee: u64,
}

impl Tier {
    pub fn contains(&self, amount: u64) -> bool {
        let above_lower = match self.lower {
            None => true,
            Some(b) if b.inclusive => amount >= b.amount,
            Some(b) => amount > b.amount,
        };
        let below_upper = match self.upper {
            None => true,
            Some(b) if b.inclusive => amount <= b.amount,
            Some(b) => amount < b.amount,
        };
        above_lower && below_upper
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeTierTable {
    tiers: Vec<Tier>,
}

fn opt_coin<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_amount(&s).map(Some).map_err(serde::de::Error::custom),
        Some(Value::Number(n)) => parse_amount(&n.to_string())
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected amount, got {}",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct LessThanEntry {
    #[serde(default, deserialize_with = "opt_coin")]
    lt: Option<u64>,
    #[serde(default, deserialize_with = "opt_coin")]
    gt: Option<u64>,
    #[serde(deserialize_with = "opt_coin")]
    fee: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MinMaxEntry {
    #[serde(default, deserialize_with = "opt_coin")]
    min: Option<u64>,
    #[serde(default, deserialize_with = "opt_coin")]
    max: Option<u64>,
    #[serde(deserialize_with = "opt_coin")]
    fee: Option<u64>,
}

fn invalid(msg: impl Into<String>) -> WalletError {
    WalletError::InvalidFeeTiers(msg.into())
}

impl FeeTierTable {
    /// Validate and wrap explicit tiers.
    pub fn new(tiers: Vec<Tier>) -> Result<Self, WalletError> {
        let table = Self { tiers };
        table.validate()?;
        Ok(table)
    }

    /// Load the `lt`/`gt` convention. Entries are ordered; each `lt`
    /// tier starts just above the previous one.
    pub fn from_less_than(json: &str) -> Result<Self, WalletError> {
        let entries: Vec<LessThanEntry> =
            serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;

        let mut tiers = Vec::with_capacity(entries.len());
        let mut prev_upper: Option<Bound> = None;
        for (i, entry) in entries.into_iter().enumerate() {
            let fee = entry.fee.ok_or_else(|| invalid(format!("tier {} has no fee", i)))?;
            let tier = match (entry.lt, entry.gt) {
                (Some(lt), None) => Tier {
                    lower: prev_upper.map(|b| Bound {
                        amount: b.amount,
                        inclusive: !b.inclusive,
                    }),
                    upper: Some(Bound {
                        amount: lt,
                        inclusive: true,
                    }),
                    fee,
                },
                (None, Some(gt)) => Tier {
                    lower: Some(Bound {
                        amount: gt,
                        inclusive: false,
                    }),
                    upper: None,
                    fee,
                },
                _ => return Err(invalid(format!("tier {} needs exactly one of lt/gt", i))),
            };
            prev_upper = tier.upper;
            tiers.push(tier);
        }
        Self::new(tiers)
    }

    /// Load the half-open `[min, max)` convention.
    pub fn from_min_max(json: &str) -> Result<Self, WalletError> {
        let entries: Vec<MinMaxEntry> =
            serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;

        let tiers = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let fee = entry.fee.ok_or_else(|| invalid(format!("tier {} has no fee", i)))?;
                Ok(Tier {
                    lower: entry.min.map(|amount| Bound {
                        amount,
                        inclusive: true,
                    }),
                    upper: entry.max.map(|amount| Bound {
                        amount,
                        inclusive: false,
                    }),
                    fee,
                })
            })
            .collect::<Result<Vec<_>, WalletError>>()?;
        Self::new(tiers)
    }

    /// Check contiguous, non-overlapping coverage of `[0, u64::MAX]`.
    fn validate(&self) -> Result<(), WalletError> {
        let first = self.tiers.first().ok_or_else(|| invalid("table is empty"))?;
        match first.lower {
            None => {}
            Some(Bound {
                amount: 0,
                inclusive: true,
            }) => {}
            Some(b) => {
                return Err(invalid(format!(
                    "first tier starts at {} instead of 0",
                    format_amount(b.amount)
                )))
            }
        }

        for (i, pair) in self.tiers.windows(2).enumerate() {
            let (a, b) = (&pair[0], &pair[1]);
            let upper = a
                .upper
                .ok_or_else(|| invalid(format!("tier {} is unbounded but not last", i)))?;
            let lower = b
                .lower
                .ok_or_else(|| invalid(format!("tier {} is unbounded below", i + 1)))?;
            if upper.amount != lower.amount {
                return Err(invalid(format!(
                    "tiers {} and {} leave a {} between {} and {}",
                    i,
                    i + 1,
                    if upper.amount < lower.amount { "gap" } else { "overlap" },
                    format_amount(upper.amount),
                    format_amount(lower.amount)
                )));
            }
            if upper.inclusive == lower.inclusive {
                return Err(invalid(format!(
                    "boundary {} is {} by tiers {} and {}",
                    format_amount(upper.amount),
                    if upper.inclusive { "claimed twice" } else { "claimed by neither" },
                    i,
                    i + 1
                )));
            }
            // An empty interval such as (5, 5] would make the ordering ambiguous.
            if let Some(l) = a.lower {
                if l.amount > upper.amount
                    || (l.amount == upper.amount && !(l.inclusive && upper.inclusive))
                {
                    return Err(invalid(format!("tier {} is empty", i)));
                }
            }
        }

        if let Some(last) = self.tiers.last() {
            if last.upper.is_some() {
                return Err(invalid("last tier must be unbounded above"));
            }
        }
        Ok(())
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Platform fee for a total requested amount: the first matching tier.
    pub fn app_fee(&self, amount: u64) -> u64 {
        self.tiers
            .iter()
            .find(|t| t.contains(amount))
            .map(|t| t.fee)
            .unwrap_or(0)
    }

    /// Number of tiers containing `amount`. Exactly one for a valid table.
    pub fn matching_tiers(&self, amount: u64) -> usize {
        self.tiers.iter().filter(|t| t.contains(amount)).count()
    }
}

/// Deployment schedule, in the `lt`/`gt` convention.
pub const DEFAULT_FEE_TIERS_JSON: &str = r#"[
    {"lt": 1, "fee": 0.01},
    {"lt": 50, "fee": 0.1},
    {"lt": 500, "fee": 3},
    {"lt": 5000, "fee": 30},
    {"lt": 10000, "fee": 300},
    {"lt": 20000000, "fee": 2000},
    {"lt": 100000000, "fee": 8000},
    {"gt": 100000000, "fee": 10000}
]"#;

impl Default for FeeTierTable {
    fn default() -> Self {
        const COIN: u64 = trmp_types::COIN;
        let le = |amount: u64| Bound {
            amount,
            inclusive: true,
        };
        let gt = |amount: u64| Bound {
            amount,
            inclusive: false,
        };
        let steps: [(u64, u64); 7] = [
            (COIN, COIN / 100),
            (50 * COIN, COIN / 10),
            (500 * COIN, 3 * COIN),
            (5_000 * COIN, 30 * COIN),
            (10_000 * COIN, 300 * COIN),
            (20_000_000 * COIN, 2_000 * COIN),
            (100_000_000 * COIN, 8_000 * COIN),
        ];
        let mut tiers = Vec::with_capacity(steps.len() + 1);
        let mut lower = None;
        for (upper, fee) in steps {
            tiers.push(Tier {
                lower: lower.map(gt),
                upper: Some(le(upper)),
                fee,
            });
            lower = Some(upper);
        }
        tiers.push(Tier {
            lower: lower.map(gt),
            upper: None,
            fee: 10_000 * COIN,
        });
        Self { tiers }
    }
}

impl<'de> Deserialize<'de> for FeeTierTable {
    /// Accepts either convention; `lt`/`gt` entries are tried first.
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        let text = value.to_string();
        let uses_min_max = value
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .any(|e| e.get("min").is_some() || e.get("max").is_some())
            })
            .unwrap_or(false);
        let table = if uses_min_max {
            Self::from_min_max(&text)
        } else {
            Self::from_less_than(&text)
        };
        table.map_err(serde::de::Error::custom)
    }
}
