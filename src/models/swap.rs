//! Swap record model: one observed or bot-executed swap on Solana.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a swap opens a position or closes (part of) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapType {
    Entry,
    Exit,
}

impl SwapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapType::Entry => "entry",
            SwapType::Exit => "exit",
        }
    }
}

impl FromStr for SwapType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "entry" => Ok(Self::Entry),
            "exit" => Ok(Self::Exit),
            other => bail!("unknown swap type: {other}"),
        }
    }
}

impl fmt::Display for SwapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing status of a swap record.
///
/// Codes written by other producers are kept verbatim in `Other` and are
/// never matchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SwapStatus {
    #[default]
    Pending,
    Submitted,
    Completed,
    Failed,
    Other(String),
}

impl SwapStatus {
    /// Statuses an entry must carry to be matched by a later exit.
    pub const MATCHABLE: [SwapStatus; 2] = [SwapStatus::Completed, SwapStatus::Submitted];

    pub fn as_str(&self) -> &str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Submitted => "submitted",
            SwapStatus::Completed => "completed",
            SwapStatus::Failed => "failed",
            SwapStatus::Other(code) => code,
        }
    }
}

impl From<&str> for SwapStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "submitted" => Self::Submitted,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for SwapStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<SwapStatus> for String {
    fn from(status: SwapStatus) -> Self {
        status.as_str().to_string()
    }
}

/// One leg of a swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTransfer {
    /// Mint address
    pub address: String,

    #[serde(default)]
    pub symbol: String,

    /// UI amount (already scaled by the mint's decimals)
    pub amount: Decimal,
}

impl TokenTransfer {
    pub fn new(address: impl Into<String>, symbol: impl Into<String>, amount: Decimal) -> Self {
        Self {
            address: address.into(),
            symbol: symbol.into(),
            amount,
        }
    }
}

/// Persisted swap record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRecord {
    /// Record identifier; assigned on import when empty
    #[serde(default)]
    pub id: String,

    /// Wallet that performed the swap
    pub source_wallet: String,

    /// Chain identifier ("solana")
    pub source_chain: String,

    /// When the swap landed on-chain
    pub source_timestamp: DateTime<Utc>,

    /// Token given up
    pub token_in: TokenTransfer,

    /// Token received
    pub token_out: TokenTransfer,

    /// USD value at execution time
    #[serde(default)]
    pub usd_value: Option<Decimal>,

    pub swap_type: SwapType,

    /// Entry this exit closes (exits only)
    #[serde(default)]
    pub related_entry_swap_id: Option<String>,

    /// Fraction of the entry's USD value realized (exits only)
    #[serde(default)]
    pub exit_ratio: Option<Decimal>,

    /// Native amount the bot committed when it mirrored this entry
    #[serde(default)]
    pub my_position_value: Option<Decimal>,

    #[serde(default)]
    pub processed: bool,

    #[serde(default)]
    pub status: SwapStatus,
}

/// The fields of an incoming swap the decision logic needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedSwap {
    pub token_in: TokenTransfer,
    pub token_out: TokenTransfer,
    #[serde(default)]
    pub usd_value: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_parsing() {
        for status in [
            SwapStatus::Pending,
            SwapStatus::Submitted,
            SwapStatus::Completed,
            SwapStatus::Failed,
        ] {
            assert_eq!(SwapStatus::from(status.as_str()), status);
        }

        assert_eq!(SwapStatus::MATCHABLE, [SwapStatus::Completed, SwapStatus::Submitted]);
    }

    #[test]
    fn test_unknown_status_is_kept_and_not_matchable() {
        let status = SwapStatus::from("processing");
        assert_eq!(status, SwapStatus::Other("processing".to_string()));
        assert_eq!(status.as_str(), "processing");
        assert!(!SwapStatus::MATCHABLE.contains(&status));

        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#""processing""#);
        assert_eq!(serde_json::from_str::<SwapStatus>(r#""completed""#).unwrap(), SwapStatus::Completed);
    }

    #[test]
    fn test_deserialize_ingested_record() {
        let json = r#"{
            "id": "abc",
            "sourceWallet": "Wallet111",
            "sourceChain": "solana",
            "sourceTimestamp": "2024-05-01T12:00:00Z",
            "tokenIn": { "address": "So11111111111111111111111111111111111111112", "symbol": "SOL", "amount": "0.07" },
            "tokenOut": { "address": "Token111", "symbol": "TKN", "amount": 700 },
            "usdValue": 10,
            "swapType": "entry",
            "processed": true,
            "status": "completed"
        }"#;

        let record: SwapRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.token_in.amount, dec!(0.07));
        assert_eq!(record.token_out.amount, dec!(700));
        assert_eq!(record.usd_value, Some(dec!(10)));
        assert_eq!(record.swap_type, SwapType::Entry);
        assert_eq!(record.status, SwapStatus::Completed);
        assert!(record.related_entry_swap_id.is_none());
        assert!(record.my_position_value.is_none());
        assert!(record.processed);
    }

    #[test]
    fn test_observed_swap_ignores_extra_fields() {
        let json = r#"{
            "tokenIn": { "address": "Token111", "symbol": "TKN", "amount": "350" },
            "tokenOut": { "address": "So11111111111111111111111111111111111111112", "symbol": "SOL", "amount": "0.042" },
            "usdValue": "6",
            "sourceWallet": "Wallet111"
        }"#;

        let swap: ObservedSwap = serde_json::from_str(json).unwrap();
        assert_eq!(swap.token_in.amount, dec!(350));
        assert_eq!(swap.usd_value, Some(dec!(6)));
    }
}
