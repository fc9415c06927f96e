//! Tracker configuration.

use anyhow::{ensure, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::TokenTransfer;

/// Wrapped SOL mint, used as the native-asset placeholder address.
pub const NATIVE_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Configuration for entry/exit detection and trade sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Native amount committed to every mirrored entry
    pub fixed_entry_amount: Decimal,

    /// Only chain whose records are queried
    pub chain: String,

    /// Mint address that identifies the native asset
    pub native_mint: String,

    /// Symbol that identifies the native asset
    pub native_symbol: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            fixed_entry_amount: dec!(0.07), // 0.07 SOL per entry
            chain: "solana".to_string(),
            native_mint: NATIVE_SOL_MINT.to_string(),
            native_symbol: "SOL".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Default config with a different entry allocation.
    pub fn with_fixed_entry_amount(amount: Decimal) -> Result<Self> {
        let config = Self {
            fixed_entry_amount: amount,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.fixed_entry_amount > Decimal::ZERO,
            "fixed entry amount must be positive, got {}",
            self.fixed_entry_amount
        );
        ensure!(!self.chain.is_empty(), "chain identifier must not be empty");
        Ok(())
    }

    /// Whether a swap leg is the chain's native asset.
    pub fn is_native(&self, transfer: &TokenTransfer) -> bool {
        transfer.symbol == self.native_symbol || transfer.address == self.native_mint
    }
}
