//! Trade sizing: fixed native allocation for entries, proportional for exits.

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{ObservedSwap, SwapType};

use super::{Classification, FallbackReason, Outcome, SwapStore, TrackerConfig};

/// How much of which token the bot should trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeAmount {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub token_address: String,
}

impl TradeAmount {
    /// Mirror the observed swap's input leg unchanged.
    fn mirror(swap: &ObservedSwap) -> Self {
        Self {
            amount: swap.token_in.amount,
            token_address: swap.token_in.address.clone(),
        }
    }
}

impl fmt::Display for TradeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.normalize(), self.token_address)
    }
}

/// Computes the bot's trade size for a classified swap.
pub struct TradeAmountCalculator {
    store: Arc<dyn SwapStore>,
    config: TrackerConfig,
}

impl TradeAmountCalculator {
    pub fn new(store: Arc<dyn SwapStore>, config: TrackerConfig) -> Self {
        Self { store, config }
    }

    /// Calculate the amount to trade in response to `swap`.
    ///
    /// Every failure path degrades to mirroring the observed swap's input
    /// amount and token.
    pub async fn compute_amount(
        &self,
        swap: &ObservedSwap,
        classification: &Classification,
    ) -> Outcome<TradeAmount> {
        let outcome = match classification.swap_type {
            SwapType::Entry => self.entry_amount(swap),
            SwapType::Exit => self.exit_amount(swap, classification).await,
        };

        match &outcome {
            Outcome::Computed(amount) => {
                debug!(swap_type = %classification.swap_type, amount = %amount, "Computed trade amount");
            }
            Outcome::Degraded { value, reason } => {
                warn!(
                    swap_type = %classification.swap_type,
                    amount = %value,
                    %reason,
                    "Trade amount fell back to observed input"
                );
            }
        }

        outcome
    }

    /// Entries always commit the fixed native amount.
    ///
    /// When the wallet sold a token for SOL, the fixed amount is converted
    /// to token units at the swap's own rate (`token_in / token_out`).
    fn entry_amount(&self, swap: &ObservedSwap) -> Outcome<TradeAmount> {
        let fixed = self.config.fixed_entry_amount;

        // The target token identity is always the observed input leg.
        let token_address = swap.token_in.address.clone();

        if self.config.is_native(&swap.token_in) {
            return Outcome::Computed(TradeAmount {
                amount: fixed,
                token_address,
            });
        }

        let native_leg = swap.token_out.amount;
        if native_leg <= Decimal::ZERO {
            return Outcome::degraded(TradeAmount::mirror(swap), FallbackReason::DegenerateRate);
        }

        let scaled = swap
            .token_in
            .amount
            .checked_div(native_leg)
            .and_then(|tokens_per_sol| fixed.checked_mul(tokens_per_sol));

        match scaled {
            Some(amount) => Outcome::Computed(TradeAmount {
                amount,
                token_address,
            }),
            None => Outcome::degraded(TradeAmount::mirror(swap), FallbackReason::ArithmeticOverflow),
        }
    }

    /// Exits sell `my_position_value * exit_ratio` of the related entry.
    async fn exit_amount(
        &self,
        swap: &ObservedSwap,
        classification: &Classification,
    ) -> Outcome<TradeAmount> {
        let Some(entry_id) = classification.related_entry_swap_id.as_deref() else {
            return Outcome::degraded(TradeAmount::mirror(swap), FallbackReason::MissingEntryReference);
        };

        let entry = match self.store.find_swap_by_id(entry_id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                return Outcome::degraded(
                    TradeAmount::mirror(swap),
                    FallbackReason::MissingEntry(entry_id.to_string()),
                );
            }
            Err(e) => {
                return Outcome::degraded(TradeAmount::mirror(swap), FallbackReason::store(e));
            }
        };

        let position = entry
            .my_position_value
            .unwrap_or(self.config.fixed_entry_amount);
        let ratio = classification.exit_ratio.unwrap_or(Decimal::ONE);

        match position.checked_mul(ratio) {
            Some(amount) => Outcome::Computed(TradeAmount {
                amount,
                token_address: swap.token_in.address.clone(),
            }),
            None => Outcome::degraded(TradeAmount::mirror(swap), FallbackReason::ArithmeticOverflow),
        }
    }
}
