//! Best-effort holdings estimate from a wallet's recorded swaps.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::SwapRecord;

use super::{FallbackReason, Outcome, SwapStore, TrackerConfig};

/// Replays swap history to approximate a wallet's token balance.
///
/// Only swaps present in the store are seen; transfers are not.
pub struct BalanceEstimator {
    store: Arc<dyn SwapStore>,
    config: TrackerConfig,
}

impl BalanceEstimator {
    pub fn new(store: Arc<dyn SwapStore>, config: TrackerConfig) -> Self {
        Self { store, config }
    }

    /// Estimated balance of `token_address` held by `wallet`, never negative.
    pub async fn estimate_balance(&self, wallet: &str, token_address: &str) -> Outcome<Decimal> {
        let swaps = match self
            .store
            .find_swaps_for_token(wallet, &self.config.chain, token_address)
            .await
        {
            Ok(swaps) => swaps,
            Err(e) => {
                let reason = FallbackReason::store(e);
                warn!(wallet = %wallet, token = %token_address, %reason, "Balance estimate fell back to zero");
                return Outcome::degraded(Decimal::ZERO, reason);
            }
        };

        match replay(&swaps, token_address) {
            Ok(balance) => {
                debug!(
                    wallet = %wallet,
                    token = %token_address,
                    swaps = swaps.len(),
                    balance = %balance,
                    "Estimated balance"
                );
                Outcome::Computed(balance.max(Decimal::ZERO))
            }
            Err(e) => {
                warn!(wallet = %wallet, token = %token_address, error = %e, "Balance estimate fell back to zero");
                Outcome::degraded(Decimal::ZERO, FallbackReason::ArithmeticOverflow)
            }
        }
    }
}

/// Running sum over chronologically ordered swaps: acquisitions add,
/// disposals subtract. The intermediate balance may go negative.
fn replay(swaps: &[SwapRecord], token_address: &str) -> Result<Decimal> {
    swaps.iter().try_fold(Decimal::ZERO, |balance, swap| {
        let next = if swap.token_out.address == token_address {
            balance.checked_add(swap.token_out.amount)
        } else if swap.token_in.address == token_address {
            balance.checked_sub(swap.token_in.amount)
        } else {
            Some(balance)
        };
        next.ok_or_else(|| anyhow!("balance overflow at swap {}", swap.id))
    })
}
