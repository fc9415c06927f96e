//! Entry/exit detection for observed swaps.
//!
//! A swap is an exit when the wallet is disposing of a token it previously
//! acquired through a matchable entry; everything else is an entry.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{ObservedSwap, SwapType};

use super::{FallbackReason, Outcome, SwapStore, TrackerConfig};

/// Result of classifying a swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub swap_type: SwapType,

    /// Entry this swap closes (exits only)
    pub related_entry_swap_id: Option<String>,

    /// exit USD value / entry USD value (exits only)
    pub exit_ratio: Option<Decimal>,
}

impl Classification {
    pub fn entry() -> Self {
        Self {
            swap_type: SwapType::Entry,
            related_entry_swap_id: None,
            exit_ratio: None,
        }
    }

    pub fn exit(related_entry_swap_id: String, exit_ratio: Decimal) -> Self {
        Self {
            swap_type: SwapType::Exit,
            related_entry_swap_id: Some(related_entry_swap_id),
            exit_ratio: Some(exit_ratio),
        }
    }
}

/// Classifies observed swaps against a wallet's prior entries.
pub struct SwapClassifier {
    store: Arc<dyn SwapStore>,
    config: TrackerConfig,
}

impl SwapClassifier {
    pub fn new(store: Arc<dyn SwapStore>, config: TrackerConfig) -> Self {
        Self { store, config }
    }

    /// Classify `swap`, made by `wallet`, as an entry or an exit.
    ///
    /// Never fails: a store error yields a degraded plain entry.
    pub async fn classify(&self, swap: &ObservedSwap, wallet: &str) -> Outcome<Classification> {
        let disposed = &swap.token_in;

        let latest = match self
            .store
            .find_latest_entry(wallet, &self.config.chain, &disposed.address)
            .await
        {
            Ok(latest) => latest,
            Err(e) => {
                let reason = FallbackReason::store(e);
                warn!(wallet = %wallet, token = %disposed.address, %reason, "Classification fell back to entry");
                return Outcome::degraded(Classification::entry(), reason);
            }
        };

        let Some(entry) = latest else {
            debug!(wallet = %wallet, token = %disposed.address, "No prior entry, classifying as entry");
            return Outcome::Computed(Classification::entry());
        };

        let entry_usd = entry.usd_value.unwrap_or(Decimal::ZERO);
        let exit_usd = swap.usd_value.unwrap_or(Decimal::ZERO);

        // Unknown entry value means "close the whole mirrored position".
        let ratio = if entry_usd > Decimal::ZERO {
            exit_usd.checked_div(entry_usd)
        } else {
            Some(Decimal::ONE)
        };

        let Some(ratio) = ratio else {
            let reason = FallbackReason::ArithmeticOverflow;
            warn!(wallet = %wallet, entry = %entry.id, %reason, "Classification fell back to entry");
            return Outcome::degraded(Classification::entry(), reason);
        };

        info!(
            wallet = %wallet,
            token = %disposed.address,
            entry = %entry.id,
            exit_ratio = %ratio,
            "Classified swap as exit"
        );

        Outcome::Computed(Classification::exit(entry.id, ratio))
    }
}
