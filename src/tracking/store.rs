//! Read interface over persisted swap records.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::SwapRecord;

/// Queries the decision logic runs against the swap store.
///
/// Implementations break `source_timestamp` ties by insertion order: the
/// later-inserted record counts as more recent.
#[async_trait]
pub trait SwapStore: Send + Sync {
    /// Most recent entry for `wallet` on `chain` that acquired `token_address`
    /// and is eligible to be matched by an exit (processed, completed or
    /// submitted).
    async fn find_latest_entry(
        &self,
        wallet: &str,
        chain: &str,
        token_address: &str,
    ) -> Result<Option<SwapRecord>>;

    /// Fetch a single record by id.
    async fn find_swap_by_id(&self, id: &str) -> Result<Option<SwapRecord>>;

    /// Every swap by `wallet` on `chain` that moved `token_address`, oldest first.
    async fn find_swaps_for_token(
        &self,
        wallet: &str,
        chain: &str,
        token_address: &str,
    ) -> Result<Vec<SwapRecord>>;
}
