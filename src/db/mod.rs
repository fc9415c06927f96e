//! SQLite persistence for swap records.
//!
//! The decision logic only reads through [`SwapStore`]. Inserts exist for
//! the import command, standing in for the ingestion pipeline.

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::models::{SwapRecord, SwapStatus, SwapType, TokenTransfer};
use crate::tracking::SwapStore;

/// Database connection pool.
pub struct Database {
    pool: SqlitePool,
}

/// Swap row as stored. Decimals are kept as TEXT to avoid float rounding.
#[derive(Debug, Clone, sqlx::FromRow)]
struct StoredSwap {
    id: String,
    source_wallet: String,
    source_chain: String,
    source_timestamp: DateTime<Utc>,
    token_in_address: String,
    token_in_symbol: String,
    token_in_amount: String,
    token_out_address: String,
    token_out_symbol: String,
    token_out_amount: String,
    usd_value: Option<String>,
    swap_type: String,
    related_entry_swap_id: Option<String>,
    exit_ratio: Option<String>,
    my_position_value: Option<String>,
    processed: bool,
    status: String,
}

impl TryFrom<StoredSwap> for SwapRecord {
    type Error = anyhow::Error;

    fn try_from(row: StoredSwap) -> Result<Self> {
        let id = row.id;
        let decimal = |field: &str, value: &str| {
            Decimal::from_str(value).with_context(|| format!("swap {id}: invalid {field} '{value}'"))
        };
        let optional = |field: &str, value: Option<&str>| value.map(|v| decimal(field, v)).transpose();

        Ok(SwapRecord {
            token_in: TokenTransfer::new(
                row.token_in_address,
                row.token_in_symbol,
                decimal("token_in_amount", &row.token_in_amount)?,
            ),
            token_out: TokenTransfer::new(
                row.token_out_address,
                row.token_out_symbol,
                decimal("token_out_amount", &row.token_out_amount)?,
            ),
            usd_value: optional("usd_value", row.usd_value.as_deref())?,
            exit_ratio: optional("exit_ratio", row.exit_ratio.as_deref())?,
            my_position_value: optional("my_position_value", row.my_position_value.as_deref())?,
            swap_type: SwapType::from_str(&row.swap_type).with_context(|| format!("swap {id}"))?,
            status: SwapStatus::from(row.status),
            source_wallet: row.source_wallet,
            source_chain: row.source_chain,
            source_timestamp: row.source_timestamp,
            related_entry_swap_id: row.related_entry_swap_id,
            processed: row.processed,
            id,
        })
    }
}

fn decode_all(rows: Vec<StoredSwap>) -> Result<Vec<SwapRecord>> {
    rows.into_iter().map(SwapRecord::try_from).collect()
}

fn insert_query(swap: &SwapRecord) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    sqlx::query(
        r#"
        INSERT INTO swaps (
            id, source_wallet, source_chain, source_timestamp,
            token_in_address, token_in_symbol, token_in_amount,
            token_out_address, token_out_symbol, token_out_amount,
            usd_value, swap_type, related_entry_swap_id, exit_ratio,
            my_position_value, processed, status
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&swap.id)
    .bind(&swap.source_wallet)
    .bind(&swap.source_chain)
    .bind(swap.source_timestamp)
    .bind(&swap.token_in.address)
    .bind(&swap.token_in.symbol)
    .bind(swap.token_in.amount.to_string())
    .bind(&swap.token_out.address)
    .bind(&swap.token_out.symbol)
    .bind(swap.token_out.amount.to_string())
    .bind(swap.usd_value.map(|d| d.to_string()))
    .bind(swap.swap_type.as_str())
    .bind(&swap.related_entry_swap_id)
    .bind(swap.exit_ratio.map(|d| d.to_string()))
    .bind(swap.my_position_value.map(|d| d.to_string()))
    .bind(swap.processed)
    .bind(swap.status.as_str())
}

impl Database {
    /// Create a new database connection.
    ///
    /// `sqlite::memory:` URLs get a single connection that is never
    /// recycled, since each SQLite memory connection is its own database.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run all database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS swaps (
                id TEXT PRIMARY KEY,
                source_wallet TEXT NOT NULL,
                source_chain TEXT NOT NULL,
                source_timestamp TEXT NOT NULL,
                token_in_address TEXT NOT NULL,
                token_in_symbol TEXT NOT NULL DEFAULT '',
                token_in_amount TEXT NOT NULL,
                token_out_address TEXT NOT NULL,
                token_out_symbol TEXT NOT NULL DEFAULT '',
                token_out_amount TEXT NOT NULL,
                usd_value TEXT,
                swap_type TEXT NOT NULL CHECK (swap_type IN ('entry', 'exit')),
                related_entry_swap_id TEXT,
                exit_ratio TEXT,
                my_position_value TEXT,
                processed INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Indexes
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_swaps_wallet_out ON swaps(source_wallet, source_chain, token_out_address)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_swaps_wallet_in ON swaps(source_wallet, source_chain, token_in_address)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_swaps_time ON swaps(source_timestamp)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ==================== Ingestion ====================

    /// Insert a batch of swap records in one transaction.
    ///
    /// Nothing is stored if any record fails, e.g. on a duplicate id.
    pub async fn insert_swaps(&self, swaps: &[SwapRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for swap in swaps {
            insert_query(swap)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert swap {}", swap.id))?;
        }

        tx.commit().await.context("Failed to commit swaps")?;
        Ok(())
    }

    // ==================== Views ====================

    /// Most recent swaps for a wallet.
    pub async fn list_swaps(&self, wallet: &str, limit: i64) -> Result<Vec<SwapRecord>> {
        let rows = sqlx::query_as::<_, StoredSwap>(
            "SELECT * FROM swaps WHERE source_wallet = ? ORDER BY source_timestamp DESC, rowid DESC LIMIT ?",
        )
        .bind(wallet)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch swaps")?;

        decode_all(rows)
    }
}

#[async_trait]
impl SwapStore for Database {
    async fn find_latest_entry(
        &self,
        wallet: &str,
        chain: &str,
        token_address: &str,
    ) -> Result<Option<SwapRecord>> {
        let [first, second] = SwapStatus::MATCHABLE;

        let row = sqlx::query_as::<_, StoredSwap>(
            r#"
            SELECT * FROM swaps
            WHERE source_wallet = ?
              AND source_chain = ?
              AND swap_type = 'entry'
              AND token_out_address = ?
              AND processed = 1
              AND status IN (?, ?)
            ORDER BY source_timestamp DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(wallet)
        .bind(chain)
        .bind(token_address)
        .bind(first.as_str())
        .bind(second.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query entry swaps")?;

        row.map(SwapRecord::try_from).transpose()
    }

    async fn find_swap_by_id(&self, id: &str) -> Result<Option<SwapRecord>> {
        let row = sqlx::query_as::<_, StoredSwap>("SELECT * FROM swaps WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch swap")?;

        row.map(SwapRecord::try_from).transpose()
    }

    async fn find_swaps_for_token(
        &self,
        wallet: &str,
        chain: &str,
        token_address: &str,
    ) -> Result<Vec<SwapRecord>> {
        let rows = sqlx::query_as::<_, StoredSwap>(
            r#"
            SELECT * FROM swaps
            WHERE source_wallet = ?
              AND source_chain = ?
              AND (token_in_address = ? OR token_out_address = ?)
            ORDER BY source_timestamp ASC, rowid ASC
            "#,
        )
        .bind(wallet)
        .bind(chain)
        .bind(token_address)
        .bind(token_address)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch token swaps")?;

        decode_all(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::ObservedSwap;
    use crate::tracking::store::memory::*;
    use crate::tracking::{Outcome, PositionTracker, TrackerConfig};
    use rust_decimal_macros::dec;
    use tokio_test::assert_ok;

    async fn seeded(records: &[SwapRecord]) -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        assert_ok!(db.insert_swaps(records).await);
        db
    }

    #[tokio::test]
    async fn test_round_trips_a_record() {
        let mut e = entry("e1", 0, dec!(0.07), dec!(700.5), dec!(10.25));
        e.my_position_value = Some(dec!(0.07));
        let db = seeded(&[e.clone()]).await;

        let loaded = db.find_swap_by_id("e1").await.unwrap();
        assert_eq!(loaded, Some(e));
        assert!(db.find_swap_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_entry_filters_and_orders() {
        let mut pending = entry("pending", 50, dec!(0.07), dec!(700), dec!(10));
        pending.status = SwapStatus::Pending;
        let mut unprocessed = entry("unprocessed", 40, dec!(0.07), dec!(700), dec!(10));
        unprocessed.processed = false;
        let mut submitted = entry("submitted", 20, dec!(0.07), dec!(700), dec!(10));
        submitted.status = SwapStatus::Submitted;

        let db = seeded(&[
            entry("old", 0, dec!(0.07), dec!(700), dec!(10)),
            submitted,
            pending,
            unprocessed,
            exit("exit", 59, dec!(100), dec!(0.01), dec!(1)),
        ])
        .await;

        let latest = db.find_latest_entry(WALLET, "solana", TOKEN).await.unwrap();
        assert_eq!(latest.map(|s| s.id), Some("submitted".to_string()));

        assert!(db.find_latest_entry(WALLET, "ethereum", TOKEN).await.unwrap().is_none());
        assert!(db.find_latest_entry("Someone", "solana", TOKEN).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_entry_tie_prefers_later_insert() {
        let db = seeded(&[
            entry("first", 10, dec!(0.07), dec!(700), dec!(10)),
            entry("second", 10, dec!(0.07), dec!(700), dec!(10)),
        ])
        .await;

        let latest = db.find_latest_entry(WALLET, "solana", TOKEN).await.unwrap();
        assert_eq!(latest.map(|s| s.id), Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_token_history_is_chronological() {
        let db = seeded(&[
            exit("s1", 30, dec!(100), dec!(0.01), dec!(1)),
            entry("b1", 10, dec!(0.07), dec!(700), dec!(10)),
            entry("b2", 20, dec!(0.07), dec!(700), dec!(10)),
        ])
        .await;

        let ids: Vec<_> = db
            .find_swaps_for_token(WALLET, "solana", TOKEN)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["b1", "b2", "s1"]);

        let recent: Vec<_> = db.list_swaps(WALLET, 2).await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(recent, vec!["s1", "b2"]);
    }

    #[tokio::test]
    async fn test_unknown_status_counts_in_balance_but_never_matches() {
        let db = Arc::new(
            seeded(&[
                entry("b1", 0, dec!(0.07), dec!(700), dec!(10)),
                entry("b2", 10, dec!(0.07), dec!(300), dec!(10)),
            ])
            .await,
        );
        sqlx::query("UPDATE swaps SET status = 'processing' WHERE id = 'b2'")
            .execute(&db.pool)
            .await
            .unwrap();

        let loaded = db.find_swap_by_id("b2").await.unwrap().unwrap();
        assert_eq!(loaded.status, SwapStatus::Other("processing".to_string()));

        let tracker = PositionTracker::new(db.clone(), TrackerConfig::default());
        let balance = tracker.estimate_balance(WALLET, TOKEN).await;
        assert_eq!(balance, Outcome::Computed(dec!(1000)));

        // b2 is newer but not matchable, so the exit pairs with b1
        let sell = ObservedSwap {
            token_in: token(dec!(350)),
            token_out: sol(dec!(0.03)),
            usd_value: Some(dec!(5)),
        };
        let classification = tracker.classify(&sell, WALLET).await.into_value();
        assert_eq!(classification.related_entry_swap_id.as_deref(), Some("b1"));
    }

    #[tokio::test]
    async fn test_corrupt_amount_is_an_error() {
        let db = seeded(&[entry("e1", 0, dec!(0.07), dec!(700), dec!(10))]).await;
        sqlx::query("UPDATE swaps SET token_out_amount = 'lots'")
            .execute(&db.pool)
            .await
            .unwrap();

        assert!(db.find_swap_by_id("e1").await.is_err());
    }

    #[tokio::test]
    async fn test_failed_batch_stores_nothing() {
        let db = seeded(&[entry("e1", 0, dec!(0.07), dec!(700), dec!(10))]).await;

        let batch = [
            entry("e2", 1, dec!(0.07), dec!(700), dec!(10)),
            entry("e1", 2, dec!(0.07), dec!(700), dec!(10)),
        ];
        assert!(db.insert_swaps(&batch).await.is_err());

        assert!(db.find_swap_by_id("e2").await.unwrap().is_none());
        assert_eq!(db.list_swaps(WALLET, 10).await.unwrap().len(), 1);
    }
}
