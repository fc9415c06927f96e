//! Position tracker: the classify → size pipeline over a shared store.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use crate::models::ObservedSwap;

use super::{
    BalanceEstimator, Classification, Outcome, SwapClassifier, SwapStore, TradeAmount,
    TradeAmountCalculator, TrackerConfig,
};

/// Classification and sizing for one observed swap.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeDecision {
    pub classification: Outcome<Classification>,
    pub amount: Outcome<TradeAmount>,
}

impl TradeDecision {
    pub fn is_degraded(&self) -> bool {
        self.classification.is_degraded() || self.amount.is_degraded()
    }
}

/// Entry point for the ingestion and execution pipelines.
pub struct PositionTracker {
    config: TrackerConfig,
    classifier: SwapClassifier,
    calculator: TradeAmountCalculator,
    estimator: BalanceEstimator,
}

impl PositionTracker {
    pub fn new(store: Arc<dyn SwapStore>, config: TrackerConfig) -> Self {
        Self {
            classifier: SwapClassifier::new(store.clone(), config.clone()),
            calculator: TradeAmountCalculator::new(store.clone(), config.clone()),
            estimator: BalanceEstimator::new(store, config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub async fn classify(&self, swap: &ObservedSwap, wallet: &str) -> Outcome<Classification> {
        self.classifier.classify(swap, wallet).await
    }

    pub async fn compute_amount(
        &self,
        swap: &ObservedSwap,
        classification: &Classification,
    ) -> Outcome<TradeAmount> {
        self.calculator.compute_amount(swap, classification).await
    }

    pub async fn estimate_balance(&self, wallet: &str, token_address: &str) -> Outcome<Decimal> {
        self.estimator.estimate_balance(wallet, token_address).await
    }

    /// Classify `swap` and size the bot's response to it.
    ///
    /// A degraded classification still feeds the calculator (as an entry).
    pub async fn decide(&self, swap: &ObservedSwap, wallet: &str) -> TradeDecision {
        let classification = self.classify(swap, wallet).await;
        let amount = self.compute_amount(swap, classification.value()).await;
        let decision = TradeDecision {
            classification,
            amount,
        };

        info!(
            wallet = %wallet,
            swap_type = %decision.classification.value().swap_type,
            amount = %decision.amount.value(),
            degraded = decision.is_degraded(),
            "Trade decision"
        );

        decision
    }
}
