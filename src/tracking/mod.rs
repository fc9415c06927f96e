//! Position tracking: entry/exit classification, trade sizing, balance estimation.

mod amount;
mod balance;
mod classifier;
pub(crate) mod config;
mod outcome;
pub(crate) mod store;
mod tracker;

pub use amount::{TradeAmount, TradeAmountCalculator};
pub use balance::BalanceEstimator;
pub use classifier::{Classification, SwapClassifier};
pub use config::TrackerConfig;
pub use outcome::{FallbackReason, Outcome};
pub use store::SwapStore;
pub use tracker::PositionTracker;
