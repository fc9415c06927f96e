//! Data models for observed and mirrored swaps.

mod swap;

pub use swap::{ObservedSwap, SwapRecord, SwapStatus, SwapType, TokenTransfer};
