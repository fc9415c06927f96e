//! Result type for operations that always produce a value.

use thiserror::Error;

/// Why an operation fell back to its safe default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackReason {
    #[error("store query failed: {0}")]
    StoreQuery(String),

    #[error("related entry swap {0} not found")]
    MissingEntry(String),

    #[error("exit has no related entry swap")]
    MissingEntryReference,

    #[error("native leg amount is not positive")]
    DegenerateRate,

    #[error("decimal overflow")]
    ArithmeticOverflow,
}

impl FallbackReason {
    pub(crate) fn store(err: anyhow::Error) -> Self {
        Self::StoreQuery(format!("{err:#}"))
    }
}

/// A computed value, or the fallback that was used instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Computed(T),
    Degraded { value: T, reason: FallbackReason },
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, reason: FallbackReason) -> Self {
        Self::Degraded { value, reason }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Computed(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Computed(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Outcome::Computed(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }
}
