//! The module contains the errors the engine can return.
//!
//! The errors are:
//!
//! - [`Store`] for any store call that rejects or times out.
//! - [`NotFound`] when a header, account or line item does not exist.
//! - [`IdentifierCollision`] when a max-scan allocation raced another
//!   writer and the store rejected the key.
//! - [`ReconciliationIncomplete`] when a reconciliation pass stopped
//!   partway, leaving the persisted set different from both the pre-save
//!   and the desired set.
//!
//!  [`Store`]: EngineError::Store
//!  [`NotFound`]: EngineError::NotFound
//!  [`IdentifierCollision`]: EngineError::IdentifierCollision
//!  [`ReconciliationIncomplete`]: EngineError::ReconciliationIncomplete
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
///
/// Malformed quantities are deliberately absent: a line whose quantity
/// cannot be parsed contributes 0 to totals and is reported through
/// [`InvoiceTotals::malformed`](crate::InvoiceTotals), never as an error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("store unavailable: {0}")]
    Store(#[from] DbErr),
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("key {key} already taken in {table}")]
    IdentifierCollision { table: &'static str, key: i64 },
    #[error("line items for invoice {invoice_id} partially written: {reason}")]
    ReconciliationIncomplete { invoice_id: i64, reason: String },
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl EngineError {
    /// `true` when retrying the operation with a fresh allocation can
    /// succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IdentifierCollision { .. })
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Store(a), Self::Store(b)) => a.to_string() == b.to_string(),
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (
                Self::IdentifierCollision { table: ta, key: ka },
                Self::IdentifierCollision { table: tb, key: kb },
            ) => ta == tb && ka == kb,
            (
                Self::ReconciliationIncomplete {
                    invoice_id: ia,
                    reason: ra,
                },
                Self::ReconciliationIncomplete {
                    invoice_id: ib,
                    reason: rb,
                },
            ) => ia == ib && ra == rb,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            _ => false,
        }
    }
}
