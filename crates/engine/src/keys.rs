//! Durable identifier allocation.
//!
//! The store exposes no sequences, so new header ids and line keys are
//! derived by reading the current maximum and adding one. Two callers that
//! allocate from the same table at the same time can both read the same
//! maximum and hand out the same key; the store then rejects the second
//! insert with a unique-key violation, which the engine surfaces as
//! [`EngineError::IdentifierCollision`] and retries once with a fresh
//! allocation. This race is an inherited property of the store contract,
//! not a bug to lock away here - a store with real sequences can provide
//! its own [`KeyAllocator`] and the rest of the engine is unaffected.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};

use crate::{EngineError, headers, line_items};

/// Lowest header id ever issued. Legacy data starts above this.
pub const HEADER_ID_FLOOR: i64 = 486_760;
/// Lowest line key ever issued. Line keys are unique across all invoices,
/// not per invoice.
pub const LINE_KEY_FLOOR: i64 = 1_650_000;

/// Hands out the next durable identifier for a table.
///
/// Implementations are free to be racy (max-scan) or atomic (sequences);
/// callers must treat a unique-key violation on insert as retryable either
/// way.
#[async_trait]
pub trait KeyAllocator: Send + Sync {
    /// Next id for `invoice_headers`.
    async fn next_header_id(&self, db: &DatabaseConnection) -> Result<i64, EngineError>;

    /// Next key for `invoice_details`. A reconciliation pass calls this
    /// once and increments locally for every new row in the pass.
    async fn next_line_key(&self, db: &DatabaseConnection) -> Result<i64, EngineError>;
}

/// The inherited strategy: read the current maximum key, return max + 1,
/// empty table means the floor.
#[derive(Clone, Copy, Debug)]
pub struct MaxScanAllocator {
    pub header_floor: i64,
    pub line_floor: i64,
}

impl Default for MaxScanAllocator {
    fn default() -> Self {
        Self {
            header_floor: HEADER_ID_FLOOR,
            line_floor: LINE_KEY_FLOOR,
        }
    }
}

#[async_trait]
impl KeyAllocator for MaxScanAllocator {
    async fn next_header_id(&self, db: &DatabaseConnection) -> Result<i64, EngineError> {
        let top = headers::Entity::find()
            .order_by_desc(headers::Column::Ivd)
            .one(db)
            .await?;
        Ok(top.map_or(self.header_floor, |m| m.ivd) + 1)
    }

    async fn next_line_key(&self, db: &DatabaseConnection) -> Result<i64, EngineError> {
        let top = line_items::Entity::find()
            .order_by_desc(line_items::Column::LineKey)
            .one(db)
            .await?;
        Ok(top.map_or(self.line_floor, |m| m.line_key) + 1)
    }
}
