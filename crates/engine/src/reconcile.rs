//! Line-item reconciliation.
//!
//! Makes the persisted row set for one invoice equal a caller-supplied
//! desired set. The store gives us no cross-table transactions, so the pass
//! is ordered to fail safe: orphans are deleted first and strictly before
//! any update or insert - a retry after a partial pass can lose a row
//! transiently but can never leave a duplicate active row. Everything after
//! a successful delete step that fails is reported as
//! [`EngineError::ReconciliationIncomplete`]; the caller must re-fetch
//! before retrying, because the store no longer matches either side.

use std::collections::HashSet;

use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    SqlErr,
};
use tracing::debug;

use crate::{EngineError, KeyAllocator, LineItem, line_items};

/// What a reconciliation pass did, plus the re-fetched persisted set that
/// is now the source of truth.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// All [`LineItem::Persisted`], ordered by line key.
    pub items: Vec<LineItem>,
    pub deleted: usize,
    pub updated: usize,
    pub inserted: usize,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(crate) async fn reconcile(
    db: &DatabaseConnection,
    keys: &dyn KeyAllocator,
    invoice_id: i64,
    desired: &[LineItem],
) -> Result<ReconcileOutcome, EngineError> {
    let persisted_keys: HashSet<i64> = line_items::Entity::find()
        .filter(line_items::Column::Ivd.eq(invoice_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.line_key)
        .collect();

    // Structural partition: a draft is new by construction, a persisted
    // item keeps its durable key.
    let mut keep = Vec::new();
    let mut drafts = Vec::new();
    for item in desired {
        match item {
            LineItem::Persisted { line_key, fields } => keep.push((*line_key, fields)),
            LineItem::Draft { fields, .. } => drafts.push(fields),
        }
    }

    let kept_keys: HashSet<i64> = keep.iter().map(|(key, _)| *key).collect();
    let to_delete: Vec<i64> = persisted_keys.difference(&kept_keys).copied().collect();

    // Delete first. If this fails nothing has been touched yet and the
    // plain store error propagates.
    let deleted = to_delete.len();
    if !to_delete.is_empty() {
        line_items::Entity::delete_many()
            .filter(line_items::Column::LineKey.is_in(to_delete))
            .exec(db)
            .await?;
    }

    // Full-field updates keyed by line key. A key that vanished under us
    // (concurrent delete) matches zero rows; the terminal re-fetch reports
    // the truth rather than resurrecting the row.
    let updated = keep.len();
    for (line_key, fields) in &keep {
        let mut row = fields.as_row(*line_key, invoice_id);
        row.line_key = ActiveValue::NotSet;
        line_items::Entity::update_many()
            .set(row)
            .filter(line_items::Column::LineKey.eq(*line_key))
            .exec(db)
            .await
            .map_err(|err| EngineError::ReconciliationIncomplete {
                invoice_id,
                reason: err.to_string(),
            })?;
    }

    // One base key per pass, incremented locally per new row. A unique-key
    // violation means another allocator raced us; re-allocate once for the
    // remainder of the pass, then give up with the distinct retryable
    // error.
    let mut inserted = 0usize;
    if !drafts.is_empty() {
        let mut next_key = keys.next_line_key(db).await?;
        let mut reallocated = false;
        for fields in drafts {
            loop {
                let row = fields.as_row(next_key, invoice_id);
                match line_items::Entity::insert(row).exec(db).await {
                    Ok(_) => {
                        next_key += 1;
                        inserted += 1;
                        break;
                    }
                    Err(err) if is_unique_violation(&err) && !reallocated => {
                        reallocated = true;
                        next_key = keys.next_line_key(db).await?;
                    }
                    Err(err) if is_unique_violation(&err) => {
                        return Err(EngineError::IdentifierCollision {
                            table: "invoice_details",
                            key: next_key,
                        });
                    }
                    Err(err) => {
                        return Err(EngineError::ReconciliationIncomplete {
                            invoice_id,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
    }

    // The store, not our memory, is the new source of truth.
    let items: Vec<LineItem> = line_items::Entity::find()
        .filter(line_items::Column::Ivd.eq(invoice_id))
        .order_by_asc(line_items::Column::LineKey)
        .all(db)
        .await?
        .into_iter()
        .map(LineItem::from)
        .collect();

    debug!(invoice_id, deleted, updated, inserted, "reconciled line items");

    Ok(ReconcileOutcome {
        items,
        deleted,
        updated,
        inserted,
    })
}
