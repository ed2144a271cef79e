use std::sync::Arc;

use chrono::{Days, NaiveDate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use accounts::Account;
pub use error::EngineError;
pub use headers::{DocType, InvoiceHeader};
pub use keys::{HEADER_ID_FLOOR, KeyAllocator, LINE_KEY_FLOOR, MaxScanAllocator};
pub use line_items::{LineItem, LineItemFields};
pub use money::MoneyCents;
pub use payments::{Payment, PaymentDraft};
pub use reconcile::ReconcileOutcome;
pub use session::{InvoiceSession, NavigateOutcome, SaveStatus, SessionPhase};
pub use totals::{
    InvoiceTotals, Subtotal, amount_due, grand_total, invoice_totals, payments_total, subtotal,
};

mod accounts;
mod error;
mod headers;
mod keys;
mod line_items;
mod money;
mod payments;
mod reconcile;
pub mod reference;
mod session;
mod totals;

type ResultEngine<T> = Result<T, EngineError>;

/// Navigation target relative to the currently loaded invoice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    First,
    Last,
    Next,
    Prev,
}

/// One invoice on the books past its Net-30 due date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PastDueInvoice {
    pub ivd: i64,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub amount_due: MoneyCents,
}

/// The invoice ledger engine.
///
/// Stateless over the store: every operation talks to the database and
/// returns owned values. Working state for an open invoice lives in
/// [`InvoiceSession`], which owns it exclusively. The store itself is
/// shared, unsynchronized external state - the engine takes no locks
/// against it and header/line-item updates are last-writer-wins.
#[derive(Clone)]
pub struct Engine {
    database: DatabaseConnection,
    keys: Arc<dyn KeyAllocator>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Fetch one header by invoice id.
    pub async fn invoice(&self, ivd: i64) -> ResultEngine<InvoiceHeader> {
        let model = headers::Entity::find_by_id(ivd)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("invoice {ivd}")))?;
        InvoiceHeader::try_from(model)
    }

    /// Fetch the line items persisted under an invoice, ordered by line
    /// key. An invoice with no line items is a normal state, not an error.
    pub async fn line_items(&self, ivd: i64) -> ResultEngine<Vec<LineItem>> {
        let models = line_items::Entity::find()
            .filter(line_items::Column::Ivd.eq(ivd))
            .order_by_asc(line_items::Column::LineKey)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(LineItem::from).collect())
    }

    /// Fetch the payments recorded against an invoice, newest first.
    pub async fn payments(&self, ivd: i64) -> ResultEngine<Vec<Payment>> {
        let models = payments::Entity::find()
            .filter(payments::Column::Invid.eq(ivd))
            .order_by_desc(payments::Column::PaymentDate)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Payment::from).collect())
    }

    /// Fetch the account a header references. `invoice_headers` carries the
    /// number as a plain attribute, so a dangling reference is answered
    /// with `None` rather than an error.
    pub async fn account(&self, account_number: i64) -> ResultEngine<Option<Account>> {
        let model = accounts::Entity::find_by_id(account_number)
            .one(&self.database)
            .await?;
        Ok(model.map(Account::from))
    }

    /// Persist a new header under a freshly allocated invoice id and return
    /// it. The draft's `ivd` is ignored.
    ///
    /// Allocation is max-scan (see [`MaxScanAllocator`]); a concurrent
    /// creator can race us to the same id, in which case the insert is
    /// retried once with a fresh allocation before the collision is
    /// surfaced.
    pub async fn create_invoice(&self, draft: InvoiceHeader) -> ResultEngine<InvoiceHeader> {
        let mut header = draft;
        header.ivd = self.keys.next_header_id(&self.database).await?;

        for attempt in 0..2 {
            let row = headers::ActiveModel::from(&header);
            match headers::Entity::insert(row).exec(&self.database).await {
                Ok(_) => {
                    debug!(ivd = header.ivd, "created invoice header");
                    return Ok(header);
                }
                Err(err) if is_unique_violation(&err) && attempt == 0 => {
                    header.ivd = self.keys.next_header_id(&self.database).await?;
                }
                Err(err) if is_unique_violation(&err) => {
                    return Err(EngineError::IdentifierCollision {
                        table: "invoice_headers",
                        key: header.ivd,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
        unreachable!("insert loop returns on every branch")
    }

    /// Full-field update of an existing header, keyed by `ivd`.
    pub async fn update_header(&self, header: &InvoiceHeader) -> ResultEngine<()> {
        let mut row = headers::ActiveModel::from(header);
        row.ivd = sea_orm::ActiveValue::NotSet;
        let result = headers::Entity::update_many()
            .set(row)
            .filter(headers::Column::Ivd.eq(header.ivd))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::NotFound(format!("invoice {}", header.ivd)));
        }
        Ok(())
    }

    /// Reconcile the persisted line items of an invoice against a desired
    /// set: one delete for the orphaned keys (strictly first), full-field
    /// updates for kept rows, inserts with freshly allocated keys for
    /// drafts, then a re-fetch that becomes the new source of truth.
    pub async fn reconcile_line_items(
        &self,
        ivd: i64,
        desired: &[LineItem],
    ) -> ResultEngine<ReconcileOutcome> {
        reconcile::reconcile(&self.database, self.keys.as_ref(), ivd, desired).await
    }

    /// Persist header edits, then reconcile the edited line-item set.
    ///
    /// The two steps are each all-or-nothing but **not** atomic together:
    /// the header patch can land and the reconciliation still fail. Callers
    /// distinguish the cases by the error
    /// ([`EngineError::NotFound`]/[`EngineError::Store`] before any line
    /// item moved, [`EngineError::ReconciliationIncomplete`] after).
    pub async fn save_invoice(
        &self,
        header: &InvoiceHeader,
        items: &[LineItem],
    ) -> ResultEngine<ReconcileOutcome> {
        self.update_header(header).await?;
        self.reconcile_line_items(header.ivd, items).await
    }

    /// Resolve a navigation intent to an invoice id. `None` means there is
    /// nothing in that direction - a normal outcome, not an error.
    pub async fn navigate_invoice(
        &self,
        direction: Direction,
        current: Option<i64>,
    ) -> ResultEngine<Option<i64>> {
        let mut query = headers::Entity::find();
        query = match direction {
            Direction::First => query.order_by_asc(headers::Column::Ivd),
            Direction::Last => query.order_by_desc(headers::Column::Ivd),
            Direction::Next => {
                let Some(current) = current else {
                    return Ok(None);
                };
                query
                    .filter(headers::Column::Ivd.gt(current))
                    .order_by_asc(headers::Column::Ivd)
            }
            Direction::Prev => {
                let Some(current) = current else {
                    return Ok(None);
                };
                query
                    .filter(headers::Column::Ivd.lt(current))
                    .order_by_desc(headers::Column::Ivd)
            }
        };
        Ok(query.one(&self.database).await?.map(|m| m.ivd))
    }

    /// Record a payment against an invoice and return it with the
    /// store-assigned identifier.
    ///
    /// The amount must be positive, but it may exceed the remaining
    /// balance: an overpayment becomes a credit, and warning about it is
    /// the caller's concern.
    pub async fn record_payment(
        &self,
        invoice_id: i64,
        draft: PaymentDraft,
    ) -> ResultEngine<Payment> {
        if !draft.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "payment amount must be greater than zero".to_string(),
            ));
        }
        let model = draft.as_row(invoice_id).insert(&self.database).await?;
        debug!(
            invoice_id,
            payment_id = model.payment_id,
            "recorded payment"
        );
        Ok(Payment::from(model))
    }

    /// Sum of amount due over every invoice of an account where that value
    /// is positive. Credits and settled invoices are excluded, never netted.
    ///
    /// One line-item fetch and one payment fetch per header - the most
    /// expensive call in the engine, issued serially to keep the store
    /// connection budget at one.
    pub async fn account_owed(&self, account_number: i64) -> ResultEngine<MoneyCents> {
        let header_models = headers::Entity::find()
            .filter(headers::Column::AccountNumber.eq(account_number))
            .all(&self.database)
            .await?;

        let mut owed = MoneyCents::ZERO;
        for model in header_models {
            let header = InvoiceHeader::try_from(model)?;
            let items = self.line_items(header.ivd).await?;
            let paid = self.payments(header.ivd).await?;
            let totals = totals::invoice_totals(&header, &items, &paid, &[]);
            if totals.amount_due.is_positive() {
                owed += totals.amount_due;
            }
        }
        debug!(account_number, owed = owed.cents(), "computed amount owed");
        Ok(owed)
    }

    /// Invoices of an account with a positive balance past their due date
    /// as of `as_of`, most overdue first.
    ///
    /// Due date is invoice date + 30 days: terms on the header are free
    /// text and the back office treats every open invoice as Net-30 here.
    /// Quotes never come due.
    pub async fn past_due_invoices(
        &self,
        account_number: i64,
        as_of: NaiveDate,
    ) -> ResultEngine<Vec<PastDueInvoice>> {
        let header_models = headers::Entity::find()
            .filter(headers::Column::AccountNumber.eq(account_number))
            .filter(headers::Column::DocType.eq(DocType::Invoice.as_str()))
            .all(&self.database)
            .await?;

        let mut past_due = Vec::new();
        for model in header_models {
            let header = InvoiceHeader::try_from(model)?;
            let items = self.line_items(header.ivd).await?;
            let paid = self.payments(header.ivd).await?;
            let totals = totals::invoice_totals(&header, &items, &paid, &[]);
            if !totals.amount_due.is_positive() {
                continue;
            }
            let due_date = header
                .invoice_date
                .checked_add_days(Days::new(30))
                .unwrap_or(header.invoice_date);
            let days_overdue = (as_of - due_date).num_days();
            if days_overdue > 0 {
                past_due.push(PastDueInvoice {
                    ivd: header.ivd,
                    invoice_date: header.invoice_date,
                    due_date,
                    days_overdue,
                    amount_due: totals.amount_due,
                });
            }
        }
        past_due.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
        Ok(past_due)
    }

    /// Open a session bound to this engine.
    pub fn session(&self) -> InvoiceSession {
        InvoiceSession::new(self.clone())
    }
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    keys: Option<Arc<dyn KeyAllocator>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Substitute the identifier allocator (defaults to
    /// [`MaxScanAllocator`]).
    pub fn key_allocator(mut self, keys: Arc<dyn KeyAllocator>) -> EngineBuilder {
        self.keys = Some(keys);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
            keys: self
                .keys
                .unwrap_or_else(|| Arc::new(MaxScanAllocator::default())),
        }
    }
}
