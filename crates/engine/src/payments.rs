//! Payment primitives.
//!
//! Payments are append-only from the engine's point of view: recording
//! inserts a row, and nothing here updates or deletes one. `invid` is a
//! plain attribute - a payment against a header that no longer exists is an
//! unusual but legal data state.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Store-assigned identifier.
    pub payment_id: i64,
    pub invoice_id: i64,
    /// Human-readable label ("Visa", "Check", ...), not a key into a
    /// payment-type catalog.
    pub payment_type: String,
    /// May exceed the remaining balance; an overpayment is a credit, not an
    /// error.
    pub amount: MoneyCents,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// A payment as entered, before the store assigns its identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentDraft {
    pub payment_type: String,
    pub amount: MoneyCents,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoice_payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub payment_id: i64,
    pub invid: i64,
    pub payment_type: String,
    pub amount_minor: i64,
    pub payment_date: Date,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl PaymentDraft {
    pub(crate) fn as_row(&self, invoice_id: i64) -> ActiveModel {
        ActiveModel {
            payment_id: ActiveValue::NotSet,
            invid: ActiveValue::Set(invoice_id),
            payment_type: ActiveValue::Set(self.payment_type.clone()),
            amount_minor: ActiveValue::Set(self.amount.cents()),
            payment_date: ActiveValue::Set(self.payment_date),
            reference: ActiveValue::Set(self.reference.clone()),
            notes: ActiveValue::Set(self.notes.clone()),
        }
    }
}

impl From<Model> for Payment {
    fn from(model: Model) -> Self {
        Self {
            payment_id: model.payment_id,
            invoice_id: model.invid,
            payment_type: model.payment_type,
            amount: MoneyCents::new(model.amount_minor),
            payment_date: model.payment_date,
            reference: model.reference,
            notes: model.notes,
        }
    }
}
