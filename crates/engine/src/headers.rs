//! Invoice header primitives.
//!
//! A header is the top-level invoice/quote record. It owns nothing at the
//! store level: line items and payments reference it by `ivd` only, with no
//! enforced relation, so a header with zero line items or with payments but
//! no lines is a legal state.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocType {
    #[default]
    Invoice,
    Quote,
}

impl DocType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "Invoice",
            Self::Quote => "Quote",
        }
    }
}

impl TryFrom<&str> for DocType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Invoice" => Ok(Self::Invoice),
            "Quote" => Ok(Self::Quote),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid document type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceHeader {
    /// Durable invoice identifier ("IVD"). 0 on a draft that has not been
    /// through [`Engine::create_invoice`](crate::Engine::create_invoice) yet.
    pub ivd: i64,
    pub account_number: i64,
    pub doc_type: DocType,
    pub invoice_date: NaiveDate,
    pub customer_po: Option<String>,
    pub terms: Option<String>,
    pub ship_method: Option<String>,
    pub salesman: Option<String>,
    pub st_name: Option<String>,
    pub st_address: Option<String>,
    pub st_city: Option<String>,
    pub st_state: Option<String>,
    pub st_zip: Option<String>,
    pub st_contact: Option<String>,
    pub st_phone: Option<String>,
    pub st_email: Option<String>,
    pub shipping_charge: MoneyCents,
    pub interest_charge: MoneyCents,
    pub comments: Option<String>,
}

impl InvoiceHeader {
    /// A fresh draft header with the creation defaults: document type
    /// `Invoice`, zero surcharges, empty free-text fields.
    pub fn draft(account_number: i64, invoice_date: NaiveDate) -> Self {
        Self {
            ivd: 0,
            account_number,
            doc_type: DocType::Invoice,
            invoice_date,
            customer_po: None,
            terms: None,
            ship_method: None,
            salesman: None,
            st_name: None,
            st_address: None,
            st_city: None,
            st_state: None,
            st_zip: None,
            st_contact: None,
            st_phone: None,
            st_email: None,
            shipping_charge: MoneyCents::ZERO,
            interest_charge: MoneyCents::ZERO,
            comments: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoice_headers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ivd: i64,
    pub account_number: i64,
    pub doc_type: String,
    pub invoice_date: Date,
    pub customer_po: Option<String>,
    pub terms: Option<String>,
    pub ship_method: Option<String>,
    pub salesman: Option<String>,
    pub st_name: Option<String>,
    pub st_address: Option<String>,
    pub st_city: Option<String>,
    pub st_state: Option<String>,
    pub st_zip: Option<String>,
    pub st_contact: Option<String>,
    pub st_phone: Option<String>,
    pub st_email: Option<String>,
    pub shipping_charge_minor: i64,
    pub interest_charge_minor: i64,
    pub comments: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&InvoiceHeader> for ActiveModel {
    fn from(header: &InvoiceHeader) -> Self {
        Self {
            ivd: ActiveValue::Set(header.ivd),
            account_number: ActiveValue::Set(header.account_number),
            doc_type: ActiveValue::Set(header.doc_type.as_str().to_string()),
            invoice_date: ActiveValue::Set(header.invoice_date),
            customer_po: ActiveValue::Set(header.customer_po.clone()),
            terms: ActiveValue::Set(header.terms.clone()),
            ship_method: ActiveValue::Set(header.ship_method.clone()),
            salesman: ActiveValue::Set(header.salesman.clone()),
            st_name: ActiveValue::Set(header.st_name.clone()),
            st_address: ActiveValue::Set(header.st_address.clone()),
            st_city: ActiveValue::Set(header.st_city.clone()),
            st_state: ActiveValue::Set(header.st_state.clone()),
            st_zip: ActiveValue::Set(header.st_zip.clone()),
            st_contact: ActiveValue::Set(header.st_contact.clone()),
            st_phone: ActiveValue::Set(header.st_phone.clone()),
            st_email: ActiveValue::Set(header.st_email.clone()),
            shipping_charge_minor: ActiveValue::Set(header.shipping_charge.cents()),
            interest_charge_minor: ActiveValue::Set(header.interest_charge.cents()),
            comments: ActiveValue::Set(header.comments.clone()),
        }
    }
}

impl TryFrom<Model> for InvoiceHeader {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            ivd: model.ivd,
            account_number: model.account_number,
            doc_type: DocType::try_from(model.doc_type.as_str())?,
            invoice_date: model.invoice_date,
            customer_po: model.customer_po,
            terms: model.terms,
            ship_method: model.ship_method,
            salesman: model.salesman,
            st_name: model.st_name,
            st_address: model.st_address,
            st_city: model.st_city,
            st_state: model.st_state,
            st_zip: model.st_zip,
            st_contact: model.st_contact,
            st_phone: model.st_phone,
            st_email: model.st_email,
            shipping_charge: MoneyCents::new(model.shipping_charge_minor),
            interest_charge: MoneyCents::new(model.interest_charge_minor),
            comments: model.comments,
        })
    }
}
