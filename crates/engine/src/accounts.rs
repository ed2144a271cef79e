//! Customer account lookup.
//!
//! The engine only ever reads accounts: the session shows the account a
//! loaded invoice belongs to, and the cross-invoice aggregation groups
//! headers by `account_number`. Account maintenance lives elsewhere.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_number: i64,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub terms: Option<String>,
    pub salesman: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_number: i64,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub terms: Option<String>,
    pub salesman: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            account_number: model.account_number,
            name: model.name,
            address: model.address,
            city: model.city,
            state: model.state,
            zip: model.zip,
            phone: model.phone,
            email: model.email,
            contact: model.contact,
            terms: model.terms,
            salesman: model.salesman,
        }
    }
}
