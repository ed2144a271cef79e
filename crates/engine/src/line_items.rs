//! Line item primitives.
//!
//! A line item is one ordered/shipped product row belonging to a header by
//! `ivd`. Whether a row already lives in the store is part of the type:
//! [`LineItem::Persisted`] carries the durable `line_key`, while
//! [`LineItem::Draft`] carries only a session-local id and has never been
//! written. The reconciler partitions on the variant, never on key lookups.
//!
//! `qty_ordered` is a text column and round-trips exactly, malformed input
//! included; the aggregator is the one place that parses it defensively.
//! The other quantity columns are numeric with a 0 default, never null, so
//! totals stay arithmetic-safe.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItemFields {
    pub part_number: Option<String>,
    pub description: Option<String>,
    /// Quantity ordered as entered. Text in the persisted schema; kept
    /// verbatim even when it does not parse as a number.
    pub qty_ordered: String,
    /// 0 means "not shipped yet" - totals fall back to `qty_ordered`.
    pub qty_shipped: f64,
    pub qty_backordered: f64,
    pub unit_cost: MoneyCents,
    pub unit_net: MoneyCents,
}

/// One invoice line, tagged by whether the store has assigned it a durable
/// key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItem {
    Persisted { line_key: i64, fields: LineItemFields },
    Draft { local_id: u64, fields: LineItemFields },
}

impl LineItem {
    pub fn fields(&self) -> &LineItemFields {
        match self {
            Self::Persisted { fields, .. } | Self::Draft { fields, .. } => fields,
        }
    }

    pub fn fields_mut(&mut self) -> &mut LineItemFields {
        match self {
            Self::Persisted { fields, .. } | Self::Draft { fields, .. } => fields,
        }
    }

    /// The durable key, if this row has ever been persisted.
    pub fn line_key(&self) -> Option<i64> {
        match self {
            Self::Persisted { line_key, .. } => Some(*line_key),
            Self::Draft { .. } => None,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft { .. })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoice_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub line_key: i64,
    pub ivd: i64,
    pub part_number: Option<String>,
    pub description: Option<String>,
    pub qty_ordered: String,
    pub qty_shipped: f64,
    pub qty_backordered: f64,
    pub unit_cost_minor: i64,
    pub unit_net_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl LineItemFields {
    /// Full-field row for this item under `ivd` with the given durable key.
    pub(crate) fn as_row(&self, line_key: i64, ivd: i64) -> ActiveModel {
        ActiveModel {
            line_key: ActiveValue::Set(line_key),
            ivd: ActiveValue::Set(ivd),
            part_number: ActiveValue::Set(self.part_number.clone()),
            description: ActiveValue::Set(self.description.clone()),
            qty_ordered: ActiveValue::Set(self.qty_ordered.clone()),
            qty_shipped: ActiveValue::Set(self.qty_shipped),
            qty_backordered: ActiveValue::Set(self.qty_backordered),
            unit_cost_minor: ActiveValue::Set(self.unit_cost.cents()),
            unit_net_minor: ActiveValue::Set(self.unit_net.cents()),
        }
    }
}

impl From<Model> for LineItem {
    fn from(model: Model) -> Self {
        Self::Persisted {
            line_key: model.line_key,
            fields: LineItemFields {
                part_number: model.part_number,
                description: model.description,
                qty_ordered: model.qty_ordered,
                qty_shipped: model.qty_shipped,
                qty_backordered: model.qty_backordered,
                unit_cost: MoneyCents::new(model.unit_cost_minor),
                unit_net: MoneyCents::new(model.unit_net_minor),
            },
        }
    }
}
