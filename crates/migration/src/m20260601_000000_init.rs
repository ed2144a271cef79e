//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Ledgerdesk:
//!
//! - `accounts`: customer accounts (read-only to the engine)
//! - `invoice_headers`: invoice/quote headers, keyed by `ivd`
//! - `invoice_details`: line items, keyed by `line_key` (unique across all
//!   invoices, not per invoice)
//! - `invoice_payments`: payments, keyed by a store-assigned id
//!
//! There are no foreign keys among the invoice tables and no uniqueness
//! beyond the primary keys: `ivd` on details and `invid` on payments are
//! plain attributes, and the engine handles orphaned rows as normal data.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Accounts {
    Table,
    AccountNumber,
    Name,
    Address,
    City,
    State,
    Zip,
    Phone,
    Email,
    Contact,
    Terms,
    Salesman,
}

#[derive(Iden)]
enum InvoiceHeaders {
    Table,
    Ivd,
    AccountNumber,
    DocType,
    InvoiceDate,
    CustomerPo,
    Terms,
    ShipMethod,
    Salesman,
    StName,
    StAddress,
    StCity,
    StState,
    StZip,
    StContact,
    StPhone,
    StEmail,
    ShippingChargeMinor,
    InterestChargeMinor,
    Comments,
}

#[derive(Iden)]
enum InvoiceDetails {
    Table,
    LineKey,
    Ivd,
    PartNumber,
    Description,
    QtyOrdered,
    QtyShipped,
    QtyBackordered,
    UnitCostMinor,
    UnitNetMinor,
}

#[derive(Iden)]
enum InvoicePayments {
    Table,
    PaymentId,
    Invid,
    PaymentType,
    AmountMinor,
    PaymentDate,
    Reference,
    Notes,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::AccountNumber)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Address).string())
                    .col(ColumnDef::new(Accounts::City).string())
                    .col(ColumnDef::new(Accounts::State).string())
                    .col(ColumnDef::new(Accounts::Zip).string())
                    .col(ColumnDef::new(Accounts::Phone).string())
                    .col(ColumnDef::new(Accounts::Email).string())
                    .col(ColumnDef::new(Accounts::Contact).string())
                    .col(ColumnDef::new(Accounts::Terms).string())
                    .col(ColumnDef::new(Accounts::Salesman).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Invoice headers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InvoiceHeaders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoiceHeaders::Ivd)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InvoiceHeaders::AccountNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceHeaders::DocType)
                            .string()
                            .not_null()
                            .default("Invoice"),
                    )
                    .col(ColumnDef::new(InvoiceHeaders::InvoiceDate).date().not_null())
                    .col(ColumnDef::new(InvoiceHeaders::CustomerPo).string())
                    .col(ColumnDef::new(InvoiceHeaders::Terms).string())
                    .col(ColumnDef::new(InvoiceHeaders::ShipMethod).string())
                    .col(ColumnDef::new(InvoiceHeaders::Salesman).string())
                    .col(ColumnDef::new(InvoiceHeaders::StName).string())
                    .col(ColumnDef::new(InvoiceHeaders::StAddress).string())
                    .col(ColumnDef::new(InvoiceHeaders::StCity).string())
                    .col(ColumnDef::new(InvoiceHeaders::StState).string())
                    .col(ColumnDef::new(InvoiceHeaders::StZip).string())
                    .col(ColumnDef::new(InvoiceHeaders::StContact).string())
                    .col(ColumnDef::new(InvoiceHeaders::StPhone).string())
                    .col(ColumnDef::new(InvoiceHeaders::StEmail).string())
                    .col(
                        ColumnDef::new(InvoiceHeaders::ShippingChargeMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InvoiceHeaders::InterestChargeMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(InvoiceHeaders::Comments).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoice_headers-account_number")
                    .table(InvoiceHeaders::Table)
                    .col(InvoiceHeaders::AccountNumber)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Invoice details (line items)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InvoiceDetails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoiceDetails::LineKey)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InvoiceDetails::Ivd).big_integer().not_null())
                    .col(ColumnDef::new(InvoiceDetails::PartNumber).string())
                    .col(ColumnDef::new(InvoiceDetails::Description).string())
                    // Text on purpose: ordered quantities round-trip exactly
                    // as entered, numeric or not.
                    .col(
                        ColumnDef::new(InvoiceDetails::QtyOrdered)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(InvoiceDetails::QtyShipped)
                            .double()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InvoiceDetails::QtyBackordered)
                            .double()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InvoiceDetails::UnitCostMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InvoiceDetails::UnitNetMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoice_details-ivd")
                    .table(InvoiceDetails::Table)
                    .col(InvoiceDetails::Ivd)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Invoice payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InvoicePayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoicePayments::PaymentId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InvoicePayments::Invid)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoicePayments::PaymentType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoicePayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoicePayments::PaymentDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InvoicePayments::Reference).string())
                    .col(ColumnDef::new(InvoicePayments::Notes).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoice_payments-invid")
                    .table(InvoicePayments::Table)
                    .col(InvoicePayments::Invid)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InvoicePayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InvoiceDetails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InvoiceHeaders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
