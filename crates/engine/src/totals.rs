//! Derived invoice totals.
//!
//! Pure functions, no I/O: the session and the cross-invoice aggregation
//! both feed already-fetched rows through here. All accumulation happens in
//! [`MoneyCents`]; the only rounding is the per-line extension of quantity
//! times unit price.

use crate::{InvoiceHeader, LineItem, MoneyCents, Payment, line_items::LineItemFields};

/// Everything the invoice screen derives from one header and its rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InvoiceTotals {
    pub subtotal: MoneyCents,
    pub grand_total: MoneyCents,
    pub total_payments: MoneyCents,
    /// Negative means the customer holds a credit; it is never clamped.
    pub amount_due: MoneyCents,
    /// Indexes (into the line-item slice) of rows whose quantity could not
    /// be parsed and therefore contributed 0. A warning for the caller, not
    /// an error: one bad row never aborts the aggregation.
    pub malformed: Vec<usize>,
}

/// Subtotal plus the rows that could not be counted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subtotal {
    pub amount: MoneyCents,
    pub malformed: Vec<usize>,
}

/// Effective quantity of a line.
///
/// A non-zero `qty_shipped` wins. Zero means the line has not shipped, so
/// the ordered quantity (text, possibly hand-edited) is parsed permissively
/// instead. Returns the quantity and whether the row had to be flagged.
fn effective_quantity(fields: &LineItemFields) -> (f64, bool) {
    if fields.qty_shipped != 0.0 && fields.qty_shipped.is_finite() {
        return (fields.qty_shipped, false);
    }
    let raw = fields.qty_ordered.trim();
    if raw.is_empty() {
        return (0.0, false);
    }
    match raw.parse::<f64>() {
        Ok(qty) if qty.is_finite() => (qty, false),
        _ => (0.0, true),
    }
}

/// Sum of line extensions (effective quantity x unit net).
pub fn subtotal(items: &[LineItem]) -> Subtotal {
    let mut amount = MoneyCents::ZERO;
    let mut malformed = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let fields = item.fields();
        let (qty, flagged) = effective_quantity(fields);
        if flagged {
            malformed.push(index);
        }
        amount += fields.unit_net.extend(qty);
    }
    Subtotal { amount, malformed }
}

/// Subtotal plus surcharges plus whatever extra fees the caller carries
/// (card-processing fees and the like - a list, not a fixed schema).
pub fn grand_total(
    subtotal: MoneyCents,
    shipping_charge: MoneyCents,
    interest_charge: MoneyCents,
    extra_fees: &[MoneyCents],
) -> MoneyCents {
    subtotal + shipping_charge + interest_charge + extra_fees.iter().sum()
}

/// Sum of all payments recorded against one invoice.
pub fn payments_total(payments: &[Payment]) -> MoneyCents {
    payments.iter().map(|p| p.amount).sum()
}

/// Grand total minus payments. Negative is a legitimate credit.
pub fn amount_due(grand_total: MoneyCents, total_payments: MoneyCents) -> MoneyCents {
    grand_total - total_payments
}

/// Composes the full derivation for one invoice.
pub fn invoice_totals(
    header: &InvoiceHeader,
    items: &[LineItem],
    payments: &[Payment],
    extra_fees: &[MoneyCents],
) -> InvoiceTotals {
    let Subtotal { amount, malformed } = subtotal(items);
    let grand = grand_total(
        amount,
        header.shipping_charge,
        header.interest_charge,
        extra_fees,
    );
    let paid = payments_total(payments);
    InvoiceTotals {
        subtotal: amount,
        grand_total: grand,
        total_payments: paid,
        amount_due: amount_due(grand, paid),
        malformed,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn item(qty_ordered: &str, qty_shipped: f64, unit_net_cents: i64) -> LineItem {
        LineItem::Draft {
            local_id: 0,
            fields: LineItemFields {
                qty_ordered: qty_ordered.to_string(),
                qty_shipped,
                unit_net: MoneyCents::new(unit_net_cents),
                ..Default::default()
            },
        }
    }

    fn payment(cents: i64) -> Payment {
        Payment {
            payment_id: 1,
            invoice_id: 486_761,
            payment_type: "Check".to_string(),
            amount: MoneyCents::new(cents),
            payment_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            reference: None,
            notes: None,
        }
    }

    #[test]
    fn subtotal_uses_shipped_then_ordered() {
        // 3 x 10.00 shipped, plus 2 x 5.50 where only the ordered quantity
        // is known.
        let items = [item("3", 3.0, 1000), item("2", 0.0, 550)];
        let result = subtotal(&items);
        assert_eq!(result.amount, MoneyCents::new(4100));
        assert!(result.malformed.is_empty());
    }

    #[test]
    fn malformed_quantity_counts_zero_and_is_flagged() {
        let items = [item("N/A", 0.0, 999), item("2", 0.0, 550)];
        let result = subtotal(&items);
        assert_eq!(result.amount, MoneyCents::new(1100));
        assert_eq!(result.malformed, vec![0]);
    }

    #[test]
    fn empty_qty_ordered_is_zero_without_flag() {
        let items = [item("", 0.0, 999)];
        let result = subtotal(&items);
        assert_eq!(result.amount, MoneyCents::ZERO);
        assert!(result.malformed.is_empty());
    }

    #[test]
    fn grand_total_takes_a_fee_list() {
        let total = grand_total(
            MoneyCents::new(4100),
            MoneyCents::new(500),
            MoneyCents::new(0),
            &[MoneyCents::new(138)],
        );
        assert_eq!(total, MoneyCents::new(4738));
    }

    #[test]
    fn overpayment_yields_negative_amount_due() {
        let header = InvoiceHeader::draft(101, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        let totals = invoice_totals(&header, &[], &[payment(5000)], &[]);
        assert_eq!(totals.amount_due, MoneyCents::new(-5000));
    }

    #[test]
    fn one_bad_row_does_not_abort_the_derivation() {
        let header = InvoiceHeader::draft(101, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        let items = [item("N/A", 0.0, 999), item("4", 4.0, 250)];
        let totals = invoice_totals(&header, &items, &[], &[]);
        assert_eq!(totals.subtotal, MoneyCents::new(1000));
        assert_eq!(totals.malformed, vec![0]);
        assert_eq!(totals.amount_due, MoneyCents::new(1000));
    }
}
