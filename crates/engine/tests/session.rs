use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Direction, DocType, Engine, EngineError, InvoiceHeader, LineItemFields, MoneyCents,
    NavigateOutcome, PaymentDraft, SaveStatus, SessionPhase,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO accounts (account_number, name) VALUES (?, ?)",
        vec![101i64.into(), "Lou's Music".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder().database(db.clone()).build();
    (engine, db)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn line(part: &str, qty: &str, unit_net_cents: i64) -> LineItemFields {
    LineItemFields {
        part_number: Some(part.to_string()),
        qty_ordered: qty.to_string(),
        unit_net: MoneyCents::new(unit_net_cents),
        ..Default::default()
    }
}

fn check(cents: i64, on: NaiveDate) -> PaymentDraft {
    PaymentDraft {
        payment_type: "Check".to_string(),
        amount: MoneyCents::new(cents),
        payment_date: on,
        reference: None,
        notes: None,
    }
}

#[tokio::test]
async fn load_missing_invoice_reports_not_found() {
    let (engine, _db) = engine_with_db().await;
    let mut session = engine.session();

    let err = session.load(999_999).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("invoice 999999".to_string()));
    assert_eq!(session.phase(), SessionPhase::Empty);
}

#[tokio::test]
async fn create_edit_save_round_trip() {
    let (engine, _db) = engine_with_db().await;
    let mut session = engine.session();

    let ivd = session
        .create(InvoiceHeader::draft(101, date(2026, 3, 1)))
        .await
        .unwrap();
    assert_eq!(session.phase(), SessionPhase::Loaded);
    assert_eq!(session.account().unwrap().name, "Lou's Music");
    assert!(session.items().unwrap().is_empty());

    session.begin_edit().unwrap();
    assert_eq!(session.phase(), SessionPhase::Editing);
    {
        let header = session.header_mut().unwrap();
        header.customer_po = Some("PO-7781".to_string());
        header.shipping_charge = MoneyCents::new(500);
    }
    session.add_line(line("PICK-01", "10", 50)).unwrap();
    session.add_line(line("CABLE-20", "2", 1999)).unwrap();

    session.save().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Loaded);
    assert_eq!(session.save_status(), SaveStatus::Saved);
    assert_eq!(session.header().unwrap().customer_po.as_deref(), Some("PO-7781"));
    assert_eq!(session.items().unwrap().len(), 2);
    assert!(session.items().unwrap().iter().all(|i| !i.is_draft()));

    // 10 x 0.50 + 2 x 19.99 + 5.00 shipping.
    let totals = session.totals(&[]).unwrap();
    assert_eq!(totals.subtotal, MoneyCents::new(4498));
    assert_eq!(totals.grand_total, MoneyCents::new(4998));
    assert_eq!(totals.amount_due, MoneyCents::new(4998));

    // The save survives a fresh load.
    let mut other = engine.session();
    other.load(ivd).await.unwrap();
    assert_eq!(other.items().unwrap().len(), 2);
}

#[tokio::test]
async fn editing_is_local_until_save() {
    let (engine, _db) = engine_with_db().await;
    let mut session = engine.session();
    let ivd = session
        .create(InvoiceHeader::draft(101, date(2026, 3, 1)))
        .await
        .unwrap();

    session.begin_edit().unwrap();
    session.add_line(line("PICK-01", "10", 50)).unwrap();

    // Nothing hits the store before save().
    assert!(engine.line_items(ivd).await.unwrap().is_empty());

    session.discard_edits();
    assert_eq!(session.phase(), SessionPhase::Loaded);
    assert!(session.items().unwrap().is_empty());
}

#[tokio::test]
async fn navigate_past_the_boundary_is_a_noop() {
    let (engine, _db) = engine_with_db().await;
    let mut session = engine.session();

    let first = session
        .create(InvoiceHeader::draft(101, date(2026, 3, 1)))
        .await
        .unwrap();
    let last = session
        .create(InvoiceHeader::draft(101, date(2026, 3, 2)))
        .await
        .unwrap();

    session.load(last).await.unwrap();
    let outcome = session.navigate(Direction::Next).await.unwrap();
    assert_eq!(outcome, NavigateOutcome::AtBoundary);
    assert_eq!(session.header().unwrap().ivd, last);
    assert_eq!(session.phase(), SessionPhase::Loaded);

    let outcome = session.navigate(Direction::Prev).await.unwrap();
    assert_eq!(outcome, NavigateOutcome::Moved(first));
    assert_eq!(session.header().unwrap().ivd, first);

    let outcome = session.navigate(Direction::Prev).await.unwrap();
    assert_eq!(outcome, NavigateOutcome::AtBoundary);

    let outcome = session.navigate(Direction::Last).await.unwrap();
    assert_eq!(outcome, NavigateOutcome::Moved(last));
}

#[tokio::test]
async fn reconcile_failure_keeps_edits_for_retry() {
    let (engine, db) = engine_with_db().await;
    let mut session = engine.session();
    session
        .create(InvoiceHeader::draft(101, date(2026, 3, 1)))
        .await
        .unwrap();

    session.begin_edit().unwrap();
    session.add_line(line("PICK-01", "10", 50)).unwrap();

    // Break the line-item table so the header patch lands but
    // reconciliation cannot.
    let backend = db.get_database_backend();
    db.execute(Statement::from_string(
        backend,
        "DROP TABLE invoice_details".to_string(),
    ))
    .await
    .unwrap();

    let err = session.save().await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert_eq!(session.save_status(), SaveStatus::ReconcileFailed);
    // Edits are retained so the user can retry.
    assert_eq!(session.phase(), SessionPhase::Editing);
    assert_eq!(session.items().unwrap().len(), 1);
}

#[tokio::test]
async fn overpayment_becomes_a_credit() {
    let (engine, _db) = engine_with_db().await;
    let mut session = engine.session();
    let ivd = session
        .create(InvoiceHeader::draft(101, date(2026, 3, 1)))
        .await
        .unwrap();

    let payment = engine
        .record_payment(ivd, check(5000, date(2026, 3, 2)))
        .await
        .unwrap();
    assert!(payment.payment_id > 0);

    session.load(ivd).await.unwrap();
    let totals = session.totals(&[]).unwrap();
    assert_eq!(totals.total_payments, MoneyCents::new(5000));
    // Negative amount due is a credit, never clamped.
    assert_eq!(totals.amount_due, MoneyCents::new(-5000));
}

#[tokio::test]
async fn zero_payment_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let mut session = engine.session();
    let ivd = session
        .create(InvoiceHeader::draft(101, date(2026, 3, 1)))
        .await
        .unwrap();

    let err = engine
        .record_payment(ivd, check(0, date(2026, 3, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn account_owed_ignores_credits_and_settled_invoices() {
    let (engine, _db) = engine_with_db().await;
    let mut session = engine.session();

    // Invoice with 120.00 outstanding.
    session
        .create(InvoiceHeader::draft(101, date(2026, 3, 1)))
        .await
        .unwrap();
    session.begin_edit().unwrap();
    session.add_line(line("AMP-100", "1", 12_000)).unwrap();
    session.save().await.unwrap();

    // Invoice with no line items and a 30.00 payment: a 30.00 credit.
    let credit = session
        .create(InvoiceHeader::draft(101, date(2026, 3, 2)))
        .await
        .unwrap();
    engine
        .record_payment(credit, check(3000, date(2026, 3, 3)))
        .await
        .unwrap();

    // Fully settled invoice.
    let settled = session
        .create(InvoiceHeader::draft(101, date(2026, 3, 4)))
        .await
        .unwrap();
    session.begin_edit().unwrap();
    session.add_line(line("PICK-01", "2", 500)).unwrap();
    session.save().await.unwrap();
    engine
        .record_payment(settled, check(1000, date(2026, 3, 5)))
        .await
        .unwrap();

    // 120.00, not 120.00 - 30.00: credits are excluded, not netted.
    let owed = engine.account_owed(101).await.unwrap();
    assert_eq!(owed, MoneyCents::new(12_000));
}

#[tokio::test]
async fn past_due_lists_only_overdue_invoices() {
    let (engine, _db) = engine_with_db().await;
    let mut session = engine.session();

    // Due 2026-03-31, overdue at the as-of date below.
    let oldest = session
        .create(InvoiceHeader::draft(101, date(2026, 3, 1)))
        .await
        .unwrap();
    session.begin_edit().unwrap();
    session.add_line(line("AMP-100", "1", 12_000)).unwrap();
    session.save().await.unwrap();

    // Newer and also overdue.
    let newer = session
        .create(InvoiceHeader::draft(101, date(2026, 4, 10)))
        .await
        .unwrap();
    session.begin_edit().unwrap();
    session.add_line(line("STAND-XL", "1", 4500)).unwrap();
    session.save().await.unwrap();

    // A quote never comes due, balance or not.
    let mut quote = InvoiceHeader::draft(101, date(2026, 3, 1));
    quote.doc_type = DocType::Quote;
    let quote_id = session.create(quote).await.unwrap();
    session.begin_edit().unwrap();
    session.add_line(line("DRUM-KIT", "1", 99_900)).unwrap();
    session.save().await.unwrap();

    // Recent invoice, not yet due.
    let recent = session
        .create(InvoiceHeader::draft(101, date(2026, 6, 1)))
        .await
        .unwrap();
    session.begin_edit().unwrap();
    session.add_line(line("PICK-01", "2", 500)).unwrap();
    session.save().await.unwrap();

    let as_of = date(2026, 6, 15);
    let past_due = engine.past_due_invoices(101, as_of).await.unwrap();

    let ids: Vec<i64> = past_due.iter().map(|p| p.ivd).collect();
    assert_eq!(ids, vec![oldest, newer]);
    assert!(!ids.contains(&quote_id));
    assert!(!ids.contains(&recent));

    assert_eq!(past_due[0].due_date, date(2026, 3, 31));
    assert_eq!(past_due[0].days_overdue, 76);
    assert_eq!(past_due[0].amount_due, MoneyCents::new(12_000));
    assert!(past_due[0].days_overdue > past_due[1].days_overdue);
}
