use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Engine, EngineError, InvoiceHeader, KeyAllocator, LINE_KEY_FLOOR, LineItem, LineItemFields,
    MaxScanAllocator, MoneyCents,
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

fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

fn draft_line(part: &str, qty: &str, unit_net_cents: i64) -> LineItem {
    LineItem::Draft {
        local_id: 0,
        fields: LineItemFields {
            part_number: Some(part.to_string()),
            qty_ordered: qty.to_string(),
            unit_net: MoneyCents::new(unit_net_cents),
            ..Default::default()
        },
    }
}

async fn seed_line(db: &DatabaseConnection, line_key: i64, ivd: i64) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO invoice_details (line_key, ivd, qty_ordered, qty_shipped, qty_backordered, \
         unit_cost_minor, unit_net_minor) VALUES (?, ?, '1', 0, 0, 0, 100)",
        vec![line_key.into(), ivd.into()],
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn allocation_never_reuses_an_existing_key() {
    let (engine, db) = engine_with_db().await;
    let header = engine
        .create_invoice(InvoiceHeader::draft(101, march(1)))
        .await
        .unwrap();

    for offset in [10, 11, 15] {
        seed_line(&db, LINE_KEY_FLOOR + offset, header.ivd).await;
    }

    let mut desired = engine.line_items(header.ivd).await.unwrap();
    desired.push(draft_line("STR-001", "1", 100));
    desired.push(draft_line("STR-002", "1", 100));

    let outcome = engine
        .reconcile_line_items(header.ivd, &desired)
        .await
        .unwrap();

    let keys: Vec<i64> = outcome.items.iter().filter_map(LineItem::line_key).collect();
    assert_eq!(
        keys,
        vec![
            LINE_KEY_FLOOR + 10,
            LINE_KEY_FLOOR + 11,
            LINE_KEY_FLOOR + 15,
            LINE_KEY_FLOOR + 16,
            LINE_KEY_FLOOR + 17,
        ]
    );
    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.deleted, 0);
}

#[tokio::test]
async fn persisted_set_equals_desired_set() {
    let (engine, _db) = engine_with_db().await;
    let header = engine
        .create_invoice(InvoiceHeader::draft(101, march(1)))
        .await
        .unwrap();

    let desired = vec![
        draft_line("PICK-01", "10", 50),
        draft_line("CABLE-20", "2", 1999),
        draft_line("STAND-XL", "1", 4500),
    ];
    let first = engine
        .reconcile_line_items(header.ivd, &desired)
        .await
        .unwrap();
    assert_eq!(first.items.len(), 3);
    assert_eq!(first.inserted, 3);

    // Drop the middle row, edit the first, add a new one.
    let mut edited: Vec<LineItem> = first.items.clone();
    edited.remove(1);
    edited[0].fields_mut().qty_ordered = "12".to_string();
    edited.push(draft_line("TUNER-9", "1", 899));

    let second = engine
        .reconcile_line_items(header.ivd, &edited)
        .await
        .unwrap();
    assert_eq!(second.deleted, 1);
    assert_eq!(second.inserted, 1);
    assert_eq!(second.items.len(), 3);

    // Surviving rows keep their durable keys, and the store matches the
    // desired set exactly.
    assert_eq!(second.items[0].line_key(), first.items[0].line_key());
    assert_eq!(second.items[0].fields().qty_ordered, "12");
    assert_eq!(second.items[1].line_key(), first.items[2].line_key());
    let persisted = engine.line_items(header.ivd).await.unwrap();
    assert_eq!(persisted, second.items);
}

#[tokio::test]
async fn second_pass_with_same_items_is_idempotent() {
    let (engine, _db) = engine_with_db().await;
    let header = engine
        .create_invoice(InvoiceHeader::draft(101, march(1)))
        .await
        .unwrap();

    let first = engine
        .reconcile_line_items(
            header.ivd,
            &[draft_line("PICK-01", "10", 50), draft_line("CABLE-20", "2", 1999)],
        )
        .await
        .unwrap();

    let second = engine
        .reconcile_line_items(header.ivd, &first.items)
        .await
        .unwrap();
    assert_eq!(second.deleted, 0);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.items, first.items);
}

#[tokio::test]
async fn empty_desired_set_deletes_all_rows() {
    let (engine, _db) = engine_with_db().await;
    let header = engine
        .create_invoice(InvoiceHeader::draft(101, march(1)))
        .await
        .unwrap();

    engine
        .reconcile_line_items(
            header.ivd,
            &[draft_line("PICK-01", "10", 50), draft_line("CABLE-20", "2", 1999)],
        )
        .await
        .unwrap();

    let outcome = engine.reconcile_line_items(header.ivd, &[]).await.unwrap();
    assert_eq!(outcome.deleted, 2);
    assert_eq!(outcome.inserted, 0);
    assert!(outcome.items.is_empty());

    // A header with zero line items is a legal state, not an error.
    assert!(engine.invoice(header.ivd).await.is_ok());
}

#[tokio::test]
async fn qty_ordered_text_round_trips_verbatim() {
    let (engine, _db) = engine_with_db().await;
    let header = engine
        .create_invoice(InvoiceHeader::draft(101, march(1)))
        .await
        .unwrap();

    let outcome = engine
        .reconcile_line_items(header.ivd, &[draft_line("MISC", "N/A", 999)])
        .await
        .unwrap();
    assert_eq!(outcome.items[0].fields().qty_ordered, "N/A");

    let refetched = engine.line_items(header.ivd).await.unwrap();
    assert_eq!(refetched[0].fields().qty_ordered, "N/A");
}

/// Allocator that hands out a fixed, already-taken key a given number of
/// times before delegating to the real max-scan strategy.
struct CollidingAllocator {
    collide_with: i64,
    remaining: AtomicI64,
    inner: MaxScanAllocator,
}

#[async_trait::async_trait]
impl KeyAllocator for CollidingAllocator {
    async fn next_header_id(&self, db: &DatabaseConnection) -> Result<i64, EngineError> {
        self.inner.next_header_id(db).await
    }

    async fn next_line_key(&self, db: &DatabaseConnection) -> Result<i64, EngineError> {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
            return Ok(self.collide_with);
        }
        self.inner.next_line_key(db).await
    }
}

#[tokio::test]
async fn collision_recovers_after_one_reallocation() {
    let (plain, db) = engine_with_db().await;
    let header = plain
        .create_invoice(InvoiceHeader::draft(101, march(1)))
        .await
        .unwrap();
    let taken = plain
        .reconcile_line_items(header.ivd, &[draft_line("PICK-01", "1", 50)])
        .await
        .unwrap()
        .items[0]
        .line_key()
        .unwrap();

    // First allocation collides with the existing row; the retry falls
    // through to max-scan and succeeds.
    let engine = Engine::builder()
        .database(db.clone())
        .key_allocator(Arc::new(CollidingAllocator {
            collide_with: taken,
            remaining: AtomicI64::new(1),
            inner: MaxScanAllocator::default(),
        }))
        .build();

    let mut desired = engine.line_items(header.ivd).await.unwrap();
    desired.push(draft_line("CABLE-20", "1", 1999));
    let outcome = engine
        .reconcile_line_items(header.ivd, &desired)
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.items.len(), 2);
}

#[tokio::test]
async fn persistent_collision_surfaces_as_distinct_error() {
    let (plain, db) = engine_with_db().await;
    let header = plain
        .create_invoice(InvoiceHeader::draft(101, march(1)))
        .await
        .unwrap();
    let taken = plain
        .reconcile_line_items(header.ivd, &[draft_line("PICK-01", "1", 50)])
        .await
        .unwrap()
        .items[0]
        .line_key()
        .unwrap();

    let engine = Engine::builder()
        .database(db.clone())
        .key_allocator(Arc::new(CollidingAllocator {
            collide_with: taken,
            remaining: AtomicI64::new(i64::MAX),
            inner: MaxScanAllocator::default(),
        }))
        .build();

    let mut desired = engine.line_items(header.ivd).await.unwrap();
    desired.push(draft_line("CABLE-20", "1", 1999));
    let err = engine
        .reconcile_line_items(header.ivd, &desired)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::IdentifierCollision {
            table: "invoice_details",
            key: taken,
        }
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn create_invoice_allocates_above_existing_headers() {
    let (engine, _db) = engine_with_db().await;

    let first = engine
        .create_invoice(InvoiceHeader::draft(101, march(1)))
        .await
        .unwrap();
    let second = engine
        .create_invoice(InvoiceHeader::draft(101, march(2)))
        .await
        .unwrap();

    assert_eq!(first.ivd, engine::HEADER_ID_FLOOR + 1);
    assert_eq!(second.ivd, first.ivd + 1);
}
