use std::error::Error;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use engine::{Engine, InvoiceHeader};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, EntityTrait, Set};

mod accounts {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
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
}

#[derive(Parser, Debug)]
#[command(name = "ledgerdesk_admin")]
#[command(about = "Admin utilities for Ledgerdesk (migrate/seed/inspect)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./ledgerdesk.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Db(Db),
    Account(Account),
    Invoice(Invoice),
}

#[derive(Args, Debug)]
struct Db {
    #[command(subcommand)]
    command: DbCommand,
}

#[derive(Subcommand, Debug)]
enum DbCommand {
    /// Apply pending migrations.
    Migrate,
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Add(AccountAddArgs),
    /// Total positive balance across the account's invoices.
    Owed(AccountRefArgs),
    /// Invoices past their Net-30 due date.
    PastDue(AccountRefArgs),
}

#[derive(Args, Debug)]
struct AccountAddArgs {
    #[arg(long)]
    number: i64,
    #[arg(long)]
    name: String,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    zip: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args, Debug)]
struct AccountRefArgs {
    #[arg(long)]
    number: i64,
}

#[derive(Args, Debug)]
struct Invoice {
    #[command(subcommand)]
    command: InvoiceCommand,
}

#[derive(Subcommand, Debug)]
enum InvoiceCommand {
    Show(InvoiceShowArgs),
    Create(InvoiceCreateArgs),
}

#[derive(Args, Debug)]
struct InvoiceShowArgs {
    #[arg(long)]
    ivd: i64,
    /// Dump header, lines, payments and totals as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct InvoiceCreateArgs {
    #[arg(long)]
    account: i64,
    /// Invoice date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    date: Option<chrono::NaiveDate>,
}

async fn connect(url: &str) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    Ok(Database::connect(url).await?)
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let db = connect(&cli.database_url).await?;

    match cli.command {
        Command::Db(db_cmd) => match db_cmd.command {
            DbCommand::Migrate => {
                migration::Migrator::up(&db, None).await?;
                println!("migrations applied");
            }
        },
        Command::Account(account) => {
            let engine = Engine::builder().database(db.clone()).build();
            match account.command {
                AccountCommand::Add(args) => {
                    let row = accounts::ActiveModel {
                        account_number: Set(args.number),
                        name: Set(args.name),
                        address: Set(args.address),
                        city: Set(args.city),
                        state: Set(args.state),
                        zip: Set(args.zip),
                        phone: Set(args.phone),
                        email: Set(args.email),
                        contact: Set(None),
                        terms: Set(None),
                        salesman: Set(None),
                    };
                    accounts::Entity::insert(row).exec(&db).await?;
                    println!("account {} added", args.number);
                }
                AccountCommand::Owed(args) => {
                    let owed = engine.account_owed(args.number).await?;
                    println!("account {} owes {owed}", args.number);
                }
                AccountCommand::PastDue(args) => {
                    let today = Local::now().date_naive();
                    let invoices = engine.past_due_invoices(args.number, today).await?;
                    if invoices.is_empty() {
                        println!("no past due invoices for account {}", args.number);
                    }
                    for inv in invoices {
                        println!(
                            "invoice {} dated {} due {}: {} ({} days overdue)",
                            inv.ivd, inv.invoice_date, inv.due_date, inv.amount_due, inv.days_overdue
                        );
                    }
                }
            }
        }
        Command::Invoice(invoice) => {
            let engine = Engine::builder().database(db.clone()).build();
            match invoice.command {
                InvoiceCommand::Show(args) => {
                    let header = engine.invoice(args.ivd).await?;
                    let items = engine.line_items(args.ivd).await?;
                    let payments = engine.payments(args.ivd).await?;
                    let totals = engine::invoice_totals(&header, &items, &payments, &[]);
                    if args.json {
                        let doc = serde_json::json!({
                            "header": header,
                            "items": items,
                            "payments": payments,
                            "subtotal": totals.subtotal,
                            "grand_total": totals.grand_total,
                            "total_payments": totals.total_payments,
                            "amount_due": totals.amount_due,
                        });
                        println!("{}", serde_json::to_string_pretty(&doc)?);
                    } else {
                        println!(
                            "{} {} for account {} on {}",
                            header.doc_type.as_str(),
                            header.ivd,
                            header.account_number,
                            header.invoice_date
                        );
                        for item in &items {
                            let fields = item.fields();
                            println!(
                                "  [{}] {} x{} @ {}",
                                item.line_key().unwrap_or_default(),
                                fields.part_number.as_deref().unwrap_or("-"),
                                fields.qty_ordered,
                                fields.unit_net
                            );
                        }
                        for payment in &payments {
                            println!(
                                "  paid {} by {} on {}",
                                payment.amount, payment.payment_type, payment.payment_date
                            );
                        }
                        println!(
                            "  subtotal {}  grand total {}  amount due {}",
                            totals.subtotal, totals.grand_total, totals.amount_due
                        );
                    }
                }
                InvoiceCommand::Create(args) => {
                    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
                    let header = engine
                        .create_invoice(InvoiceHeader::draft(args.account, date))
                        .await?;
                    println!("created invoice {}", header.ivd);
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
