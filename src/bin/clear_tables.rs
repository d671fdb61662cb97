use clap::Parser;
use tracing::info;

use receiptwise::{app::init_tracing, maintenance};

/// Delete every item, receipt and user in the database.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("receiptwise=info,clear_tables=info");
    let args = Args::parse();

    info!("connecting to the database to clear all tables");
    let db = maintenance::connect(&args.database_url).await?;
    let counts = maintenance::clear_all(&db).await?;

    println!("Deleted {} item(s).", counts.items);
    println!("Deleted {} receipt(s).", counts.receipts);
    println!("Deleted {} user(s).", counts.users);
    println!("Successfully cleared all tables.");
    Ok(())
}
