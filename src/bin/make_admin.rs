use clap::Parser;

use receiptwise::{
    app::init_tracing,
    auth::{repo_types::User, services::normalize_email},
    maintenance,
};

/// Grant admin privileges to an existing user.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Email address of the user to promote.
    email: String,

    /// Database connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("receiptwise=info,make_admin=info");
    let args = Args::parse();

    let email = normalize_email(&args.email);
    let db = maintenance::connect(&args.database_url).await?;

    if !User::grant_admin(&db, &email).await? {
        anyhow::bail!("user with email '{email}' not found");
    }
    println!("Success! User '{email}' has been granted admin privileges.");
    Ok(())
}
