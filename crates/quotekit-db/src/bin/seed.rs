//! # Seed Documents
//!
//! Writes the default documents (starter inventory, categories, templates,
//! settings) into a Document Store so they can be inspected or edited.
//!
//! ## Usage
//! ```bash
//! # Seed ./quotekit_dev.db
//! cargo run -p quotekit-db --bin seed
//!
//! # Specify database path
//! cargo run -p quotekit-db --bin seed -- --db ./data/quotekit.db
//!
//! # Overwrite documents that already exist
//! cargo run -p quotekit-db --bin seed -- --force
//! ```

use std::path::PathBuf;

use clap::Parser;
use quotekit_db::{Database, DbConfig, DocumentKey};

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Writes the default QuoteKit documents")]
struct Args {
    /// Database file path
    #[arg(short, long, default_value = "./quotekit_dev.db")]
    db: PathBuf,

    /// Overwrite documents that already exist
    #[arg(short, long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Args { db: db_path, force } = Args::parse();

    println!("🌱 QuoteKit Seed Documents");
    println!("==========================");
    println!("Database: {}", db_path.display());
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let documents = db.documents();

    println!("✓ Connected to database");
    println!("✓ Migrations applied");
    println!();

    let mut written = 0;
    let mut skipped = 0;

    for key in DocumentKey::ALL {
        if !force && documents.fetch(key).await?.is_some() {
            println!("  - {:<22} exists, skipped", key.as_str());
            skipped += 1;
            continue;
        }

        let value = key.default_value();
        if value.is_null() {
            continue;
        }

        documents.put(key, &value).await?;
        println!("  ✓ {:<22} written", key.as_str());
        written += 1;
    }

    println!();
    println!("✓ Seed complete: {} written, {} skipped", written, skipped);
    if skipped > 0 && !force {
        println!("  Use --force to overwrite existing documents.");
    }

    db.close().await;
    Ok(())
}
