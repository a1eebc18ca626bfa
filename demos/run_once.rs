use std::sync::Arc;
use std::time::Duration;

use toll_scraper::{AppConfig, Pipeline, RunGuard, SqliteStorage, TollService};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Credentials come from DRIVEEZMD_USERNAME / DRIVEEZMD_PASSWORD and
    // EZPASSNY_USERNAME / EZPASSNY_PASSWORD.
    let config = AppConfig::from_env().with_headless(false); // visible for debugging

    let storage = match SqliteStorage::open(&config.database_path) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            eprintln!("failed to open ledger: {}", e);
            return;
        }
    };

    let pipeline = Arc::new(Pipeline::new(config, storage.clone()));
    let service = TollService::new(pipeline, storage, Arc::new(RunGuard::new()));

    println!("=== Toll Statement Run ===");

    if let Err(e) = service.trigger() {
        eprintln!("trigger failed: {}", e);
        return;
    }

    while service.status().running {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    match service.transactions() {
        Ok(transactions) => println!("ledger now holds {} transactions", transactions.len()),
        Err(e) => eprintln!("read failed: {}", e),
    }

    if let Ok(summary) = service.summary_by_plate() {
        for row in summary {
            println!("{}: {} cents", row.key, row.amount_cents);
        }
    }
}
