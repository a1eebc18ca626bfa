//! Toll statement scraper service.
//!
//! Retrieves periodic billing statements from toll-account web portals
//! (DriveEzMD, E-ZPass NY), parses the individual toll transactions out of
//! each statement and persists them into a queryable SQLite ledger with
//! per-plate and per-transponder aggregation.
//!
//! # Triggering a run
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toll_scraper::{AppConfig, Pipeline, RunGuard, SqliteStorage, TollService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::from_env();
//!     let storage = Arc::new(SqliteStorage::open(&config.database_path).unwrap());
//!     let pipeline = Arc::new(Pipeline::new(config, storage.clone()));
//!     let guard = Arc::new(RunGuard::new());
//!
//!     let service = TollService::new(pipeline, storage, guard);
//!     service.trigger().unwrap();
//!
//!     // The run proceeds in the background; poll for completion.
//!     while service.status().running {
//!         tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     }
//!     println!("transactions: {}", service.transactions().unwrap().len());
//! }
//! ```

pub mod config;
pub mod error;
pub mod parse;
pub mod pipeline;
pub mod providers;
pub mod run_guard;
pub mod service;
pub mod session;
pub mod storage;
pub mod traits;
pub mod types;

pub use config::{AppConfig, Credentials};
pub use error::TollError;
pub use pipeline::{Pipeline, ProviderOutcome, RunReport};
pub use run_guard::RunGuard;
pub use service::{RunStatus, TollService, TriggerRequest};
pub use session::BrowserSession;
pub use storage::{SqliteStorage, Storage};
pub use traits::TollProvider;
pub use types::{
    KeyTotal, ProviderContext, ProviderId, StatementMetadata, TollTransaction,
};
