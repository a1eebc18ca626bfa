//! The acquisition-parse-persist orchestrator.
//!
//! Providers run strictly sequentially in a fixed order; one provider's
//! failure is caught, logged and recorded without touching its siblings.
//! Only a credential precondition failure aborts a run outright.

use std::fs::File;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::TollError;
use crate::providers;
use crate::storage::Storage;
use crate::traits::TollProvider;
use crate::types::{ProviderContext, ProviderId, StatementMetadata, TollTransaction};

/// Result of one provider's iteration within a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum ProviderOutcome {
    /// Statement downloaded, parsed and persisted.
    Ingested { transactions: usize },
    /// The portal listed no statements; nothing to do.
    NoStatement,
    /// Statement stored but its parse yielded zero transactions.
    EmptyParse,
    /// Acquisition, parsing or persistence failed for this provider only.
    Failed { error: String },
}

/// Per-provider outcomes of one full run. Partial success is the expected
/// steady-state failure mode, not a fatal condition.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<(ProviderId, ProviderOutcome)>,
}

impl RunReport {
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ProviderOutcome::Failed { .. }))
            .count()
    }

    pub fn ingested_transactions(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                ProviderOutcome::Ingested { transactions } => *transactions,
                _ => 0,
            })
            .sum()
    }
}

/// Audit artifact written next to the ledger after every successful parse,
/// one file per (provider, statement date). Used for reprocessing and
/// debugging; never read back by the pipeline.
#[derive(Serialize)]
struct AuditArtifact<'a> {
    statement: &'a StatementMetadata,
    transactions: &'a [TollTransaction],
}

pub struct Pipeline {
    config: AppConfig,
    storage: Arc<dyn Storage>,
}

impl Pipeline {
    pub fn new(config: AppConfig, storage: Arc<dyn Storage>) -> Self {
        Self { config, storage }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the full pipeline over all registered providers.
    ///
    /// Fails outright only when credentials are missing; every per-provider
    /// error is converted into a [`ProviderOutcome::Failed`] entry.
    pub async fn run(&self) -> Result<RunReport, TollError> {
        self.config.validate_credentials()?;
        self.config.ensure_dirs()?;

        let mut providers = providers::default_providers(&self.config);
        Ok(self.run_providers(&mut providers).await)
    }

    /// Drive an explicit provider set, sequentially and in order.
    pub async fn run_providers(&self, providers: &mut [Box<dyn TollProvider>]) -> RunReport {
        let ctx = ProviderContext {
            download_dir: self.config.download_dir.clone(),
            processed_dir: self.config.processed_dir.clone(),
        };

        let mut outcomes = Vec::with_capacity(providers.len());
        for provider in providers {
            let outcome = match self.process_provider(provider.as_mut(), &ctx).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("failed to process provider {}: {}", provider.name(), e);
                    ProviderOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

            // The browser session is released on every exit path before the
            // next provider starts.
            provider.close().await;

            outcomes.push((provider.id(), outcome));
        }

        RunReport { outcomes }
    }

    async fn process_provider(
        &self,
        provider: &mut dyn TollProvider,
        ctx: &ProviderContext,
    ) -> Result<ProviderOutcome, TollError> {
        info!("starting fetch for {}", provider.name());

        let metadata = match provider.acquire_latest_statement(ctx).await? {
            Some(metadata) => metadata,
            None => {
                info!("no new statements available for {}", provider.name());
                return Ok(ProviderOutcome::NoStatement);
            }
        };

        let statement_id = self.storage.upsert_statement(&metadata)?;

        let transactions = provider.parse_statement(&metadata).await?;
        if transactions.is_empty() {
            warn!("no transactions parsed for {}", provider.name());
            return Ok(ProviderOutcome::EmptyParse);
        }

        self.storage
            .replace_transactions(statement_id, &transactions)?;
        self.write_audit_artifact(ctx, &metadata, &transactions)?;

        info!(
            "stored {} transactions for {}",
            transactions.len(),
            provider.name()
        );
        Ok(ProviderOutcome::Ingested {
            transactions: transactions.len(),
        })
    }

    fn write_audit_artifact(
        &self,
        ctx: &ProviderContext,
        metadata: &StatementMetadata,
        transactions: &[TollTransaction],
    ) -> Result<(), TollError> {
        let dir = ctx.processed_dir.join(metadata.provider.as_str());
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.json", metadata.statement_date));
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(
            file,
            &AuditArtifact {
                statement: metadata,
                transactions,
            },
        )?;

        info!("wrote audit artifact {:?}", path);
        Ok(())
    }
}
