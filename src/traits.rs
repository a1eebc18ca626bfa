use async_trait::async_trait;

use crate::error::TollError;
use crate::types::{ProviderContext, ProviderId, StatementMetadata, TollTransaction};

/// Site-specific acquisition and parsing behind one contract.
#[async_trait]
pub trait TollProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn name(&self) -> &'static str;

    /// Log in, locate the newest statement and download it.
    ///
    /// `Ok(None)` means the portal reports no statements; that is a normal
    /// outcome, not an error. Login and navigation failures are recoverable
    /// errors scoped to this provider only.
    async fn acquire_latest_statement(
        &mut self,
        ctx: &ProviderContext,
    ) -> Result<Option<StatementMetadata>, TollError>;

    /// Parse the downloaded document into transactions. Lines that do not
    /// match the provider grammar are skipped silently.
    async fn parse_statement(
        &self,
        metadata: &StatementMetadata,
    ) -> Result<Vec<TollTransaction>, TollError>;

    /// Release the browser session. Called by the orchestrator on every exit
    /// path, including failures.
    async fn close(&mut self);
}
