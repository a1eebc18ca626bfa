//! Facade consumed by the HTTP layer and the scheduler: run triggering
//! behind the run guard, run status, and the read-side queries.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::Serialize;
use tower::Service;
use tracing::{error, info};

use crate::error::TollError;
use crate::pipeline::Pipeline;
use crate::run_guard::RunGuard;
use crate::storage::Storage;
use crate::types::{KeyTotal, TollTransaction};

/// Manual run trigger, e.g. from the HTTP layer or the cron scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerRequest;

/// Snapshot of the run guard; the configured schedule is the scheduler
/// collaborator's concern and is merged in by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub running: bool,
}

#[derive(Clone)]
pub struct TollService {
    pipeline: Arc<Pipeline>,
    storage: Arc<dyn Storage>,
    guard: Arc<RunGuard>,
}

impl TollService {
    pub fn new(pipeline: Arc<Pipeline>, storage: Arc<dyn Storage>, guard: Arc<RunGuard>) -> Self {
        Self {
            pipeline,
            storage,
            guard,
        }
    }

    /// Admit and start a run in the background, returning immediately.
    ///
    /// Returns [`TollError::AlreadyRunning`] while a run is in flight (a
    /// routine condition for callers, not logged as an error) and a
    /// configuration error when credentials are missing; in both cases no
    /// provider work starts. Callers observe completion by polling
    /// [`TollService::status`].
    pub fn trigger(&self) -> Result<(), TollError> {
        if !self.guard.try_start() {
            return Err(TollError::AlreadyRunning);
        }

        // Precondition check happens before the caller gets "started" back;
        // a rejected run must release the guard itself.
        if let Err(e) = self.pipeline.config().validate_credentials() {
            self.guard.finish();
            return Err(e);
        }

        info!("statement run triggered");
        let pipeline = Arc::clone(&self.pipeline);
        let guard = Arc::clone(&self.guard);

        tokio::spawn(async move {
            match pipeline.run().await {
                Ok(report) => {
                    info!(
                        "statement run completed: {} transactions ingested, {} providers failed",
                        report.ingested_transactions(),
                        report.failed_count()
                    );
                }
                Err(e) => {
                    error!("statement run failed: {}", e);
                }
            }
            // Released on every completion path so a failed run never blocks
            // future runs.
            guard.finish();
        });

        Ok(())
    }

    pub fn status(&self) -> RunStatus {
        RunStatus {
            running: self.guard.is_running(),
        }
    }

    pub fn transactions(&self) -> Result<Vec<TollTransaction>, TollError> {
        self.storage.all_transactions()
    }

    pub fn summary_by_plate(&self) -> Result<Vec<KeyTotal>, TollError> {
        self.storage.summary_by_plate()
    }

    pub fn summary_by_transponder(&self) -> Result<Vec<KeyTotal>, TollError> {
        self.storage.summary_by_transponder()
    }
}

impl Service<TriggerRequest> for TollService {
    type Response = RunStatus;
    type Error = TollError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: TriggerRequest) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            service.trigger()?;
            Ok(service.status())
        })
    }
}
