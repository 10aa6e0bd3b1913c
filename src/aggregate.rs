//! Source aggregation: one independent fetch-and-parse pipeline per source.
//!
//! A failing source only ever affects its own [`SourceResult`]. Each pipeline
//! runs in its own task, so even a panic is folded into a transport failure
//! for that source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Semaphore, mpsc};
use tracing::{Instrument, debug, error, info, warn};

use crate::clock::Clock;
use crate::display::SurfaceId;
use crate::fetch::FeedClient;
use crate::parser::parse_arrivals;
use crate::source::{Source, SourceId, SourceResult};

/// A batch of fetches issued on behalf of one surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub surface: SurfaceId,
    pub seq: u64,
    pub sources: Vec<Source>,
}

/// One source's result, tagged with the dispatch it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub surface: SurfaceId,
    pub seq: u64,
    pub source: SourceId,
    pub result: SourceResult,
}

pub struct Aggregator<C> {
    client: Arc<C>,
    clock: Arc<dyn Clock>,
    permits: Arc<Semaphore>,
}

impl<C> Clone for Aggregator<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            clock: Arc::clone(&self.clock),
            permits: Arc::clone(&self.permits),
        }
    }
}

impl<C: FeedClient + 'static> Aggregator<C> {
    pub fn new(client: C, clock: Arc<dyn Clock>) -> Self {
        Self {
            client: Arc::new(client),
            clock,
            permits: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
        }
    }

    /// Caps the number of feed requests in flight at once.
    pub fn with_concurrency(mut self, max_in_flight: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
        self
    }

    /// Fetches and parses a single source.
    #[tracing::instrument(skip(self, source), fields(source = %source.id))]
    pub async fn fetch_one(&self, source: &Source) -> SourceResult {
        // The semaphore is never closed, so a failed acquire cannot happen.
        let _permit = self.permits.acquire().await.ok();

        let started = Instant::now();
        let body = match self.client.fetch(&source.url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Feed fetch failed");
                return SourceResult::TransportFailure(e.to_string());
            }
        };

        let elapsed = started.elapsed();
        if elapsed.as_secs() > 15 {
            warn!(elapsed_secs = elapsed.as_secs(), "Feed fetch was slow");
        }

        match parse_arrivals(&body, self.clock.now()) {
            Ok(records) => {
                info!(arrivals = records.len(), "Feed parsed");
                SourceResult::Success(records)
            }
            Err(e) => {
                error!(error = %e, "Feed parse failed");
                SourceResult::ParseFailure(e.to_string())
            }
        }
    }

    /// Fetches every source concurrently and waits for all of them.
    pub async fn fetch_all(&self, sources: &[Source]) -> HashMap<SourceId, SourceResult> {
        let pending: Vec<_> = sources
            .iter()
            .map(|source| {
                let this = self.clone();
                let source = source.clone();
                let id = source.id.clone();
                (id, tokio::spawn(async move { this.fetch_one(&source).await }))
            })
            .collect();

        let mut results = HashMap::with_capacity(pending.len());
        for (id, handle) in pending {
            let result = handle.await.unwrap_or_else(|e| task_failure(&id, &e));
            results.insert(id, result);
        }
        results
    }

    /// Starts every fetch in `plan` and reports each result on `tx` as soon as
    /// it completes. Completion order between sources is unspecified.
    pub fn dispatch(&self, plan: FetchPlan, tx: &mpsc::UnboundedSender<SourceOutcome>) {
        let span = tracing::info_span!("dispatch", surface = %plan.surface, seq = plan.seq);
        debug!(parent: &span, sources = plan.sources.len(), "Dispatching fetches");

        for source in plan.sources {
            let this = self.clone();
            let tx = tx.clone();
            let surface = plan.surface.clone();
            let seq = plan.seq;

            tokio::spawn(
                async move {
                    let id = source.id.clone();
                    let result = this.fetch_isolated(source).await;
                    let outcome = SourceOutcome {
                        surface,
                        seq,
                        source: id,
                        result,
                    };
                    if tx.send(outcome).is_err() {
                        debug!("Outcome receiver closed, dropping result");
                    }
                }
                .instrument(span.clone()),
            );
        }
    }

    async fn fetch_isolated(self, source: Source) -> SourceResult {
        let id = source.id.clone();
        tokio::spawn(async move { self.fetch_one(&source).await }.in_current_span())
            .await
            .unwrap_or_else(|e| task_failure(&id, &e))
    }
}

fn task_failure(id: &SourceId, e: &tokio::task::JoinError) -> SourceResult {
    error!(source = %id, error = %e, "Fetch task failed");
    SourceResult::TransportFailure(format!("fetch task failed: {e}"))
}
