//! # Concurrent Load Driver
//!
//! Fans out N independent GET requests with at most C in flight at once,
//! waits for every one of them, then reduces the outcomes into
//! [`ThroughputStats`].
//!
//! ## Execution Model
//!
//! - Each request runs as its own Tokio task in a `JoinSet`
//! - A `Semaphore` with C permits bounds simultaneously in-flight requests
//! - Each task returns its own outcome; the join loop is the only place
//!   outcomes are collected, so no shared mutable state is needed
//! - The join is all-or-nothing: statistics are computed only after all N
//!   tasks finish. A failing request never cancels the others
//!
//! Wall time spans from just before the first task is spawned to just after
//! the last outcome is collected.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::client::{RequestOutcome, TargetClient};
use crate::metrics::ThroughputStats;

/// Bounded worker pool issuing timed requests against one target
#[derive(Debug, Clone)]
pub struct LoadDriver {
    client: TargetClient,
}

impl LoadDriver {
    pub fn new(client: TargetClient) -> Self {
        Self { client }
    }

    /// Issue `total_requests` GETs against `path` with at most `concurrency`
    /// in flight and reduce the outcomes.
    ///
    /// A concurrency of 0 is treated as 1.
    pub async fn run(
        &self,
        path: &str,
        total_requests: usize,
        concurrency: usize,
        timeout: Duration,
    ) -> ThroughputStats {
        let (outcomes, wall_time) = self
            .collect_outcomes(path, total_requests, concurrency, timeout)
            .await;

        ThroughputStats::from_outcomes(&outcomes, total_requests, wall_time)
    }

    /// Run the burst and return the raw outcomes with the measured wall time
    pub async fn collect_outcomes(
        &self,
        path: &str,
        total_requests: usize,
        concurrency: usize,
        timeout: Duration,
    ) -> (Vec<RequestOutcome>, Duration) {
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));
        let path: Arc<str> = Arc::from(path);
        let mut workers = JoinSet::new();

        let started = Instant::now();
        for request_id in 0..total_requests {
            let client = self.client.clone();
            let permits = Arc::clone(&permits);
            let path = Arc::clone(&path);

            workers.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return RequestOutcome::failed(
                            Duration::ZERO,
                            format!("worker pool closed: {}", e),
                        )
                    }
                };
                let response = client.get(&path, timeout).await;
                debug!(
                    "Request {} finished: status={} elapsed={:?}",
                    request_id, response.outcome.status_code, response.outcome.elapsed
                );
                response.outcome
            });
        }

        let mut outcomes = Vec::with_capacity(total_requests);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Request worker terminated abnormally: {}", e);
                    outcomes.push(RequestOutcome::failed(
                        Duration::ZERO,
                        format!("worker task failed: {}", e),
                    ));
                }
            }
        }
        let wall_time = started.elapsed();

        (outcomes, wall_time)
    }
}
