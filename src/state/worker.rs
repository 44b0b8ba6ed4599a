use crate::state::messages::{RefreshRequest, RefreshResponse};
use crate::state::partition::PartitionKind;
use crate::state::scheduler::{SourceFetcher, TieredScheduler};
use chrono::Utc;
use log::{debug, error};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Owns the scheduler in long-running mode and answers refresh requests one
/// at a time. Partitions inside a request still refresh concurrently.
pub struct RefreshWorker<F> {
    scheduler: Arc<TieredScheduler<F>>,
    requests: mpsc::Receiver<RefreshRequest>,
    responses: mpsc::Sender<RefreshResponse>,
}

impl<F: SourceFetcher> RefreshWorker<F> {
    pub fn new(
        scheduler: Arc<TieredScheduler<F>>,
        requests: mpsc::Receiver<RefreshRequest>,
        responses: mpsc::Sender<RefreshResponse>,
    ) -> Self {
        Self { scheduler, requests, responses }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            let (partitions, force) = match request {
                RefreshRequest::Tick => (PartitionKind::ALL.to_vec(), false),
                RefreshRequest::Refresh { partitions, force } => (partitions, force),
            };

            debug!("refresh request for {partitions:?} (force: {force})");
            let outcomes = self.scheduler.refresh_all(&partitions, Utc::now(), force).await;

            if let Err(e) = self.responses.send(RefreshResponse::Completed { outcomes }).await {
                error!("Failed to send refresh response: {e}");
                break;
            }
        }
    }
}
