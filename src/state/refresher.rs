use crate::state::messages::RefreshRequest;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};

/// Periodic trigger for the refresh worker. Each tick only asks the worker to
/// re-check staleness; the per-partition intervals decide what is fetched.
pub struct PeriodicRefresher {
    refresh_requests: mpsc::Sender<RefreshRequest>,
    period: Duration,
}

impl PeriodicRefresher {
    pub fn new(refresh_requests: mpsc::Sender<RefreshRequest>, period: Duration) -> Self {
        Self { refresh_requests, period }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.period);
        // Skip the immediate first tick so startup loading isn't double-triggered.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if self.refresh_requests.send(RefreshRequest::Tick).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sends_ticks_after_the_first_period() {
        let (tx, mut rx) = mpsc::channel(4);
        let task = tokio::spawn(PeriodicRefresher::new(tx, Duration::from_secs(60)).run());

        assert_eq!(rx.recv().await, Some(RefreshRequest::Tick));
        assert_eq!(rx.recv().await, Some(RefreshRequest::Tick));
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_the_worker_goes_away() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let task = tokio::spawn(PeriodicRefresher::new(tx, Duration::from_secs(1)).run());
        assert!(task.await.is_ok());
    }
}
