//! Background refresh scheduler.
//!
//! Drives periodic silent refresh while a session is active. The loop runs
//! as a tokio task with an explicit shutdown channel; stopping prevents any
//! further tick from firing but does not cancel a refresh already in
//! flight (a stale result is discarded by the monitor's epoch check).

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::monitor::Monitor;

#[derive(Default)]
pub struct RefreshScheduler {
    running: Option<Running>,
}

struct Running {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Begin issuing silent refreshes on a fixed period.
    ///
    /// No-op when already running. The loop holds only a weak reference to
    /// the monitor and exits on its own if the monitor is dropped.
    pub fn start(&mut self, monitor: Weak<Monitor>, period: Duration) {
        if self.running.is_some() {
            return;
        }
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(refresh_loop(monitor, period, shutdown_rx));
        self.running = Some(Running { shutdown_tx, task });
        tracing::debug!("refresh scheduler started, period {:?}", period);
    }

    /// Stop the scheduler and wait for the loop to exit.
    ///
    /// Guarantees no further ticks fire after this returns.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.shutdown_tx.send(()).await.ok();
            running.task.await.ok();
            tracing::debug!("refresh scheduler stopped");
        }
    }
}

async fn refresh_loop(
    monitor: Weak<Monitor>,
    period: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    // First tick fires one full period after start; the caller has already
    // done the initial fetch.
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                if monitor.view_is_filtered() {
                    // A sender filter is showing; a full-listing refresh
                    // would silently wipe it. Resume once the user returns
                    // to the full view.
                    tracing::trace!("filtered view active, skipping background refresh");
                    continue;
                }
                if let Err(e) = monitor.load_all(true).await {
                    tracing::debug!("background refresh failed: {}", e);
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::api::{ApiClient, test_server};
    use crate::monitor::Monitor;
    use crate::notification::recording::RecordingSink;

    const TICK: Duration = Duration::from_millis(20);

    fn listing_body(n: usize) -> String {
        let messages: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{"uid":"{i}","sender":"a@b.com","subject":"s","date":"d","folder":"INBOX"}}"#
                )
            })
            .collect();
        format!(r#"{{"messages":[{}]}}"#, messages.join(","))
    }

    async fn monitor_with_server(
        responses: Vec<(u16, String)>,
    ) -> (Arc<Monitor>, Arc<RecordingSink>, test_server::RequestLog) {
        let (base_url, log) = test_server::spawn(responses).await;
        let sink = Arc::new(RecordingSink::new());
        let monitor = Arc::new(Monitor::new(
            ApiClient::new(&base_url).unwrap(),
            sink.clone(),
            TICK,
        ));
        (monitor, sink, log)
    }

    #[tokio::test]
    async fn test_start_requires_configured_session() {
        let (monitor, _sink, _log) = monitor_with_server(vec![(200, listing_body(1))]).await;
        assert!(monitor.start_refresh().await.is_err());
        assert!(!monitor.refresh_running().await);
    }

    #[tokio::test]
    async fn test_ticks_refresh_silently() {
        let (monitor, sink, log) = monitor_with_server(vec![(200, listing_body(3))]).await;
        monitor.configure("a@b.com", "x").await.unwrap();
        monitor.start_refresh().await.unwrap();
        assert!(monitor.refresh_running().await);

        tokio::time::sleep(TICK * 5).await;
        monitor.stop_refresh().await;

        // Ticks fetched and applied without notifying.
        assert!(!log.lock().unwrap().is_empty());
        assert_eq!(monitor.snapshot().messages.len(), 3);
        assert_eq!(monitor.stats().inbox, 3);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_stop_halts_ticks() {
        let (monitor, _sink, log) = monitor_with_server(vec![(200, listing_body(1))]).await;
        monitor.configure("a@b.com", "x").await.unwrap();
        monitor.start_refresh().await.unwrap();

        tokio::time::sleep(TICK * 3).await;
        monitor.stop_refresh().await;
        assert!(!monitor.refresh_running().await);

        let fetched = log.lock().unwrap().len();
        tokio::time::sleep(TICK * 5).await;
        assert_eq!(log.lock().unwrap().len(), fetched);
    }

    #[tokio::test]
    async fn test_refresh_suspended_while_filtered() {
        let (monitor, _sink, log) = monitor_with_server(vec![(200, listing_body(2))]).await;
        monitor.configure("a@b.com", "x").await.unwrap();
        monitor.search("a@b.com").await.unwrap();
        assert!(monitor.view_is_filtered());

        monitor.start_refresh().await.unwrap();
        let fetched = log.lock().unwrap().len();
        tokio::time::sleep(TICK * 5).await;
        monitor.stop_refresh().await;

        // No full-listing fetches landed while the filter was active.
        assert_eq!(log.lock().unwrap().len(), fetched);
        assert!(monitor.view_is_filtered());
    }

    #[tokio::test]
    async fn test_tick_failures_are_swallowed() {
        let (monitor, sink, log) =
            monitor_with_server(vec![(500, r#"{"detail":"boom"}"#.to_string())]).await;
        monitor.configure("a@b.com", "x").await.unwrap();
        monitor.start_refresh().await.unwrap();

        tokio::time::sleep(TICK * 4).await;
        monitor.stop_refresh().await;

        assert!(!log.lock().unwrap().is_empty());
        // Failures stayed silent and the empty snapshot survived.
        assert!(sink.events().is_empty());
        assert!(monitor.snapshot().messages.is_empty());
    }
}
