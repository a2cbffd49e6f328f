//! Sync orchestration: fetch, update, report.
//!
//! The monitor owns the session, the repository and the scheduler, and is
//! the only place that talks to the mail service. Every fetch follows the
//! same order: repository replaced, stats recomputed, outcome reported
//! (reporting suppressed for silent background refreshes). A failed fetch
//! never touches the existing snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;

use crate::api::ApiClient;
use crate::error::MonitorError;
use crate::notification::{EventKind, MonitorEvent, NotificationSink};
use crate::repository::{MessageRepository, RepositorySnapshot, ViewMode};
use crate::scheduler::RefreshScheduler;
use crate::session::{CredentialSession, Credentials, SessionState};
use crate::stats::{self, Stats};
use crate::types::Message;

pub struct Monitor {
    api: ApiClient,
    sink: Arc<dyn NotificationSink>,
    poll_interval: Duration,
    session: StdMutex<CredentialSession>,
    repository: StdMutex<MessageRepository>,
    scheduler: AsyncMutex<RefreshScheduler>,
    /// Bumped on every configure/reset. A fetch captures the epoch before
    /// the request goes out; a response from an older epoch is discarded
    /// instead of overwriting a newer session's state.
    epoch: AtomicU64,
    /// Single-flight guard: at most one fetch in flight per monitor.
    fetch_gate: AsyncMutex<()>,
}

impl Monitor {
    pub fn new(api: ApiClient, sink: Arc<dyn NotificationSink>, poll_interval: Duration) -> Self {
        Self {
            api,
            sink,
            poll_interval,
            session: StdMutex::new(CredentialSession::new()),
            repository: StdMutex::new(MessageRepository::new()),
            scheduler: AsyncMutex::new(RefreshScheduler::new()),
            epoch: AtomicU64::new(0),
            fetch_gate: AsyncMutex::new(()),
        }
    }

    /// Store credentials for the session.
    ///
    /// Reconfiguring an already-configured monitor resets it first: the
    /// scheduler stops, and the old credentials and snapshot are discarded.
    pub async fn configure(&self, email: &str, password: &str) -> Result<(), MonitorError> {
        if email.trim().is_empty() || password.trim().is_empty() {
            // Invalid input never disturbs an existing session.
            let err = MonitorError::MissingFields;
            self.sink.notify(MonitorEvent::new(
                EventKind::Warning,
                "Setup incomplete",
                err.to_string(),
            ));
            return Err(err);
        }
        if self.state() == SessionState::Configured {
            self.reset().await;
        }
        self.session.lock().unwrap().configure(email, password)
    }

    /// Drop credentials and snapshot, stop the scheduler.
    pub async fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.session.lock().unwrap().reset();
        self.repository.lock().unwrap().clear();
        self.scheduler.lock().await.stop().await;
    }

    /// Start the background refresh scheduler. Requires a configured session.
    pub async fn start_refresh(self: &Arc<Self>) -> Result<(), MonitorError> {
        if self.state() != SessionState::Configured {
            return Err(MonitorError::NotConfigured);
        }
        self.scheduler
            .lock()
            .await
            .start(Arc::downgrade(self), self.poll_interval);
        Ok(())
    }

    pub async fn stop_refresh(&self) {
        self.scheduler.lock().await.stop().await;
    }

    pub async fn refresh_running(&self) -> bool {
        self.scheduler.lock().await.is_running()
    }

    /// Fetch the full listing and replace the snapshot.
    ///
    /// Silent mode is used by the scheduler: outcomes are not reported to
    /// the sink, and failures are logged only.
    pub async fn load_all(&self, silent: bool) -> Result<Stats, MonitorError> {
        let Some(creds) = self.credentials() else {
            if !silent {
                self.sink.notify(MonitorEvent::new(
                    EventKind::Warning,
                    "Not configured",
                    "Set up an account before refreshing",
                ));
            }
            return Err(MonitorError::NotConfigured);
        };

        let _flight = self.fetch_gate.lock().await;
        let epoch = self.epoch.load(Ordering::SeqCst);

        match self.api.list_messages(&creds).await {
            Ok(messages) => {
                let Some(stats) = self.apply(epoch, messages, ViewMode::Full) else {
                    tracing::debug!("discarding full listing fetched before session reset");
                    return Err(MonitorError::NotConfigured);
                };
                if !silent {
                    self.sink.notify(MonitorEvent::new(
                        EventKind::Success,
                        "Mailbox refreshed",
                        format!("{} messages", stats.total),
                    ));
                }
                Ok(stats)
            }
            Err(e) => {
                if silent {
                    tracing::debug!("silent refresh failed: {}", e);
                } else {
                    self.sink.notify(MonitorEvent::new(
                        EventKind::Error,
                        "Refresh failed",
                        e.to_string(),
                    ));
                }
                Err(e.into())
            }
        }
    }

    /// Fetch messages filtered by sender and replace the snapshot, tagged
    /// with the search term.
    pub async fn search(&self, term: &str) -> Result<Stats, MonitorError> {
        let term = term.trim();
        if term.is_empty() {
            self.sink.notify(MonitorEvent::new(
                EventKind::Warning,
                "Empty search",
                "Enter a sender to search for",
            ));
            return Err(MonitorError::EmptyTerm);
        }
        let Some(creds) = self.credentials() else {
            self.sink.notify(MonitorEvent::new(
                EventKind::Warning,
                "Not configured",
                "Set up an account before searching",
            ));
            return Err(MonitorError::NotConfigured);
        };

        let _flight = self.fetch_gate.lock().await;
        let epoch = self.epoch.load(Ordering::SeqCst);

        match self.api.search_by_sender(&creds, term).await {
            Ok(messages) => {
                let count = messages.len();
                let Some(stats) =
                    self.apply(epoch, messages, ViewMode::FilteredBy(term.to_string()))
                else {
                    tracing::debug!("discarding search results fetched before session reset");
                    return Err(MonitorError::NotConfigured);
                };
                self.sink.notify(MonitorEvent::new(
                    EventKind::Info,
                    "Search results",
                    format!("{} messages from {}", count, term),
                ));
                Ok(stats)
            }
            Err(e) => {
                self.sink.notify(MonitorEvent::new(
                    EventKind::Error,
                    "Search failed",
                    e.to_string(),
                ));
                Err(e.into())
            }
        }
    }

    /// Explicitly return from a filtered view to the full listing.
    pub async fn show_all(&self) -> Result<Stats, MonitorError> {
        self.load_all(false).await
    }

    pub fn state(&self) -> SessionState {
        self.session.lock().unwrap().state()
    }

    pub fn snapshot(&self) -> RepositorySnapshot {
        self.repository.lock().unwrap().current().clone()
    }

    /// Stats derived from the current snapshot.
    pub fn stats(&self) -> Stats {
        stats::compute(self.repository.lock().unwrap().current())
    }

    pub fn view_is_filtered(&self) -> bool {
        self.repository.lock().unwrap().is_filtered()
    }

    fn credentials(&self) -> Option<Credentials> {
        self.session.lock().unwrap().current().cloned()
    }

    /// Replace the snapshot and recompute stats, unless the session was
    /// reset while the fetch was in flight.
    fn apply(&self, epoch: u64, messages: Vec<Message>, mode: ViewMode) -> Option<Stats> {
        let mut repository = self.repository.lock().unwrap();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return None;
        }
        repository.replace(messages, mode);
        Some(stats::compute(repository.current()))
    }
}
