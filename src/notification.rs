//! Notification sink: where the monitor reports outcomes.
//!
//! The core only ever calls into the sink, never queries it. Events are
//! fire-and-forget; silent background refreshes bypass the sink entirely.

#[cfg(feature = "notifications")]
use crate::config::Config;

/// Severity of a reported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Warning,
    Success,
    Info,
    Error,
}

/// A discrete outcome reported by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEvent {
    pub kind: EventKind,
    pub title: String,
    pub description: String,
}

impl MonitorEvent {
    pub fn new(kind: EventKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Event sink the orchestrator reports into.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: MonitorEvent);
}

/// Sink that writes events to the log.
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: MonitorEvent) {
        match event.kind {
            EventKind::Warning => tracing::warn!("{}: {}", event.title, event.description),
            EventKind::Error => tracing::error!("{}: {}", event.title, event.description),
            EventKind::Success | EventKind::Info => {
                tracing::info!("{}: {}", event.title, event.description)
            }
        }
    }
}

/// Sink that shows desktop notifications, falling back to the log when the
/// notification daemon is unavailable or notifications are disabled.
#[cfg(feature = "notifications")]
pub struct DesktopSink {
    enabled: bool,
    show_preview: bool,
}

#[cfg(feature = "notifications")]
impl DesktopSink {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.notifications.enabled,
            show_preview: config.notifications.show_preview,
        }
    }
}

#[cfg(feature = "notifications")]
impl NotificationSink for DesktopSink {
    fn notify(&self, event: MonitorEvent) {
        // Keep a log trail regardless of the desktop outcome.
        TracingSink.notify(event.clone());

        if !self.enabled {
            return;
        }

        let body = if self.show_preview {
            truncate_preview(&event.description, 100)
        } else {
            String::new()
        };

        if let Err(e) = send_desktop(&event.title, &body) {
            tracing::warn!("Failed to send desktop notification: {}", e);
        }
    }
}

/// Truncate a description to at most `max` bytes, cutting only on a char
/// boundary. The description may carry arbitrary service text, including
/// multi-byte UTF-8.
#[cfg(feature = "notifications")]
fn truncate_preview(description: &str, max: usize) -> String {
    if description.len() <= max {
        return description.to_string();
    }
    let cut = description
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max.saturating_sub(3))
        .last()
        .unwrap_or(0);
    format!("{}...", &description[..cut])
}

/// Low-level notification sending
#[cfg(feature = "notifications")]
fn send_desktop(summary: &str, body: &str) -> Result<(), notify_rust::error::Error> {
    use notify_rust::Notification;

    let mut notification = Notification::new();
    notification
        .summary(summary)
        .appname("kinbox")
        .timeout(notify_rust::Timeout::Milliseconds(5000));

    if !body.is_empty() {
        notification.body(body);
    }

    notification.icon("mail-unread");

    notification.show()?;
    Ok(())
}
