//! User-visible notices (toast/snackbar messages).

use std::time::Duration;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl NoticeLevel {
    /// How long the notice stays on screen.
    pub fn default_duration(self) -> Duration {
        match self {
            NoticeLevel::Success => Duration::from_secs(3),
            NoticeLevel::Error => Duration::from_secs(6),
            NoticeLevel::Warning | NoticeLevel::Info => Duration::from_secs(4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub duration: Duration,
}

/// Broadcasts notices to whatever is rendering them.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn show(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
            duration: level.default_duration(),
        };
        tracing::debug!(level = ?notice.level, message = %notice.message, "Notice");
        // No subscribers is fine: nobody is rendering notices.
        let _ = self.tx.send(notice);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(NoticeLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(NoticeLevel::Error, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.show(NoticeLevel::Warning, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.show(NoticeLevel::Info, message);
    }
}
