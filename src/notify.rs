use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

const MAX_NOTICES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Warning,
    Error,
}

/// A dismissible, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: Uuid,
    pub level: Level,
    pub message: String,
}

#[derive(Clone, Default)]
pub struct Notifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn notices(&self) -> MutexGuard<'_, Vec<Notice>> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, level: Level, message: impl Into<String>) -> Uuid {
        let notice = Notice {
            id: Uuid::now_v7(),
            level,
            message: message.into(),
        };
        let id = notice.id;
        let mut notices = self.notices();
        notices.push(notice);
        if notices.len() > MAX_NOTICES {
            let overflow = notices.len() - MAX_NOTICES;
            notices.drain(..overflow);
        }
        id
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.push(Level::Success, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> Uuid {
        self.push(Level::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.push(Level::Error, message)
    }

    /// Returns false when the notice was already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut notices = self.notices();
        let before = notices.len();
        notices.retain(|n| n.id != id);
        notices.len() != before
    }

    pub fn active(&self) -> Vec<Notice> {
        self.notices().clone()
    }

    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices())
    }
}
