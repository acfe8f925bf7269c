//! User-facing notices.
//!
//! Mutations report their outcome as a [`Notice`] instead of propagating
//! failures to the caller's UI layer. Hosts drain the queue to show toasts.

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A short message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Success with `ok` on `Ok`, error with `failed: <cause>` on `Err`.
    pub fn from_result<T, E: Display>(result: &Result<T, E>, ok: &str, failed: &str) -> Self {
        match result {
            Ok(_) => Self::success(ok),
            Err(e) => Self::error(format!("{}: {}", failed, e)),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Shared FIFO of pending notices.
#[derive(Debug, Clone, Default)]
pub struct NoticeQueue {
    inner: Arc<Mutex<VecDeque<Notice>>>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notice: Notice) {
        if notice.is_error() {
            tracing::warn!(message = %notice.message, "error notice");
        }
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(notice);
    }

    /// Take every pending notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
