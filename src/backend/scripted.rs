use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::backend::{BackendResponse, TextBackend};
use crate::error::BackendError;

/// A prompt pair the backend was called with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub developer: String,
    pub user: String,
}

/// Replays pre-programmed replies in order, for offline runs and tests.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queues a failing reply.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(message.into()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl TextBackend for ScriptedBackend {
    async fn respond_text(
        &self,
        developer: &str,
        user: &str,
    ) -> Result<BackendResponse, BackendError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                developer: developer.to_string(),
                user: user.to_string(),
            });

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match reply {
            Some(Ok(text)) => Ok(BackendResponse::text(text)),
            Some(Err(message)) => Err(BackendError::Other(message)),
            None => Err(BackendError::Other(format!(
                "ScriptedBackend: no reply configured for call {}",
                self.call_count()
            ))),
        }
    }
}
