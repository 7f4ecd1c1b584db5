//! Test doubles.
//!
//! [`MockCompleter`] scripts model responses so quiz, feed and scan
//! flows can be exercised without an endpoint; [`memory_store`] gives
//! a store that persists to memory only. Used by this crate's own
//! tests and available to downstream integration tests.

use crate::ai::Completer;
use crate::persist::MemoryBackend;
use crate::store::Store;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted collaborator reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond with this text.
    Text(String),
    /// Fail with a network error carrying this message.
    Failure(String),
}

/// A [`Completer`] that pops replies off a queue.
///
/// An exhausted queue fails the call, so a test that makes more model
/// calls than it scripted fails loudly instead of hanging on defaults.
#[derive(Debug, Default)]
pub struct MockCompleter {
    replies: Mutex<VecDeque<MockReply>>,
}

impl MockCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }

    /// A completer whose every call fails.
    pub fn failing() -> Self {
        Self::new()
    }

    pub fn queue_text(&self, text: String) {
        self.replies
            .lock()
            .expect("mock queue poisoned")
            .push_back(MockReply::Text(text));
    }

    pub fn queue_failure(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .expect("mock queue poisoned")
            .push_back(MockReply::Failure(message.into()));
    }

    /// Number of scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().expect("mock queue poisoned").len()
    }
}

#[async_trait]
impl Completer for MockCompleter {
    async fn complete_text(&self, _request: ollama::Request) -> Result<String, ollama::Error> {
        let reply = self
            .replies
            .lock()
            .expect("mock queue poisoned")
            .pop_front();
        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Failure(message)) => Err(ollama::Error::Network(message)),
            None => Err(ollama::Error::Network(
                "mock: no scripted reply".to_string(),
            )),
        }
    }
}

/// A store backed by in-memory slots.
pub fn memory_store() -> Store {
    Store::new(Box::new(MemoryBackend::new()))
}
