//! Listening session state.
//!
//! An explicit state object with Idle → Listening → Idle transitions,
//! written only by the orchestrator and read by display surfaces. Replaces
//! ambient global flags; anything that needs to query it gets a clone of
//! the handle.

use std::sync::{Arc, RwLock};

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningState {
    Idle,
    Listening,
}

#[derive(Debug)]
struct SessionInner {
    state: ListeningState,
    last_transcript: Option<String>,
}

/// Shared handle to the session state
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<RwLock<SessionInner>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionInner {
                state: ListeningState::Idle,
                last_transcript: None,
            })),
        }
    }

    pub fn state(&self) -> ListeningState {
        self.inner.read().unwrap().state
    }

    pub fn is_listening(&self) -> bool {
        self.state() == ListeningState::Listening
    }

    pub fn start_listening(&self) {
        let mut inner = self.inner.write().unwrap();
        if inner.state != ListeningState::Listening {
            info!("session transitioning to listening");
            inner.state = ListeningState::Listening;
        }
    }

    /// Stop accepting transcripts. Does not abort anything in flight.
    pub fn stop_listening(&self) {
        let mut inner = self.inner.write().unwrap();
        if inner.state != ListeningState::Idle {
            info!("session transitioning to idle");
            inner.state = ListeningState::Idle;
        }
    }

    pub fn record_transcript(&self, transcript: &str) {
        self.inner.write().unwrap().last_transcript = Some(transcript.to_string());
    }

    /// The most recent transcript, for display surfaces
    pub fn last_transcript(&self) -> Option<String> {
        self.inner.read().unwrap().last_transcript.clone()
    }
}
