//! Session lifecycle state.
//!
//! A session only moves forward: `Connected → EndSignaled → Closed`.
//! Every transition is a check-and-set under one lock, which is never held
//! across an `.await`.

use parking_lot::Mutex;

/// Lifecycle state of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Audio may be written
    Connected,
    /// `EOS` has been sent, only transcripts are still expected
    EndSignaled,
    /// Socket closed or receive loop terminated
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Connected => write!(f, "connected"),
            SessionState::EndSignaled => write!(f, "end-signaled"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Lock-guarded session state shared by the connection and its receive loop.
#[derive(Debug)]
pub(crate) struct SessionStateCell {
    inner: Mutex<SessionState>,
}

impl SessionStateCell {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(SessionState::Connected),
        }
    }

    pub(crate) fn get(&self) -> SessionState {
        *self.inner.lock()
    }

    /// `Connected → EndSignaled`.
    ///
    /// Returns `true` only for the caller that performed the transition.
    pub(crate) fn begin_end_of_input(&self) -> bool {
        let mut state = self.inner.lock();
        if *state == SessionState::Connected {
            *state = SessionState::EndSignaled;
            true
        } else {
            false
        }
    }

    /// Any state `→ Closed`. Returns the previous state.
    pub(crate) fn close(&self) -> SessionState {
        std::mem::replace(&mut *self.inner.lock(), SessionState::Closed)
    }
}
