//! Error channel.
//!
//! A single sink holding at most one reportable failure. The chrome
//! subscribes to it; reporting replaces whatever was visible.

use serde::Serialize;
use tokio::sync::watch;

use crate::load::{FailureKind, LoadFailure};
use crate::source::Revision;

/// A failure reported for the current revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewError {
    /// Revision the failure belongs to
    pub revision: Revision,

    /// The normalized failure
    #[serde(flatten)]
    pub failure: LoadFailure,
}

impl PreviewError {
    /// Create an error for `revision`.
    pub fn new(revision: Revision, failure: LoadFailure) -> Self {
        Self { revision, failure }
    }

    /// Kind of the underlying failure.
    pub fn kind(&self) -> FailureKind {
        self.failure.kind
    }
}

impl std::fmt::Display for PreviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.failure, self.revision)
    }
}

/// Holds the one visible error.
#[derive(Debug)]
pub struct ErrorChannel {
    tx: watch::Sender<Option<PreviewError>>,
}

impl ErrorChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Replace the visible error, returning the one it replaced.
    pub fn report(&self, error: PreviewError) -> Option<PreviewError> {
        self.tx.send_replace(Some(error))
    }

    /// Remove the visible error, if any.
    pub fn clear(&self) -> Option<PreviewError> {
        // Only notify subscribers when something actually changes.
        let mut previous = None;
        self.tx.send_if_modified(|current| {
            previous = current.take();
            previous.is_some()
        });
        previous
    }

    /// The visible error.
    pub fn current(&self) -> Option<PreviewError> {
        self.tx.borrow().clone()
    }

    /// Whether an error is visible.
    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_none()
    }

    /// Receiver for the chrome.
    pub fn subscribe(&self) -> watch::Receiver<Option<PreviewError>> {
        self.tx.subscribe()
    }
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new()
    }
}
