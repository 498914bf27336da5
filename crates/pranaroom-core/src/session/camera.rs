//! Camera acquisition for pose sessions.
//!
//! The platform hands out a [`CameraStream`]; the session wraps it in a
//! [`CameraLease`] so it is released exactly once, on whichever path the
//! session ends by.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CameraError;

/// A live video stream owned by the session.
pub trait CameraStream: Send {
    /// Human-readable device name.
    fn label(&self) -> String;

    /// Stop capture and free the device. Called at most once by a lease.
    fn release(&mut self);
}

pub type CameraResult = Result<Box<dyn CameraStream>, CameraError>;

/// Pending acquisition. Resolves once, with a stream or the reason there is none.
pub type CameraFuture = Pin<Box<dyn Future<Output = CameraResult> + Send>>;

/// Asynchronous source of camera streams.
pub trait CameraProvider: Send + Sync {
    fn acquire(&self) -> CameraFuture;
}

/// Scoped ownership of a [`CameraStream`].
pub struct CameraLease {
    label: String,
    stream: Option<Box<dyn CameraStream>>,
}

impl CameraLease {
    pub fn new(stream: Box<dyn CameraStream>) -> Self {
        Self {
            label: stream.label(),
            stream: Some(stream),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_held(&self) -> bool {
        self.stream.is_some()
    }

    /// Release the stream. Returns `false` when it was already released.
    pub fn release(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.release();
                debug!(label = %self.label, "camera released");
                true
            }
            None => false,
        }
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CameraLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraLease")
            .field("label", &self.label)
            .field("held", &self.is_held())
            .finish()
    }
}

/// Camera state as seen by the UI and the session report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CameraStatus {
    NotRequired,
    Pending,
    Active { label: String },
    Unavailable { reason: String },
    Released { label: String },
}

impl CameraStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, CameraStatus::Active { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingStream(Arc<AtomicUsize>);

    impl CameraStream for CountingStream {
        fn label(&self) -> String {
            "test cam".into()
        }

        fn release(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn lease_releases_once_across_explicit_and_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut lease = CameraLease::new(Box::new(CountingStream(count.clone())));
        assert_eq!(lease.label(), "test cam");
        assert!(lease.release());
        assert!(!lease.release());
        drop(lease);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_lease_releases_stream() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let lease = CameraLease::new(Box::new(CountingStream(count.clone())));
            assert!(lease.is_held());
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(CameraStatus::Active {
            label: "front".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["label"], "front");
    }
}
