use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

/// Restart surface of the device. A restart is the terminal recovery path,
/// so the request latches: later callers are ignored.
#[derive(Clone)]
pub struct DeviceControl {
    requests: mpsc::UnboundedSender<String>,
    requested: Arc<AtomicBool>,
}

impl DeviceControl {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (requests, receiver) = mpsc::unbounded_channel();
        (
            Self {
                requests,
                requested: Arc::new(AtomicBool::new(false)),
            },
            receiver,
        )
    }

    pub fn request_restart(&self, reason: &str) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        warn!("device restart requested: {reason}");
        let _ = self.requests.send(reason.to_string());
    }

    #[cfg(test)]
    pub(crate) fn restart_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn restart_request_latches_after_the_first() {
        let (control, mut requests) = DeviceControl::channel();

        control.request_restart("first");
        control.request_restart("second");

        assert_eq!(requests.recv().await, Some("first".to_string()));
        assert!(requests.try_recv().is_err());
        assert!(control.restart_requested());
    }
}
