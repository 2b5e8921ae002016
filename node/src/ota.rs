use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

struct OtaInner {
    in_progress: AtomicBool,
    target: StdMutex<Option<String>>,
    triggers: mpsc::UnboundedSender<String>,
}

/// Entry points to the firmware-update collaborator: set a target
/// filename, trigger the transfer, and query the single in-flight guard.
/// The guard is cleared only by the worker when a transfer finishes.
#[derive(Clone)]
pub struct OtaHandle {
    inner: Arc<OtaInner>,
}

impl OtaHandle {
    pub fn is_in_progress(&self) -> bool {
        self.inner.in_progress.load(Ordering::SeqCst)
    }

    /// Claims the in-flight guard and records the target filename.
    /// Returns false when an update is already running.
    pub fn begin(&self, filename: &str) -> bool {
        if self.inner.in_progress.swap(true, Ordering::SeqCst) {
            return false;
        }
        *self.inner.target.lock().unwrap() = Some(filename.to_string());
        true
    }

    pub fn trigger(&self) {
        let target = self.inner.target.lock().unwrap().clone();
        match target {
            Some(filename) => {
                let _ = self.inner.triggers.send(filename);
            }
            None => warn!("ota trigger without a target filename"),
        }
    }

    pub fn complete(&self) {
        self.inner.in_progress.store(false, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn target(&self) -> Option<String> {
        self.inner.target.lock().unwrap().clone()
    }
}

/// Spawns the stand-in OTA worker. Hardware integration point: on the
/// device this downloads the named image and flashes the inactive slot
/// before clearing the guard.
pub fn spawn_ota_worker() -> OtaHandle {
    let (triggers, mut trigger_rx) = mpsc::unbounded_channel::<String>();
    let handle = OtaHandle {
        inner: Arc::new(OtaInner {
            in_progress: AtomicBool::new(false),
            target: StdMutex::new(None),
            triggers,
        }),
    };

    let worker = handle.clone();
    tokio::spawn(async move {
        while let Some(filename) = trigger_rx.recv().await {
            info!("ota transfer started for `{filename}`");
            tokio::time::sleep(Duration::from_secs(5)).await;
            worker.complete();
            info!("ota transfer finished for `{filename}`");
        }
    });

    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_admits_one_update_at_a_time() {
        let ota = spawn_ota_worker();

        assert!(!ota.is_in_progress());
        assert!(ota.begin("firmware_v3.bin"));
        assert!(ota.is_in_progress());
        assert_eq!(ota.target(), Some("firmware_v3.bin".to_string()));

        assert!(!ota.begin("firmware_v4.bin"));
        assert_eq!(ota.target(), Some("firmware_v3.bin".to_string()));

        ota.complete();
        assert!(!ota.is_in_progress());
        assert!(ota.begin("firmware_v4.bin"));
    }
}
