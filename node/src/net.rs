//! Boundary to the external WiFi/network manager: the level-triggered
//! connectivity signal, the lock-protected shared JSON buffers, and the
//! one-way request channel. The core never awaits a reply to a request.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Debug, Error)]
#[error("timed out waiting for the shared state lock")]
pub struct LockTimeout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetRequest {
    Scan,
    Connect,
    Disconnect,
}

#[derive(Debug, Default)]
pub struct JsonBuffers {
    pub ap_list: String,
    pub ip_info: String,
    pub registration: String,
}

#[derive(Clone)]
pub struct NetHandle {
    buffers: Arc<Mutex<JsonBuffers>>,
    lock_timeout: Duration,
    requests: mpsc::UnboundedSender<NetRequest>,
    connectivity: watch::Receiver<bool>,
    staged: Arc<StdMutex<Option<StationConfig>>>,
}

impl NetHandle {
    /// Bounded-wait acquire on the shared buffers. Contention is a normal
    /// branch for callers, not an exception: a stuck holder must never
    /// freeze the portal listener.
    pub async fn lock_buffers(&self) -> Result<MutexGuard<'_, JsonBuffers>, LockTimeout> {
        tokio::time::timeout(self.lock_timeout, self.buffers.lock())
            .await
            .map_err(|_| LockTimeout)
    }

    pub fn scan_async(&self) {
        let _ = self.requests.send(NetRequest::Scan);
    }

    pub fn connect_async(&self) {
        let _ = self.requests.send(NetRequest::Connect);
    }

    pub fn disconnect_async(&self) {
        let _ = self.requests.send(NetRequest::Disconnect);
    }

    pub fn stage_station_config(&self, config: StationConfig) {
        *self.staged.lock().unwrap() = Some(config);
    }

    pub fn is_connected(&self) -> bool {
        *self.connectivity.borrow()
    }

    pub fn watch_connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity.clone()
    }

    #[cfg(test)]
    pub(crate) fn staged_station_config(&self) -> Option<StationConfig> {
        self.staged.lock().unwrap().clone()
    }

    /// Handle with no collaborator task behind it; requests go nowhere.
    #[cfg(test)]
    pub(crate) fn standalone(lock_timeout_ms: u64) -> Self {
        let (requests, _rx) = mpsc::unbounded_channel();
        let (_tx, connectivity) = watch::channel(true);
        Self {
            buffers: Arc::new(Mutex::new(JsonBuffers::default())),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            requests,
            connectivity,
            staged: Arc::new(StdMutex::new(None)),
        }
    }
}

/// Spawns the stand-in network manager. Hardware integration point: on the
/// device this is the WiFi manager task owning scan, association, and the
/// IP stack; here it services the request channel against simulated state.
pub fn spawn_network_manager(lock_timeout_ms: u64, device_mac: &str) -> NetHandle {
    let (requests, mut request_rx) = mpsc::unbounded_channel::<NetRequest>();
    let (connectivity_tx, connectivity) = watch::channel(true);

    let buffers = Arc::new(Mutex::new(JsonBuffers {
        ap_list: simulated_ap_list(),
        ip_info: simulated_ip_info(),
        registration: String::new(),
    }));
    let staged: Arc<StdMutex<Option<StationConfig>>> = Arc::new(StdMutex::new(None));

    let handle = NetHandle {
        buffers: buffers.clone(),
        lock_timeout: Duration::from_millis(lock_timeout_ms),
        requests,
        connectivity,
        staged: staged.clone(),
    };

    let mac = device_mac.to_string();
    tokio::spawn(async move {
        info!("network manager ready ({mac})");
        while let Some(request) = request_rx.recv().await {
            match request {
                NetRequest::Scan => {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    let mut shared = buffers.lock().await;
                    shared.ap_list = simulated_ap_list();
                }
                NetRequest::Connect => {
                    let config = staged.lock().unwrap().take();
                    match config {
                        Some(config) => {
                            info!("associating with `{}`", config.ssid);
                            tokio::time::sleep(Duration::from_millis(500)).await;
                            {
                                let mut shared = buffers.lock().await;
                                shared.ip_info = simulated_ip_info();
                            }
                            let _ = connectivity_tx.send(true);
                        }
                        None => warn!("connect requested without a staged station config"),
                    }
                }
                NetRequest::Disconnect => {
                    info!("dropping station association");
                    {
                        let mut shared = buffers.lock().await;
                        shared.ip_info.clear();
                    }
                    let _ = connectivity_tx.send(false);
                }
            }
        }
    });

    handle
}

fn simulated_ap_list() -> String {
    "[{\"ssid\":\"lab-2g\",\"chan\":1,\"rssi\":-48,\"auth\":3},\
     {\"ssid\":\"campus\",\"chan\":6,\"rssi\":-67,\"auth\":3},\
     {\"ssid\":\"guest\",\"chan\":11,\"rssi\":-80,\"auth\":0}]"
        .to_string()
}

fn simulated_ip_info() -> String {
    "{\"ip\":\"192.168.1.51\",\"netmask\":\"255.255.255.0\",\"gw\":\"192.168.1.1\",\"urc\":0}"
        .to_string()
}
