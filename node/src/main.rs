mod assets;
mod auth;
mod control;
mod datalog;
mod net;
mod ota;
mod portal;
mod registration;
mod sensors;
mod session;
mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use airnode_common::{topics, CredentialSource, NodeConfig};

use crate::auth::KeyTokenSource;
use crate::control::DeviceControl;
use crate::datalog::CsvLogger;
use crate::portal::Portal;
use crate::session::SessionManager;
use crate::store::NodeStore;

const DATALOG_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = NodeStore::new();
    let mut config = store.load_config().await.unwrap_or_else(|err| {
        warn!("failed to load node config from store: {err:#}");
        NodeConfig::default()
    });
    apply_env_overrides(&mut config);
    config.sanitize();

    let device_id = topics::device_id(&config.device_mac);
    info!("starting airnode {device_id} (firmware {})", store.firmware_version().await);

    let (device, mut restart_requests) = DeviceControl::channel();
    let net = net::spawn_network_manager(config.http.lock_timeout_ms, &config.device_mac);
    let ota = ota::spawn_ota_worker();

    let listener = TcpListener::bind(("0.0.0.0", config.http.port))
        .await
        .with_context(|| format!("failed to bind the portal on port {}", config.http.port))?;
    let portal = Portal::new(
        net.clone(),
        store.clone(),
        config.http.clone(),
        config.registration.url.clone(),
        config.device_mac.clone(),
    );
    tokio::spawn(portal.run(listener));

    let credentials: Arc<dyn CredentialSource> = match KeyTokenSource::from_file(
        &config.mqtt.private_key_path,
        config.mqtt.token_validity_secs,
    ) {
        Ok(source) => Arc::new(source),
        Err(err) => {
            warn!("{err}; continuing with an ephemeral device key");
            Arc::new(KeyTokenSource::ephemeral(config.mqtt.token_validity_secs))
        }
    };

    let ca_cert = match &config.mqtt.ca_cert_path {
        Some(path) => match tokio::fs::read(path).await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!("root trust anchor unreadable ({err}); connecting without TLS");
                None
            }
        },
        None => None,
    };

    let session = SessionManager::new(
        &config,
        net.clone(),
        store.clone(),
        ota.clone(),
        device.clone(),
        credentials,
        ca_cert,
    );
    tokio::spawn(session.run());

    let logger = CsvLogger::new(store.data_dir().join("datalog"));
    datalog::spawn_datalog(logger, device_id, DATALOG_INTERVAL_SECS);

    let reason = restart_requests
        .recv()
        .await
        .unwrap_or_else(|| "restart channel closed".to_string());
    warn!("restarting device: {reason}");

    // Short grace so queued log lines and responses drain first.
    tokio::time::sleep(Duration::from_millis(500)).await;
    std::process::exit(1);
}

fn apply_env_overrides(config: &mut NodeConfig) {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        config.mqtt.host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.mqtt.port = port;
    }
    if let Ok(mac) = std::env::var("AIRNODE_DEVICE_MAC") {
        config.device_mac = mac;
    }
    if let Some(port) = std::env::var("AIRNODE_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.http.port = port;
    }
}
