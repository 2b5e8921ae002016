use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use airnode_common::{NodeConfig, RegistrationInfo};

const FALLBACK_FIRMWARE_VERSION: &str = "unknown";

/// File-backed stand-in for the device's non-volatile key/value store.
#[derive(Clone)]
pub struct NodeStore {
    data_dir: Arc<PathBuf>,
    config_path: Arc<PathBuf>,
    registration_path: Arc<PathBuf>,
    firmware_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl NodeStore {
    pub fn new() -> Self {
        let data_dir = std::env::var("AIRNODE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.airnode"));
        Self::at(data_dir)
    }

    pub fn at(data_dir: PathBuf) -> Self {
        Self {
            config_path: Arc::new(data_dir.join("node.json")),
            registration_path: Arc::new(data_dir.join("registration.json")),
            firmware_path: Arc::new(data_dir.join("firmware_version")),
            data_dir: Arc::new(data_dir),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub async fn load_config(&self) -> anyhow::Result<NodeConfig> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.config_path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice::<NodeConfig>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(NodeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn load_registration(&self) -> anyhow::Result<Option<RegistrationInfo>> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.registration_path.as_ref()).await {
            Ok(raw) => Ok(Some(serde_json::from_slice::<RegistrationInfo>(&raw)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save_registration(&self, info: &RegistrationInfo) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        self.write_json(self.registration_path.as_ref(), info).await
    }

    /// Currently installed firmware version, as recorded by the OTA
    /// subsystem. Absent until the first update lands.
    pub async fn firmware_version(&self) -> String {
        let _guard = self.lock.lock().await;
        match tokio::fs::read_to_string(self.firmware_path.as_ref()).await {
            Ok(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
            _ => FALLBACK_FIRMWARE_VERSION.to_string(),
        }
    }

    async fn write_json<T: serde::Serialize>(
        &self,
        path: &PathBuf,
        value: &T,
    ) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(path, payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store(label: &str) -> NodeStore {
        let dir = std::env::temp_dir().join(format!("airnode-store-{}-{label}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        NodeStore::at(dir)
    }

    #[tokio::test]
    async fn registration_round_trips() {
        let store = scratch_store("registration");
        assert!(store.load_registration().await.unwrap().is_none());

        let info = RegistrationInfo::new("Ada Lovelace", "ada@example.org", "24A160FFEE01");
        store.save_registration(&info).await.unwrap();

        assert_eq!(store.load_registration().await.unwrap(), Some(info));
    }

    #[tokio::test]
    async fn missing_config_falls_back_to_defaults() {
        let store = scratch_store("config");
        let config = store.load_config().await.unwrap();

        assert_eq!(config.mqtt.fault_threshold, 10);
    }

    #[tokio::test]
    async fn firmware_version_defaults_until_recorded() {
        let store = scratch_store("firmware");
        assert_eq!(store.firmware_version().await, "unknown");

        tokio::fs::create_dir_all(store.data_dir()).await.unwrap();
        tokio::fs::write(store.data_dir().join("firmware_version"), "airnode_v3.bin\n")
            .await
            .unwrap();

        assert_eq!(store.firmware_version().await, "airnode_v3.bin");
    }
}
