use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::telemetry::DeltaThresholds;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub project_id: String,
    pub region: String,
    pub registry: String,
    pub events_suite: String,
    pub keepalive_secs: u64,
    pub reconnect_secs: i64,
    pub token_validity_secs: i64,
    pub cooldown_secs: u64,
    pub cycle_secs: u64,
    pub startup_grace_secs: u64,
    pub fault_threshold: u32,
    pub ca_cert_path: Option<PathBuf>,
    pub private_key_path: PathBuf,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "mqtt.googleapis.com".to_string(),
            port: 8883,
            project_id: "airnode".to_string(),
            region: "us-central1".to_string(),
            registry: "airnode-sensor-registry".to_string(),
            events_suite: "airq".to_string(),
            keepalive_secs: 600,
            // Must stay strictly inside the token validity window so the
            // session is renewed before the broker rejects the credential.
            reconnect_secs: 82_800,
            token_validity_secs: 86_400,
            cooldown_secs: 100,
            cycle_secs: 300,
            startup_grace_secs: 60,
            fault_threshold: 10,
            ca_cert_path: None,
            private_key_path: PathBuf::from("./keys/device_key.pem"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
    pub lock_timeout_ms: u64,
    pub max_ssid_len: usize,
    pub max_password_len: usize,
    pub max_name_len: usize,
    pub max_email_len: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 80,
            lock_timeout_ms: 10,
            max_ssid_len: 32,
            max_password_len: 64,
            max_name_len: 64,
            max_email_len: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub thresholds: DeltaThresholds,
    pub publish_max_secs: i64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            thresholds: DeltaThresholds::default(),
            publish_max_secs: 3_300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationEndpoint {
    pub url: String,
}

impl Default for RegistrationEndpoint {
    fn default() -> Self {
        Self {
            url: "http://airdb.example.org/api/registerSensor".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeConfig {
    #[serde(default)]
    pub device_mac: String,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub registration: RegistrationEndpoint,
}

impl NodeConfig {
    pub fn sanitize(&mut self) {
        if self.device_mac.is_empty() {
            self.device_mac = "000000000000".to_string();
        }
        self.device_mac = self.device_mac.to_ascii_uppercase();

        if self.mqtt.token_validity_secs < 3_600 {
            self.mqtt.token_validity_secs = 3_600;
        }
        if self.mqtt.reconnect_secs >= self.mqtt.token_validity_secs {
            self.mqtt.reconnect_secs = self.mqtt.token_validity_secs - 3_600;
        }
        if self.mqtt.reconnect_secs < 60 {
            self.mqtt.reconnect_secs = 60;
        }

        if self.mqtt.cycle_secs == 0 {
            self.mqtt.cycle_secs = 300;
        }
        if self.mqtt.fault_threshold == 0 {
            self.mqtt.fault_threshold = 10;
        }
        if self.http.lock_timeout_ms == 0 {
            self.http.lock_timeout_ms = 10;
        }
        if self.telemetry.publish_max_secs <= 0 {
            self.telemetry.publish_max_secs = 3_300;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sanitize_keeps_reconnect_inside_token_validity() {
        let mut config = NodeConfig::default();
        config.mqtt.reconnect_secs = 90_000;
        config.mqtt.token_validity_secs = 86_400;

        config.sanitize();

        assert_eq!(config.mqtt.reconnect_secs, 82_800);
        assert!(config.mqtt.reconnect_secs < config.mqtt.token_validity_secs);
    }

    #[test]
    fn sanitize_fills_device_mac_placeholder() {
        let mut config = NodeConfig::default();
        config.device_mac = String::new();

        config.sanitize();

        assert_eq!(config.device_mac, "000000000000");
    }

    #[test]
    fn sanitize_uppercases_mac() {
        let mut config = NodeConfig::default();
        config.device_mac = "24a160ffee01".to_string();

        config.sanitize();

        assert_eq!(config.device_mac, "24A160FFEE01");
    }

    #[test]
    fn defaults_match_expected_windows() {
        let config = NodeConfig::default();

        assert_eq!(config.mqtt.reconnect_secs, 82_800);
        assert_eq!(config.mqtt.token_validity_secs, 86_400);
        assert_eq!(config.telemetry.publish_max_secs, 3_300);
        assert_eq!(config.mqtt.fault_threshold, 10);
        assert_eq!(config.http.lock_timeout_ms, 10);
    }
}
