pub mod commands;
pub mod config;
pub mod credentials;
pub mod http;
pub mod registration;
pub mod session;
pub mod telemetry;
pub mod topics;

pub use commands::Command;
pub use config::{HttpConfig, MqttConfig, NodeConfig, RegistrationEndpoint, TelemetryConfig};
pub use credentials::{CredentialError, CredentialSource, CredentialToken};
pub use registration::RegistrationInfo;
pub use session::{DisconnectOutcome, SessionPolicy};
pub use telemetry::{
    ClimateReading, DeltaThresholds, GasReading, GpsFix, ParticulateReading, PublishEngine,
    PublishTrigger, TelemetrySnapshot,
};
pub use topics::{DeviceTopics, MQTT_USERNAME};
