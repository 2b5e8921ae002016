/// The broker ignores the username but still requires one so the password
/// is read.
pub const MQTT_USERNAME: &str = "unused";

pub fn device_id(mac: &str) -> String {
    format!("M{mac}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTopics {
    pub client_id: String,
    pub telemetry: String,
    pub state: String,
    pub command: String,
}

impl DeviceTopics {
    pub fn new(
        project_id: &str,
        region: &str,
        registry: &str,
        mac: &str,
        events_suite: &str,
    ) -> Self {
        let device = device_id(mac);
        Self {
            client_id: format!(
                "projects/{project_id}/locations/{region}/registries/{registry}/devices/{device}"
            ),
            telemetry: format!("/devices/{device}/events/{events_suite}"),
            state: format!("/devices/{device}/state"),
            command: format!("/devices/{device}/config"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn topics_embed_project_and_device_identity() {
        let topics = DeviceTopics::new(
            "airnode",
            "us-central1",
            "airnode-sensor-registry",
            "24A160FFEE01",
            "airq",
        );

        assert_eq!(
            topics.client_id,
            "projects/airnode/locations/us-central1/registries/airnode-sensor-registry/devices/M24A160FFEE01"
        );
        assert_eq!(topics.telemetry, "/devices/M24A160FFEE01/events/airq");
        assert_eq!(topics.state, "/devices/M24A160FFEE01/state");
        assert_eq!(topics.command, "/devices/M24A160FFEE01/config");
    }
}
