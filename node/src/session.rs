//! Broker session manager: owns the single outbound MQTT client, the
//! credential-driven reconnect cycle, and the periodic telemetry loop.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use rumqttc::{
    AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS, TlsConfiguration, Transport,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use airnode_common::telemetry::telemetry_packet;
use airnode_common::{
    commands, Command, CredentialSource, DeviceTopics, DisconnectOutcome, MqttConfig, NodeConfig,
    PublishEngine, SessionPolicy, TelemetryConfig, MQTT_USERNAME,
};

use crate::control::DeviceControl;
use crate::net::NetHandle;
use crate::ota::OtaHandle;
use crate::sensors::SensorSuite;
use crate::store::NodeStore;

/// Parses command-topic payloads inside the delivery path and forwards
/// recognized commands. Must not block: both targets are flag flips and
/// channel sends.
#[derive(Clone)]
pub struct CommandDispatcher {
    ota: OtaHandle,
    device: DeviceControl,
}

impl CommandDispatcher {
    pub fn new(ota: OtaHandle, device: DeviceControl) -> Self {
        Self { ota, device }
    }

    pub fn dispatch(&self, payload: &[u8]) {
        match commands::parse(payload) {
            Some(Command::Restart) => self.device.request_restart("broker command"),
            Some(Command::Ota(filename)) => {
                if self.ota.begin(&filename) {
                    info!("ota update requested for `{filename}`");
                    self.ota.trigger();
                } else {
                    info!("ignoring ota command; an update is already in flight");
                }
            }
            None => debug!("ignoring unrecognized command payload"),
        }
    }
}

struct Link {
    client: AsyncClient,
    pump: JoinHandle<()>,
}

pub struct SessionManager {
    mqtt: MqttConfig,
    telemetry: TelemetryConfig,
    topics: DeviceTopics,
    device_id: String,
    policy: Arc<StdMutex<SessionPolicy>>,
    credentials: Arc<dyn CredentialSource>,
    ca_cert: Option<Vec<u8>>,
    net: NetHandle,
    sensors: SensorSuite,
    store: NodeStore,
    ota: OtaHandle,
    dispatcher: CommandDispatcher,
    device: DeviceControl,
    link: Option<Link>,
}

impl SessionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &NodeConfig,
        net: NetHandle,
        store: NodeStore,
        ota: OtaHandle,
        device: DeviceControl,
        credentials: Arc<dyn CredentialSource>,
        ca_cert: Option<Vec<u8>>,
    ) -> Self {
        let topics = DeviceTopics::new(
            &config.mqtt.project_id,
            &config.mqtt.region,
            &config.mqtt.registry,
            &config.device_mac,
            &config.mqtt.events_suite,
        );
        let policy = SessionPolicy::new(config.mqtt.reconnect_secs, config.mqtt.fault_threshold);
        let dispatcher = CommandDispatcher::new(ota.clone(), device.clone());

        Self {
            mqtt: config.mqtt.clone(),
            telemetry: config.telemetry.clone(),
            device_id: airnode_common::topics::device_id(&config.device_mac),
            topics,
            policy: Arc::new(StdMutex::new(policy)),
            credentials,
            ca_cert,
            net,
            sensors: SensorSuite::new(),
            store,
            ota,
            dispatcher,
            device,
            link: None,
        }
    }

    pub async fn run(mut self) {
        // Gate on the connectivity signal before the first connect.
        let mut connectivity = self.net.watch_connectivity();
        loop {
            if *connectivity.borrow() {
                break;
            }
            if connectivity.changed().await.is_err() {
                return;
            }
        }

        // Grace period for sensors to produce stable readings and for any
        // pending firmware update to land first.
        tokio::time::sleep(Duration::from_secs(self.mqtt.startup_grace_secs)).await;

        let initial = self.sensors.read().snapshot();
        let mut engine = PublishEngine::new(
            self.telemetry.thresholds,
            self.telemetry.publish_max_secs,
            initial,
            now_epoch(),
        );

        if let Err(err) = self.connect().await {
            warn!("broker connect failed: {err:#}");
        }

        while self.net.is_connected() {
            let now = now_epoch();

            // Renewal takes priority over telemetry: nothing is published
            // over a session known to be expired or disconnected.
            if self.reconnect_due(now) {
                self.teardown().await;
                tokio::time::sleep(Duration::from_secs(self.mqtt.cooldown_secs)).await;
                if let Err(err) = self.connect().await {
                    warn!("broker reconnect failed: {err:#}");
                }
            } else {
                let fresh = self.sensors.read().snapshot();

                if let Some(trigger) = engine.trigger(&fresh, now) {
                    if self.ota.is_in_progress() {
                        info!("telemetry publish deferred; ota in progress");
                    } else {
                        debug!("telemetry trigger: {trigger:?}");
                        let packet = telemetry_packet(&self.device_id, now, &fresh);
                        self.publish(&self.topics.telemetry, packet.into_bytes()).await;
                        engine.mark_published(&fresh, now);
                    }
                }

                // The state heartbeat goes out every cycle even when
                // telemetry is suppressed; the remote side treats it as
                // proof of life.
                let version = self.store.firmware_version().await;
                self.publish(&self.topics.state, version.into_bytes()).await;
            }

            tokio::time::sleep(Duration::from_secs(self.mqtt.cycle_secs)).await;
        }

        info!("connectivity lost; closing broker session");
        self.teardown().await;
    }

    fn reconnect_due(&self, now_epoch: i64) -> bool {
        self.policy.lock().unwrap().reconnect_due(now_epoch)
    }

    async fn connect(&mut self) -> anyhow::Result<()> {
        let token = self.credentials.issue(&self.mqtt.project_id)?;
        info!(
            "opening broker session to {}:{} (credential expires {})",
            self.mqtt.host,
            self.mqtt.port,
            token.expires_epoch()
        );

        let mut options =
            MqttOptions::new(self.topics.client_id.clone(), self.mqtt.host.clone(), self.mqtt.port);
        options.set_keep_alive(Duration::from_secs(self.mqtt.keepalive_secs));
        if let Some(ca) = &self.ca_cert {
            options.set_transport(Transport::Tls(TlsConfiguration::Simple {
                ca: ca.clone(),
                alpn: None,
                client_auth: None,
            }));
        }
        // The token moves into the session options here and is gone;
        // the next attempt has to mint a fresh one.
        options.set_credentials(MQTT_USERNAME, token.into_secret());

        let (client, eventloop) = AsyncClient::new(options, 64);
        let pump = spawn_event_pump(
            eventloop,
            client.clone(),
            self.topics.command.clone(),
            Arc::clone(&self.policy),
            self.dispatcher.clone(),
            self.device.clone(),
        );
        self.link = Some(Link { client, pump });
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(link) = self.link.take() {
            if let Err(err) = link.client.disconnect().await {
                debug!("session disconnect: {err}");
            }
            link.pump.abort();
        }
        self.policy.lock().unwrap().mark_closed();
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) {
        let Some(link) = &self.link else {
            debug!("no active session; dropping publish to {topic}");
            return;
        };
        if let Err(err) = link
            .client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
        {
            warn!("publish to {topic} failed: {err}");
        }
    }
}

/// Drives the transport event loop for one session. Reconnection is not
/// delegated to the transport: the pump exits on the first connection
/// error and the control loop decides what happens next.
fn spawn_event_pump(
    mut eventloop: EventLoop,
    client: AsyncClient,
    command_topic: String,
    policy: Arc<StdMutex<SessionPolicy>>,
    dispatcher: CommandDispatcher,
    device: DeviceControl,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("broker session established");
                    if let Err(err) = client.subscribe(&command_topic, QoS::AtLeastOnce).await {
                        warn!("command topic subscribe failed: {err}");
                    }
                    policy.lock().unwrap().on_connected(now_epoch());
                }
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if message.topic == command_topic {
                        dispatcher.dispatch(&message.payload);
                    }
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    debug!("broker sent disconnect");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("broker connection lost: {err}");
                    let outcome = policy.lock().unwrap().on_disconnected();
                    if outcome == DisconnectOutcome::Restart {
                        device.request_restart("session fault threshold reached");
                    }
                    break;
                }
            }
        }
    })
}

fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ota::spawn_ota_worker;

    #[tokio::test]
    async fn restart_command_reaches_the_device() {
        let (device, mut requests) = DeviceControl::channel();
        let dispatcher = CommandDispatcher::new(spawn_ota_worker(), device);

        dispatcher.dispatch(b"restart");

        assert!(requests.recv().await.is_some());
    }

    #[tokio::test]
    async fn ota_command_triggers_once_until_completion() {
        let (device, _requests) = DeviceControl::channel();
        let ota = spawn_ota_worker();
        let dispatcher = CommandDispatcher::new(ota.clone(), device);

        dispatcher.dispatch(b"ota firmware_v3.bin");
        assert!(ota.is_in_progress());
        assert_eq!(ota.target(), Some("firmware_v3.bin".to_string()));

        dispatcher.dispatch(b"ota firmware_v4.bin");
        assert_eq!(ota.target(), Some("firmware_v3.bin".to_string()));

        ota.complete();
        dispatcher.dispatch(b"ota firmware_v4.bin");
        assert_eq!(ota.target(), Some("firmware_v4.bin".to_string()));
    }

    #[tokio::test]
    async fn malformed_commands_are_ignored() {
        let (device, mut requests) = DeviceControl::channel();
        let ota = spawn_ota_worker();
        let dispatcher = CommandDispatcher::new(ota.clone(), device);

        dispatcher.dispatch(b"ota notafirmware.img");
        dispatcher.dispatch(b"reboot");
        dispatcher.dispatch(b"");

        assert!(!ota.is_in_progress());
        assert!(requests.try_recv().is_err());
    }
}
