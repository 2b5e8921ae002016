use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParticulateReading {
    pub pm1: f64,
    pub pm2_5: f64,
    pub pm10: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateReading {
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GasReading {
    pub co: u16,
    pub nox: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// One coherent set of readings across all sensor domains, sampled at the
/// same logical instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub pm1: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub co: u16,
    pub nox: u16,
    pub latitude: f64,
    pub longitude: f64,
}

impl TelemetrySnapshot {
    pub fn assemble(
        pm: &ParticulateReading,
        climate: &ClimateReading,
        gas: &GasReading,
        gps: &GpsFix,
    ) -> Self {
        Self {
            pm1: pm.pm1,
            pm2_5: pm.pm2_5,
            pm10: pm.pm10,
            temperature: climate.temperature,
            humidity: climate.humidity,
            co: gas.co,
            nox: gas.nox,
            latitude: gps.latitude,
            longitude: gps.longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DeltaThresholds {
    pub pm: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub co: f64,
    pub nox: f64,
    pub geo: f64,
}

impl Default for DeltaThresholds {
    fn default() -> Self {
        Self {
            pm: 0.25,
            temperature: 1.0,
            humidity: 1.0,
            co: 30.0,
            nox: 1.0,
            geo: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTrigger {
    Delta(&'static str),
    Interval,
}

/// Decides when a fresh snapshot is worth publishing: any single field
/// moving by at least its threshold, or the maximum interval elapsing.
#[derive(Debug, Clone)]
pub struct PublishEngine {
    thresholds: DeltaThresholds,
    max_interval_secs: i64,
    baseline: TelemetrySnapshot,
    next_deadline_epoch: i64,
}

impl PublishEngine {
    pub fn new(
        thresholds: DeltaThresholds,
        max_interval_secs: i64,
        initial: TelemetrySnapshot,
        now_epoch: i64,
    ) -> Self {
        Self {
            thresholds,
            max_interval_secs,
            baseline: initial,
            next_deadline_epoch: now_epoch + max_interval_secs,
        }
    }

    pub fn baseline(&self) -> &TelemetrySnapshot {
        &self.baseline
    }

    pub fn trigger(&self, fresh: &TelemetrySnapshot, now_epoch: i64) -> Option<PublishTrigger> {
        let t = &self.thresholds;
        let b = &self.baseline;

        let deltas: [(&'static str, f64, f64); 9] = [
            ("pm1", fresh.pm1 - b.pm1, t.pm),
            ("pm2_5", fresh.pm2_5 - b.pm2_5, t.pm),
            ("pm10", fresh.pm10 - b.pm10, t.pm),
            ("temperature", fresh.temperature - b.temperature, t.temperature),
            ("humidity", fresh.humidity - b.humidity, t.humidity),
            ("co", fresh.co as f64 - b.co as f64, t.co),
            ("nox", fresh.nox as f64 - b.nox as f64, t.nox),
            ("latitude", fresh.latitude - b.latitude, t.geo),
            ("longitude", fresh.longitude - b.longitude, t.geo),
        ];

        for (field, delta, threshold) in deltas {
            if delta.abs() >= threshold {
                return Some(PublishTrigger::Delta(field));
            }
        }

        if now_epoch >= self.next_deadline_epoch {
            return Some(PublishTrigger::Interval);
        }

        None
    }

    pub fn mark_published(&mut self, fresh: &TelemetrySnapshot, now_epoch: i64) {
        self.baseline = *fresh;
        self.next_deadline_epoch = now_epoch + self.max_interval_secs;
    }
}

/// Formats the wire record published on the telemetry topic. Field names
/// and precision are fixed: two decimals for physical quantities, four for
/// geolocation.
pub fn telemetry_packet(device_id: &str, timestamp: i64, s: &TelemetrySnapshot) -> String {
    format!(
        "{{\"DEVICE_ID\": \"{}\", \"TIMESTAMP\": {}, \"PM1\": {:.2}, \"PM25\": {:.2}, \"PM10\": {:.2}, \"TEMP\": {:.2}, \"HUM\": {:.2}, \"CO\": {}, \"NOX\": {}, \"LAT\": {:.4}, \"LON\": {:.4}}}",
        device_id,
        timestamp,
        s.pm1,
        s.pm2_5,
        s.pm10,
        s.temperature,
        s.humidity,
        s.co,
        s.nox,
        s.latitude,
        s.longitude,
    )
}
