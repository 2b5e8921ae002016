use chrono::{Datelike, Timelike, Utc};

use airnode_common::{
    ClimateReading, GasReading, GpsFix, ParticulateReading, TelemetrySnapshot,
};

#[derive(Debug, Clone, Copy)]
pub struct SensorReadings {
    pub particulates: ParticulateReading,
    pub climate: ClimateReading,
    pub gas: GasReading,
    pub gps: GpsFix,
}

impl SensorReadings {
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::assemble(&self.particulates, &self.climate, &self.gas, &self.gps)
    }
}

/// Polls every sensor domain on demand; no state beyond a sample counter
/// lives here. Hardware integration point: on the device these calls read
/// the particulate UART, the temperature/humidity I2C device, the gas ADC
/// channels, and the GPS serial stream.
pub struct SensorSuite {
    tick: u64,
}

impl SensorSuite {
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    pub fn read(&mut self) -> SensorReadings {
        self.tick = self.tick.wrapping_add(1);
        SensorReadings {
            particulates: self.poll_particulates(),
            climate: self.poll_climate(),
            gas: self.poll_gas(),
            gps: self.poll_gps(),
        }
    }

    fn poll_particulates(&self) -> ParticulateReading {
        let wave = (self.tick % 12) as f64 * 0.05;
        ParticulateReading {
            pm1: 8.6 + wave,
            pm2_5: 11.2 + wave * 1.4,
            pm10: 13.9 + wave * 1.8,
        }
    }

    fn poll_climate(&self) -> ClimateReading {
        ClimateReading {
            temperature: 21.4 + (self.tick % 8) as f64 * 0.1,
            humidity: 38.0 + (self.tick % 6) as f64 * 0.4,
        }
    }

    fn poll_gas(&self) -> GasReading {
        GasReading {
            co: 52 + (self.tick % 5) as u16,
            nox: 4 + (self.tick % 3) as u16,
        }
    }

    fn poll_gps(&self) -> GpsFix {
        let now = Utc::now();
        GpsFix {
            latitude: 40.7608,
            longitude: -111.8910,
            year: (now.year() % 100) as u8,
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
        }
    }
}

impl Default for SensorSuite {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_carries_all_domains() {
        let mut suite = SensorSuite::new();
        let readings = suite.read();
        let snapshot = readings.snapshot();

        assert_eq!(snapshot.pm1, readings.particulates.pm1);
        assert_eq!(snapshot.temperature, readings.climate.temperature);
        assert_eq!(snapshot.co, readings.gas.co);
        assert_eq!(snapshot.latitude, readings.gps.latitude);
    }

    #[test]
    fn consecutive_reads_drift() {
        let mut suite = SensorSuite::new();
        let first = suite.read().snapshot();
        let second = suite.read().snapshot();

        assert_ne!(first.pm1, second.pm1);
    }
}
