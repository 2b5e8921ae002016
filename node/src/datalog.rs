use std::path::PathBuf;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use airnode_common::telemetry::GpsFix;

use crate::sensors::{SensorReadings, SensorSuite};

pub const CSV_HEADER: &str =
    "time,device_id,latitude,longitude,pm1,pm2_5,pm10,temperature,humidity,co,nox\n";

/// Daily files, named from the GPS date so records stay consistent with
/// the fix they were sampled against.
pub fn csv_filename(gps: &GpsFix) -> String {
    format!("{:02}-{:02}-{:02}.csv", gps.year, gps.month, gps.day)
}

pub fn csv_record(device_id: &str, readings: &SensorReadings) -> String {
    let gps = &readings.gps;
    let pm = &readings.particulates;
    let climate = &readings.climate;
    let gas = &readings.gas;
    format!(
        "{:02}:{:02}:{:02},{},{:.4},{:.4},{:.2},{:.2},{:.2},{:.2},{:.2},{},{}\n",
        gps.hour,
        gps.minute,
        gps.second,
        device_id,
        gps.latitude,
        gps.longitude,
        pm.pm1,
        pm.pm2_5,
        pm.pm10,
        climate.temperature,
        climate.humidity,
        gas.co,
        gas.nox,
    )
}

#[derive(Clone)]
pub struct CsvLogger {
    dir: PathBuf,
}

impl CsvLogger {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub async fn append(&self, gps: &GpsFix, record: &str) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(csv_filename(gps));
        let fresh = tokio::fs::metadata(&path).await.is_err();

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        if fresh {
            file.write_all(CSV_HEADER.as_bytes()).await?;
        }
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

pub fn spawn_datalog(logger: CsvLogger, device_id: String, interval_secs: u64) {
    tokio::spawn(async move {
        let mut sensors = SensorSuite::new();
        loop {
            tokio::time::sleep(Duration::from_secs(interval_secs)).await;

            let readings = sensors.read();
            let record = csv_record(&device_id, &readings);
            debug!("datalog record: {}", record.trim_end());

            if let Err(err) = logger.append(&readings.gps, &record).await {
                warn!("datalog append failed: {err:#}");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use airnode_common::telemetry::{ClimateReading, GasReading, ParticulateReading};

    fn sample_readings() -> SensorReadings {
        SensorReadings {
            particulates: ParticulateReading {
                pm1: 8.6,
                pm2_5: 11.2,
                pm10: 13.9,
            },
            climate: ClimateReading {
                temperature: 21.4,
                humidity: 38.0,
            },
            gas: GasReading { co: 52, nox: 4 },
            gps: GpsFix {
                latitude: 40.7608,
                longitude: -111.8910,
                year: 26,
                month: 8,
                day: 7,
                hour: 14,
                minute: 5,
                second: 9,
            },
        }
    }

    #[test]
    fn filename_is_the_gps_date() {
        assert_eq!(csv_filename(&sample_readings().gps), "26-08-07.csv");
    }

    #[test]
    fn record_layout_matches_the_header() {
        let record = csv_record("M24A160FFEE01", &sample_readings());

        assert_eq!(
            record,
            "14:05:09,M24A160FFEE01,40.7608,-111.8910,8.60,11.20,13.90,21.40,38.00,52,4\n"
        );
        assert_eq!(
            record.matches(',').count(),
            CSV_HEADER.matches(',').count()
        );
    }

    #[tokio::test]
    async fn append_writes_header_once() {
        let dir = std::env::temp_dir().join(format!("airnode-datalog-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let logger = CsvLogger::new(dir.clone());
        let readings = sample_readings();
        let record = csv_record("M24A160FFEE01", &readings);

        logger.append(&readings.gps, &record).await.unwrap();
        logger.append(&readings.gps, &record).await.unwrap();

        let contents =
            tokio::fs::read_to_string(dir.join(csv_filename(&readings.gps))).await.unwrap();
        assert_eq!(contents.matches("time,device_id").count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }
}
