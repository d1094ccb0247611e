//! # Status Protocol
//!
//! Message shapes exchanged over the vehicle topics.
//!
//! Lifecycle announcements ([`StatusMessage`]) go to the shared status topic
//! so fleet-wide consumers see every vehicle. Periodic telemetry
//! ([`SensorMessage`]) goes to `<root>/<vehicleId>` so consumers can filter
//! by vehicle.
//!
//! Both shapes serialize to flat JSON objects with camelCase field names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pubsub::{CONTENT_TYPE, LastWill, Message, QoS};
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::simulator::VehicleState;
use crate::{Error, Result};

/// Text of the message the broker publishes when the vehicle disappears.
pub const CONNECTION_LOST_TEXT: &str = "Connection to the vehicle was lost.";

const JSON: &str = "application/json";

/// Vehicle lifecycle states announced to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    /// Simulator constructed and about to start.
    VehicleReady,

    /// Simulator actively ticking.
    VehicleRunning,

    /// Abnormal disconnect, published by the broker as the last will.
    ConnectionLost,

    /// Graceful shutdown.
    VehicleStopped,
}

impl StatusType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VehicleReady => "VEHICLE_READY",
            Self::VehicleRunning => "VEHICLE_RUNNING",
            Self::ConnectionLost => "CONNECTION_LOST",
            Self::VehicleStopped => "VEHICLE_STOPPED",
        }
    }

    /// Whether no further messages are expected from the vehicle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ConnectionLost | Self::VehicleStopped)
    }
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "VEHICLE_READY" => Ok(Self::VehicleReady),
            "VEHICLE_RUNNING" => Ok(Self::VehicleRunning),
            "CONNECTION_LOST" => Ok(Self::ConnectionLost),
            "VEHICLE_STOPPED" => Ok(Self::VehicleStopped),
            _ => Err(Error::InvalidFormat(format!("unknown status type {s:?}"))),
        }
    }
}

/// Lifecycle announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub status: StatusType,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusMessage {
    #[must_use]
    pub fn new(
        vehicle_id: impl Into<String>, status: StatusType, message: impl Into<String>,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            status,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Encode as a JSON message for the status topic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if serialization fails.
    pub fn to_message(&self) -> Result<Message> {
        encode(self)
    }
}

impl TryFrom<&[u8]> for StatusMessage {
    type Error = Error;

    fn try_from(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Telemetry snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorMessage {
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub status: StatusType,
    pub latitude: f64,
    pub longitude: f64,
    pub rpm: f64,
    pub speed_kmh: f64,
    pub gear: i32,
    pub running: bool,
    pub timestamp: DateTime<Utc>,
}

impl SensorMessage {
    /// Snapshot the vehicle's current position and readings.
    #[must_use]
    pub fn from_state(state: &VehicleState, status: StatusType) -> Self {
        Self {
            vehicle_id: state.vehicle_id.clone(),
            status,
            latitude: state.position.latitude,
            longitude: state.position.longitude,
            rpm: state.rpm,
            speed_kmh: state.speed_kmh,
            gear: state.gear,
            running: state.running,
            timestamp: Utc::now(),
        }
    }

    /// Encode as a JSON message for the telemetry topic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if serialization fails.
    pub fn to_message(&self) -> Result<Message> {
        encode(self)
    }
}

impl TryFrom<&[u8]> for SensorMessage {
    type Error = Error;

    fn try_from(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// The `CONNECTION_LOST` announcement to register with the transport before
/// it connects. Published retained with exactly-once delivery.
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] if serialization fails.
pub fn last_will(config: &SimConfig, vehicle_id: &str) -> Result<LastWill> {
    let status = StatusMessage::new(vehicle_id, StatusType::ConnectionLost, CONNECTION_LOST_TEXT);
    let message = status.to_message()?.qos(QoS::ExactlyOnce);
    Ok(LastWill { topic: config.status_topic().to_string(), message, retain: true })
}

fn encode<T: Serialize>(value: &T) -> Result<Message> {
    let payload = serde_json::to_vec(value)?;
    Ok(Message::new(&payload).header(CONTENT_TYPE, JSON))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;

    fn config() -> SimConfig {
        SimConfig {
            topic_root: "vehicles".to_string(),
            tick_interval: Duration::from_secs(1),
            max_speed_kmh: 130.0,
        }
    }

    fn sensor() -> SensorMessage {
        SensorMessage {
            vehicle_id: "postauto".to_string(),
            status: StatusType::VehicleRunning,
            latitude: 49.00249,
            longitude: 8.48501,
            rpm: 2_345.678_9,
            speed_kmh: 64.528_123,
            gear: 4,
            running: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn status_type_names() {
        for status in [
            StatusType::VehicleReady,
            StatusType::VehicleRunning,
            StatusType::ConnectionLost,
            StatusType::VehicleStopped,
        ] {
            let json = serde_json::to_value(status).expect("should serialize");
            assert_eq!(json, Value::String(status.to_string()));
            assert_eq!(status.as_str().parse::<StatusType>(), Ok(status));
        }

        assert!("VEHICLE_PARKED".parse::<StatusType>().is_err());
        assert!(StatusType::VehicleStopped.is_terminal());
        assert!(!StatusType::VehicleRunning.is_terminal());
    }

    #[test]
    fn status_wire_shape() {
        let status = StatusMessage::new("postauto", StatusType::VehicleReady, "ready");
        let json = serde_json::to_value(&status).expect("should serialize");

        let Value::Object(fields) = &json else { panic!("expected a JSON object") };
        assert_eq!(fields.len(), 4);
        assert_eq!(json["vehicleId"], json!("postauto"));
        assert_eq!(json["type"], json!("VEHICLE_READY"));
        assert_eq!(json["message"], json!("ready"));
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn sensor_wire_shape() {
        let json = serde_json::to_value(sensor()).expect("should serialize");

        let Value::Object(fields) = &json else { panic!("expected a JSON object") };
        let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "gear",
                "latitude",
                "longitude",
                "rpm",
                "running",
                "speedKmh",
                "timestamp",
                "type",
                "vehicleId"
            ]
        );
        assert!(fields.values().all(|v| !v.is_object() && !v.is_array()));
    }

    #[test]
    fn sensor_round_trip() {
        let sent = sensor();
        let message = sent.to_message().expect("should encode");
        let decoded = SensorMessage::try_from(message.payload.as_slice()).expect("should decode");

        assert_eq!(decoded.vehicle_id, sent.vehicle_id);
        assert_eq!(decoded.status, sent.status);
        assert_eq!(decoded.gear, sent.gear);
        assert_eq!(decoded.running, sent.running);
        assert_eq!(decoded.timestamp, sent.timestamp);
        assert!((decoded.latitude - sent.latitude).abs() < 1e-6);
        assert!((decoded.longitude - sent.longitude).abs() < 1e-6);
        assert!((decoded.rpm - sent.rpm).abs() < 1e-6);
        assert!((decoded.speed_kmh - sent.speed_kmh).abs() < 1e-6);
    }

    #[test]
    fn status_round_trip() {
        let sent = StatusMessage::new("postauto", StatusType::VehicleStopped, "stopped");
        let message = sent.to_message().expect("should encode");

        assert_eq!(message.headers.get(CONTENT_TYPE).map(String::as_str), Some(JSON));
        assert_eq!(StatusMessage::try_from(message.payload.as_slice()), Ok(sent));
    }

    #[test]
    fn reject_unknown_type() {
        let payload = json!({
            "vehicleId": "postauto",
            "type": "VEHICLE_PARKED",
            "message": "",
            "timestamp": "2026-10-18T09:00:00Z"
        })
        .to_string();
        let err = StatusMessage::try_from(payload.as_bytes()).expect_err("should fail");
        assert_eq!(err.code(), "invalid_format");
    }

    #[test]
    fn connection_lost_will() {
        let will = last_will(&config(), "postauto").expect("should build");

        assert_eq!(will.topic, "vehicles");
        assert!(will.retain);
        assert_eq!(will.message.qos, QoS::ExactlyOnce);

        let status =
            StatusMessage::try_from(will.message.payload.as_slice()).expect("should decode");
        assert_eq!(status.vehicle_id, "postauto");
        assert_eq!(status.status, StatusType::ConnectionLost);
        assert_eq!(status.message, CONNECTION_LOST_TEXT);
    }
}
