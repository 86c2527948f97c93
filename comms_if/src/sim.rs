//! # Vehicle Simulator Interface
//!
//! This module defines the messages exchanged with the vehicle simulator. The
//! simulator sends one event per control frame, either a telemetry event
//! carrying the vehicle state or a manual event indicating that the vehicle is
//! being driven by hand. The software replies with actuation demands, or with
//! an empty acknowledgement while in manual driving.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The acknowledgement sent verbatim in response to a manual driving event.
pub const MANUAL_ACK: &str = "{}";

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// An event recieved from the vehicle simulator.
///
/// One event arrives per control frame. The `event` field of the JSON message
/// discriminates between a telemetry frame and the manual driving condition.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SimEvent {
    /// The vehicle state for this frame.
    Telemetry(TelemetryMsg),

    /// No active telemetry, the vehicle is under manual control.
    Manual
}

/// Possible errors when decoding a telemetry message into a [`Telemetry`]
/// record.
#[derive(Debug, Error)]
pub enum TelemetryParseError {
    #[error("Telemetry field `{field}` is not a number (got {value:?})")]
    NotANumber {
        field: &'static str,
        value: String
    },

    #[error("Telemetry field `{field}` is not finite (got {value})")]
    NotFinite {
        field: &'static str,
        value: f64
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A telemetry message as it appears on the wire.
///
/// The simulator encodes all numeric fields as text, so this struct must be
/// decoded into a [`Telemetry`] record before it can be used.
#[derive(Debug, Serialize, Deserialize)]
pub struct TelemetryMsg {
    /// Cross track error, the perpendicular distance between the vehicle and
    /// the reference path.
    pub cte: String,

    /// Vehicle speed.
    pub speed: String,

    /// The steering angle currently reported by the vehicle. Informational
    /// only, not used in the control computation.
    pub steering_angle: String
}

/// A decoded telemetry record.
#[derive(Debug, Clone, Copy)]
pub struct Telemetry {
    /// Cross track error.
    ///
    /// Units: path-perpendicular distance units
    pub cte: f64,

    /// Vehicle speed.
    ///
    /// Units: speed units (mph in the simulator)
    pub speed: f64,

    /// The steering angle reported by the vehicle.
    ///
    /// Units: degrees
    pub steering_angle: f64
}

/// Actuation demands sent to the vehicle in response to a telemetry event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VehDems {
    /// Steering demand, normalised to [-1, +1].
    pub steering_angle: f64,

    /// Throttle demand, normalised to [0, 1].
    pub throttle: f64
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TelemetryMsg {
    /// Decode the wire message into a typed telemetry record.
    ///
    /// Fails if any field does not parse as a finite number. A failed decode
    /// means the frame must be discarded, it must never reach the controllers.
    pub fn decode(&self) -> Result<Telemetry, TelemetryParseError> {
        Ok(Telemetry {
            cte: parse_field("cte", &self.cte)?,
            speed: parse_field("speed", &self.speed)?,
            steering_angle: parse_field("steering_angle", &self.steering_angle)?
        })
    }
}

impl Default for VehDems {
    fn default() -> Self {
        // Neutral demands, straight ahead with no throttle
        Self {
            steering_angle: 0.0,
            throttle: 0.0
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse a single text-encoded telemetry field into a finite `f64`.
fn parse_field(field: &'static str, value: &str) -> Result<f64, TelemetryParseError> {
    let num: f64 = value.trim().parse().map_err(|_| TelemetryParseError::NotANumber {
        field,
        value: value.to_string()
    })?;

    if !num.is_finite() {
        return Err(TelemetryParseError::NotFinite { field, value: num })
    }

    Ok(num)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_telemetry_event_decode() {
        let event: SimEvent = serde_json::from_str(
            r#"{"event": "telemetry", "data": {"cte": "0.7598", "speed": "4.389708", "steering_angle": "0"}}"#
        ).unwrap();

        let msg = match event {
            SimEvent::Telemetry(m) => m,
            SimEvent::Manual => panic!("Expected a telemetry event")
        };

        let telem = msg.decode().unwrap();
        assert!((telem.cte - 0.7598).abs() < 1e-12);
        assert!((telem.speed - 4.389708).abs() < 1e-12);
        assert_eq!(telem.steering_angle, 0.0);
    }

    #[test]
    fn test_manual_event_decode() {
        let event: SimEvent = serde_json::from_str(r#"{"event": "manual"}"#).unwrap();

        match event {
            SimEvent::Manual => (),
            SimEvent::Telemetry(_) => panic!("Expected a manual event")
        }
    }

    #[test]
    fn test_missing_field_rejected() {
        let result: Result<SimEvent, _> = serde_json::from_str(
            r#"{"event": "telemetry", "data": {"cte": "0.7598", "speed": "4.389708"}}"#
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_garbage_field_rejected() {
        let msg = TelemetryMsg {
            cte: "not-a-number".into(),
            speed: "30".into(),
            steering_angle: "0".into()
        };
        assert!(matches!(
            msg.decode(),
            Err(TelemetryParseError::NotANumber { field: "cte", .. })
        ));
    }

    #[test]
    fn test_non_finite_field_rejected() {
        let msg = TelemetryMsg {
            cte: "NaN".into(),
            speed: "30".into(),
            steering_angle: "0".into()
        };
        assert!(matches!(
            msg.decode(),
            Err(TelemetryParseError::NotFinite { field: "cte", .. })
        ));
    }

    #[test]
    fn test_dems_wire_format() {
        let dems = VehDems {
            steering_angle: -0.25,
            throttle: 0.5
        };

        let json = serde_json::to_string(&dems).unwrap();
        assert_eq!(json, r#"{"steering_angle":-0.25,"throttle":0.5}"#);
    }
}
