//! Parameters structure for CtlLoop

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use crate::pid::PidGains;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the control loop.
#[derive(Debug, Default, Deserialize)]
pub struct Params {

    // ---- CONTROLLER GAINS ----

    /// Gains for the steering controller, which is driven by the cross track
    /// error.
    pub steer_gains: PidGains,

    /// Gains for the throttle controller, which is driven by the speed error
    /// relative to `target_speed`.
    pub speed_gains: PidGains,

    // ---- SETPOINTS ----

    /// The speed the throttle controller shall regulate the vehicle towards.
    ///
    /// Units: speed units (mph in the simulator)
    pub target_speed: f64,

    // ---- ACTUATOR CAPABILITIES ----

    /// Range of valid steering demands, `[min, max]`.
    pub steer_dem_range: [f64; 2],

    /// Range of valid throttle demands, `[min, max]`.
    pub throttle_dem_range: [f64; 2],

    // ---- FRAME TIMING ----

    /// The minimum accepted time step. Substituted when the input time step
    /// is zero or negative, so the derivative estimate never divides by zero.
    ///
    /// Units: seconds
    pub min_dt_s: f64,

    /// If true the executive supplies the measured inter-frame time to the
    /// controllers. If false every frame is processed with a unit time
    /// step, which is what the shipped gains are tuned for.
    pub use_measured_dt: bool,

    // ---- INTEGRAL LIMITS ----

    /// Optional anti-windup saturation for the steering controller's integral
    /// error. Absent means unbounded accumulation.
    pub steer_i_error_limit: Option<f64>,

    /// Optional anti-windup saturation for the throttle controller's integral
    /// error.
    pub speed_i_error_limit: Option<f64>
}
