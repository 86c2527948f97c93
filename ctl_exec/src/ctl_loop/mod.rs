//! Control loop module
//!
//! The control loop converts one frame of vehicle telemetry into actuation
//! demands. It owns the two PID controllers (steering and throttle), clamps
//! their raw outputs to the actuator ranges, and keeps the loop-level
//! diagnostics used for offline tuning.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

use util::params as util_params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The time step assumed between telemetry frames when measured frame timing
/// is disabled.
///
/// Units: seconds
pub const UNIT_TIME_STEP_S: f64 = 1.0;

/// Threshold below which the frame-to-frame change in cross track error is
/// treated as stationary by the direction-reversal diagnostic.
pub(crate) const DELTA_CTE_STATIONARY: f64 = 0.001;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during initialisation of the module.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Failed to load the parameter file: {0}")]
    ParamLoadError(#[from] util_params::LoadError),

    #[error("Failed to initialise the status report archive: {0}")]
    ArchInitError(String)
}

/// Possible errors that can occur during CtlLoop processing.
#[derive(Debug, thiserror::Error)]
pub enum CtlLoopError {
    #[error("The module must be initialised before processing")]
    NotInit
}
