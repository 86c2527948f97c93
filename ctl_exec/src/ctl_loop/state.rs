//! Implementations for the CtlLoop state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use serde::Serialize;

// Internal
use super::{CtlLoopError, InitError, Params, DELTA_CTE_STATIONARY};
use crate::pid::Pid;
use comms_if::sim::{Telemetry, VehDems};
use util::{
    params,
    maths::clamp,
    module::State,
    archive::{Archived, Archiver},
    session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Control loop module state
pub struct CtlLoop {

    pub(crate) params: Params,

    /// Steering controller, driven by the cross track error. `None` until
    /// `init` has run.
    steer_pid: Option<Pid>,

    /// Throttle controller, driven by the speed error. `None` until `init`
    /// has run.
    speed_pid: Option<Pid>,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    /// Minimum absolute cross track error seen since the last direction
    /// reversal.
    min_abs_cte: f64,

    /// The cross track error of the previous frame.
    last_cte: f64,

    /// The frame-to-frame change in cross track error of the previous frame.
    last_delta_cte: f64,

    /// Number of telemetry frames processed since initialisation.
    num_frames: u64
}

/// Input data to the control loop.
pub struct InputData {
    /// The decoded telemetry for this frame, or `None` if the vehicle is
    /// under manual control this frame.
    pub telem: Option<Telemetry>,

    /// Elapsed time since the previous telemetry frame.
    ///
    /// Units: seconds
    pub dt_s: f64
}

/// Output data from the control loop.
#[derive(Clone, Copy, Debug)]
pub enum OutputData {
    /// Demands the vehicle must actuate this frame.
    Dems(VehDems),

    /// The vehicle is driven manually, acknowledge without actuating.
    ManualAck
}

/// Status report for CtlLoop processing.
///
/// Diagnostic only, nothing in here feeds back into the control computation.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Cross track error of this frame
    pub cte: f64,

    /// Vehicle speed of this frame
    pub speed: f64,

    /// Steering angle reported by the vehicle, informational only
    pub reported_steering_angle: f64,

    /// Clamped steering demand
    pub steer_dem: f64,

    /// Clamped throttle demand
    pub throttle_dem: f64,

    /// Minimum absolute cross track error seen since the last direction
    /// reversal
    pub min_abs_cte: f64,

    /// Average squared cross track error over all processed frames
    pub avg_sq_error: f64,

    /// True if the raw steering value exceeded the actuator range
    pub steer_dem_limited: bool,

    /// True if the raw throttle value exceeded the actuator range
    pub throttle_dem_limited: bool,

    /// True if the input time step was non-positive and the minimum safe step
    /// was substituted
    pub dt_substituted: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CtlLoop {
    fn default() -> Self {
        Self {
            params: Params::default(),
            steer_pid: None,
            speed_pid: None,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
            min_abs_cte: std::f64::MAX,
            last_cte: 0.0,
            // Non-zero so that the very first frame is not flagged as a
            // reversal by the stationary check
            last_delta_cte: 0.1,
            num_frames: 0
        }
    }
}

impl State for CtlLoop {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = CtlLoopError;

    /// Initialise the CtlLoop module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        self.params = params::load(init_data)?;

        // Build the controllers from the loaded gains
        self.steer_pid = Some(build_pid(
            &self.params.steer_gains,
            self.params.steer_i_error_limit
        ));
        self.speed_pid = Some(build_pid(
            &self.params.speed_gains,
            self.params.speed_i_error_limit
        ));

        // Create the arch folder for ctl_loop
        let mut arch_path = session.arch_root.clone();
        arch_path.push("ctl_loop");
        std::fs::create_dir_all(arch_path)
            .map_err(|e| InitError::ArchInitError(e.to_string()))?;

        // Initialise the archiver
        self.arch_report = Archiver::from_path(
            session, "ctl_loop/status_report.csv"
        ).map_err(|e| InitError::ArchInitError(e.to_string()))?;

        Ok(())
    }

    /// Perform cyclic processing of the control loop.
    ///
    /// One telemetry frame produces one set of actuation demands. A manual
    /// frame produces an acknowledgement and leaves all controller state
    /// untouched.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // The controllers exist if and only if init has run
        let (steer_pid, speed_pid) = match (self.steer_pid.as_mut(), self.speed_pid.as_mut()) {
            (Some(steer), Some(speed)) => (steer, speed),
            _ => return Err(CtlLoopError::NotInit)
        };

        // Clear the status report
        self.report = StatusReport::default();

        // Manual driving frames are acknowledged without running either
        // controller or counting the frame
        let telem = match input_data.telem {
            Some(t) => t,
            None => return Ok((OutputData::ManualAck, self.report))
        };

        // Guard the time step before it reaches the derivative estimate
        let mut dt_s = input_data.dt_s;
        if dt_s <= 0.0 {
            warn!(
                "Non-positive time step ({} s), substituting the minimum safe step",
                dt_s
            );
            dt_s = self.params.min_dt_s;
            self.report.dt_substituted = true;
        }

        self.num_frames += 1;

        // Direction reversal diagnostic. If the previous delta was effectively
        // zero, or this delta has the opposite sign, the vehicle is at a
        // stationary point or crossing the path, record the closest approach.
        let delta_cte = telem.cte - self.last_cte;

        if self.last_delta_cte.abs() < DELTA_CTE_STATIONARY
            || delta_cte * self.last_delta_cte < 0.0
        {
            if telem.cte.abs() < self.min_abs_cte {
                self.min_abs_cte = telem.cte.abs();
            }
        }

        self.last_cte = telem.cte;
        self.last_delta_cte = delta_cte;

        // Steering, driven directly by the cross track error
        steer_pid.update_error(telem.cte, dt_s);
        let steer_raw = steer_pid.control_value();
        let steer_dem = clamp(
            &steer_raw,
            &self.params.steer_dem_range[0],
            &self.params.steer_dem_range[1]
        );
        if steer_dem != steer_raw {
            self.report.steer_dem_limited = true;
        }

        // Throttle, driven by the speed recentered around the target
        speed_pid.update_error(telem.speed - self.params.target_speed, dt_s);
        let throttle_raw = speed_pid.control_value();
        let throttle_dem = clamp(
            &throttle_raw,
            &self.params.throttle_dem_range[0],
            &self.params.throttle_dem_range[1]
        );
        if throttle_dem != throttle_raw {
            self.report.throttle_dem_limited = true;
        }

        // Fill in the status report
        self.report.cte = telem.cte;
        self.report.speed = telem.speed;
        self.report.reported_steering_angle = telem.steering_angle;
        self.report.steer_dem = steer_dem;
        self.report.throttle_dem = throttle_dem;
        self.report.min_abs_cte = self.min_abs_cte;
        self.report.avg_sq_error = steer_pid.total_error() / self.num_frames as f64;

        debug!(
            "MIN CTE: {:.4} AVG SQ ERROR: {:.6} CTE: {:.4} Steer dem: {:.4} Speed: {:.2} Angle: {:.2}",
            self.report.min_abs_cte,
            self.report.avg_sq_error,
            self.report.cte,
            self.report.steer_dem,
            self.report.speed,
            self.report.reported_steering_angle
        );

        let output = OutputData::Dems(VehDems {
            steering_angle: steer_dem,
            throttle: throttle_dem
        });

        Ok((output, self.report))
    }
}

impl Archived for CtlLoop {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

impl CtlLoop {

    /// True if the executive shall supply measured inter-frame timing rather
    /// than the unit time step.
    pub fn use_measured_dt(&self) -> bool {
        self.params.use_measured_dt
    }

    /// Build a loop directly from a parameter set without touching the
    /// filesystem. The status report archive stays uninitialised.
    #[cfg(test)]
    pub(crate) fn from_params(params: Params) -> Self {
        let steer_pid = Some(build_pid(
            &params.steer_gains,
            params.steer_i_error_limit
        ));
        let speed_pid = Some(build_pid(
            &params.speed_gains,
            params.speed_i_error_limit
        ));

        Self {
            params,
            steer_pid,
            speed_pid,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a controller from a gain triple and an optional integral limit.
fn build_pid(gains: &crate::pid::PidGains, i_error_limit: Option<f64>) -> Pid {
    let pid = Pid::new(*gains);

    match i_error_limit {
        Some(limit) => pid.with_i_error_limit(limit),
        None => pid
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::pid::PidGains;

    /// Nominal parameter set used by the tests.
    fn test_params() -> Params {
        Params {
            steer_gains: PidGains {
                kp: 0.375,
                ki: 0.003125,
                kd: 5.625
            },
            speed_gains: PidGains {
                kp: 0.578125,
                ki: 0.00125,
                kd: 6.75
            },
            target_speed: 30.0,
            steer_dem_range: [-1.0, 1.0],
            throttle_dem_range: [0.0, 1.0],
            min_dt_s: 0.001,
            use_measured_dt: false,
            steer_i_error_limit: None,
            speed_i_error_limit: None
        }
    }

    fn telem_input(cte: f64, speed: f64) -> InputData {
        InputData {
            telem: Some(Telemetry {
                cte,
                speed,
                steering_angle: 0.0
            }),
            dt_s: 1.0
        }
    }

    fn dems_of(output: OutputData) -> VehDems {
        match output {
            OutputData::Dems(d) => d,
            OutputData::ManualAck => panic!("Expected demands, got a manual ack")
        }
    }

    #[test]
    fn test_proc_before_init_fails() {
        let mut ctl = CtlLoop::default();

        assert!(matches!(
            ctl.proc(&telem_input(1.0, 30.0)),
            Err(CtlLoopError::NotInit)
        ));
    }

    #[test]
    fn test_steer_dem_clamped() {
        // A large positive error saturates the steering demand at the
        // negative end of the range
        let mut ctl = CtlLoop::from_params(test_params());

        let (output, report) = ctl.proc(&telem_input(5.0, 30.0)).unwrap();
        assert_eq!(dems_of(output).steering_angle, -1.0);
        assert!(report.steer_dem_limited);

        // And a large negative error saturates at the positive end
        let mut ctl = CtlLoop::from_params(test_params());

        let (output, report) = ctl.proc(&telem_input(-5.0, 30.0)).unwrap();
        assert_eq!(dems_of(output).steering_angle, 1.0);
        assert!(report.steer_dem_limited);
    }

    #[test]
    fn test_throttle_dem_clamped_at_zero() {
        // Overspeed gives a positive speed error, so the raw throttle value
        // is negative and must truncate to zero
        let mut ctl = CtlLoop::from_params(test_params());

        let (output, report) = ctl.proc(&telem_input(0.0, 35.0)).unwrap();
        assert_eq!(dems_of(output).throttle, 0.0);
        assert!(report.throttle_dem_limited);
    }

    #[test]
    fn test_min_abs_cte_updated_on_reversal() {
        let mut ctl = CtlLoop::from_params(test_params());

        // First frame moves away from the path, no reversal yet
        let (_, report) = ctl.proc(&telem_input(2.0, 30.0)).unwrap();
        assert_eq!(report.min_abs_cte, std::f64::MAX);

        // Second frame crosses the path, the delta changes sign and the
        // closest approach is recorded
        let (_, report) = ctl.proc(&telem_input(-1.0, 30.0)).unwrap();
        assert_eq!(report.min_abs_cte, 1.0);
    }

    #[test]
    fn test_manual_frame_leaves_state_untouched() {
        let mut ctl = CtlLoop::from_params(test_params());

        // One telemetry frame to give the controllers some state
        ctl.proc(&telem_input(1.0, 25.0)).unwrap();

        let frames_before = ctl.num_frames;
        let steer_total_before = ctl.steer_pid.as_ref().unwrap().total_error();
        let speed_total_before = ctl.speed_pid.as_ref().unwrap().total_error();

        let manual = InputData {
            telem: None,
            dt_s: 1.0
        };

        let (output, _) = ctl.proc(&manual).unwrap();
        assert!(matches!(output, OutputData::ManualAck));

        assert_eq!(ctl.num_frames, frames_before);
        assert_eq!(
            ctl.steer_pid.as_ref().unwrap().total_error(),
            steer_total_before
        );
        assert_eq!(
            ctl.speed_pid.as_ref().unwrap().total_error(),
            speed_total_before
        );
    }

    #[test]
    fn test_non_positive_dt_substituted() {
        let mut ctl = CtlLoop::from_params(test_params());

        let input = InputData {
            telem: Some(Telemetry {
                cte: 1.0,
                speed: 30.0,
                steering_angle: 0.0
            }),
            dt_s: 0.0
        };

        let (output, report) = ctl.proc(&input).unwrap();
        assert!(report.dt_substituted);

        // The demand must still be a finite, in-range value
        let dems = dems_of(output);
        assert!(dems.steering_angle.is_finite());
        assert!(dems.steering_angle >= -1.0 && dems.steering_angle <= 1.0);
    }

    #[test]
    fn test_avg_sq_error_normalised_by_frames() {
        let mut ctl = CtlLoop::from_params(test_params());

        ctl.proc(&telem_input(1.0, 30.0)).unwrap();
        let (_, report) = ctl.proc(&telem_input(2.0, 30.0)).unwrap();

        // (1^2 + 2^2) / 2
        assert!((report.avg_sq_error - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_in_range_demands_not_limited() {
        let mut ctl = CtlLoop::from_params(test_params());

        // A tiny error keeps the raw steering value inside the range
        let (output, report) = ctl.proc(&telem_input(0.01, 30.0)).unwrap();
        assert!(!report.steer_dem_limited);

        let dems = dems_of(output);
        assert!(dems.steering_angle > -1.0 && dems.steering_angle < 0.0);
    }
}
