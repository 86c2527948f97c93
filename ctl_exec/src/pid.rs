//! # PID Controller
//!
//! Single-input single-output proportional-integral-derivative controller.
//! One instance controls one axis: the control loop owns one for steering and
//! one for throttle.
//!
//! The controller is constructed with its gain triple, so an uninitialised
//! controller cannot exist. Gains are fixed for the controller's lifetime,
//! retuning an axis means constructing a new controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gain triple for a [`Pid`] controller.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PidGains {
    /// Proportional gain
    pub kp: f64,

    /// Integral gain
    pub ki: f64,

    /// Derivative gain
    pub kd: f64
}

/// A PID controller for a single axis.
#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,

    /// The most recent error sample
    p_error: f64,

    /// Running sum of all error samples.
    ///
    /// Accumulates without decay or clamp unless `i_error_limit` is set. The
    /// unbounded accumulation is deliberate control behaviour, but it means
    /// the integral term can saturate the output over long one-sided runs.
    i_error: f64,

    /// The most recent derivative estimate
    d_error: f64,

    /// Running sum of squared error samples, diagnostic only
    total_error: f64,

    /// Optional saturation bound on `i_error` (anti-windup), `None` disables
    i_error_limit: Option<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pid {
    /// Create a new controller with the given gains and zeroed error state.
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            p_error: 0.0,
            i_error: 0.0,
            d_error: 0.0,
            total_error: 0.0,
            i_error_limit: None
        }
    }

    /// Enable the anti-windup clamp, saturating the integral error at
    /// `±limit`.
    ///
    /// Disabled unless configured, the integral error accumulates without
    /// bound.
    pub fn with_i_error_limit(mut self, limit: f64) -> Self {
        self.i_error_limit = Some(limit);
        self
    }

    /// Update the error state with a new error sample.
    ///
    /// `dt_s` is the time elapsed since the previous sample and must be
    /// strictly positive, the caller is responsible for guarding against
    /// zero or negative steps before calling.
    pub fn update_error(&mut self, error: f64, dt_s: f64) {
        debug_assert!(dt_s > 0.0, "Time step must be strictly positive");

        // Backward difference derivative estimate
        self.d_error = (error - self.p_error) / dt_s;
        self.p_error = error;
        self.i_error += error;

        if let Some(limit) = self.i_error_limit {
            self.i_error = clamp(&self.i_error, &-limit, &limit);
        }

        // Squared so that the total is always non-negative
        self.total_error += error * error;
    }

    /// Calculate the control value for the current error state.
    ///
    /// Negative feedback form: a positive error produces an opposing,
    /// negative, control value.
    pub fn control_value(&self) -> f64 {
        -self.gains.kp * self.p_error
            - self.gains.kd * self.d_error
            - self.gains.ki * self.i_error
    }

    /// The running sum of squared error samples.
    ///
    /// Used for diagnostic averaging only, never in the control computation.
    pub fn total_error(&self) -> f64 {
        self.total_error
    }

    /// The gains this controller was built with.
    pub fn gains(&self) -> PidGains {
        self.gains
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Tuned steering gains used by the tests.
    fn ref_gains() -> PidGains {
        PidGains {
            kp: 0.375,
            ki: 0.003125,
            kd: 5.625
        }
    }

    #[test]
    fn test_fresh_controller_outputs_zero() {
        let pid = Pid::new(ref_gains());
        assert_eq!(pid.control_value(), 0.0);
        assert_eq!(pid.total_error(), 0.0);
    }

    #[test]
    fn test_single_update() {
        let mut pid = Pid::new(ref_gains());
        pid.update_error(1.0, 1.0);

        assert_eq!(pid.p_error, 1.0);
        assert_eq!(pid.i_error, 1.0);
        assert_eq!(pid.d_error, 1.0);
        assert_eq!(pid.total_error(), 1.0);

        // -0.375*1 - 5.625*1 - 0.003125*1
        assert!((pid.control_value() - (-6.003125)).abs() < 1e-12);
    }

    #[test]
    fn test_total_error_is_sum_of_squares() {
        let mut pid = Pid::new(ref_gains());
        let samples = [1.0f64, -2.0, 0.5, 3.0, -0.25];

        let mut expected = 0.0;
        let mut previous = 0.0;

        for s in &samples {
            pid.update_error(*s, 1.0);
            expected += s * s;

            // Monotonically non-decreasing
            assert!(pid.total_error() >= previous);
            previous = pid.total_error();
        }

        assert!((pid.total_error() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_negative_feedback() {
        let mut pid = Pid::new(ref_gains());

        // A sustained positive error must always produce a negative control
        // value with positive gains
        for _ in 0..100 {
            pid.update_error(1.0, 1.0);
            assert!(pid.control_value() < 0.0);
        }
    }

    #[test]
    fn test_derivative_uses_dt() {
        let mut pid = Pid::new(PidGains {
            kp: 0.0,
            ki: 0.0,
            kd: 1.0
        });

        // Error rises by 1.0 over 0.5 s, so the derivative estimate is 2.0
        pid.update_error(1.0, 0.5);
        assert_eq!(pid.d_error, 2.0);
        assert_eq!(pid.control_value(), -2.0);
    }

    #[test]
    fn test_i_error_limit_saturates() {
        let mut pid = Pid::new(PidGains {
            kp: 0.0,
            ki: 1.0,
            kd: 0.0
        })
        .with_i_error_limit(10.0);

        for _ in 0..5 {
            pid.update_error(4.0, 1.0);
        }

        // Unlimited accumulation would give 20.0
        assert_eq!(pid.i_error, 10.0);
        assert_eq!(pid.control_value(), -10.0);
    }

    #[test]
    fn test_i_error_unbounded_by_default() {
        let mut pid = Pid::new(PidGains {
            kp: 0.0,
            ki: 1.0,
            kd: 0.0
        });

        for _ in 0..5 {
            pid.update_error(4.0, 1.0);
        }

        assert_eq!(pid.i_error, 20.0);
    }
}
