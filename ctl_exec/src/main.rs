//! Main control executable entry point.
//!
//! # Architecture
//!
//! The executable is event driven: the simulator sends one event per control
//! frame and each event is fully processed before the next is accepted.
//!
//!     - Initialise the session, logger and modules
//!     - Main loop:
//!         - Recieve the next event from the simulator
//!         - Telemetry event: decode, run the control loop, send the
//!           actuation demands and archive the status report
//!         - Manual event: send the fixed acknowledgement
//!         - Malformed frame: log and skip, no state changes and no demands
//!
//! # Modules
//!
//! All modules (e.g. `ctl_loop`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use ctl_lib::{
    ctl_loop::{self, CtlLoop, InputData, OutputData},
    params::CtlExecParams,
    sim_server::SimServer
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Result, eyre::WrapErr};
use comms_if::sim::SimEvent;
use log::{info, warn};
use std::time::Instant;

// Internal
use util::{
    archive::Archived,
    module::State,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<()> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "ctl_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Pilot Vehicle Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: CtlExecParams = util::params::load(
        "ctl_exec.toml"
    ).wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ctl_loop = CtlLoop::default();
    ctl_loop.init("ctl_loop.toml", &session)
        .wrap_err("Failed to initialise CtlLoop")?;
    info!("CtlLoop init complete");

    // ---- INITIALISE NETWORK ----

    let mut server = SimServer::new(&exec_params)
        .wrap_err("Failed to initialise the simulator server")?;

    info!("SimServer initialised");

    // ---- MAIN LOOP ----

    info!("Initialisation complete, waiting for the simulator\n");

    // Time of the previous telemetry frame, used only when measured frame
    // timing is enabled in the CtlLoop parameters.
    let mut last_telem_instant: Option<Instant> = None;

    // Connection state of the previous cycle, used to log transitions
    let mut sim_connected = false;

    loop {

        // Log connection transitions
        if server.connected() != sim_connected {
            sim_connected = !sim_connected;
            match sim_connected {
                true => info!("Simulator connected"),
                false => {
                    warn!("Simulator disconnected");
                    last_telem_instant = None;
                }
            }
        }

        // Get the next event from the simulator
        let event = match server.recv_event() {
            Ok(Some(e)) => e,
            Ok(None) => continue,
            Err(e) => {
                // A bad frame is never fatal, drop it and wait for the next
                // one. Controller state is untouched and no demand is sent.
                warn!("Dropping frame: {}", e);
                continue
            }
        };

        // Build the control loop input for this event
        let input = match event {
            SimEvent::Telemetry(msg) => {
                let telem = match msg.decode() {
                    Ok(t) => t,
                    Err(e) => {
                        warn!("Dropping malformed telemetry frame: {}", e);
                        continue
                    }
                };

                let dt_s = match ctl_loop.use_measured_dt() {
                    true => {
                        let now = Instant::now();
                        let dt = last_telem_instant
                            .map(|t| now.duration_since(t).as_secs_f64())
                            .unwrap_or(ctl_loop::UNIT_TIME_STEP_S);
                        last_telem_instant = Some(now);
                        dt
                    },
                    false => ctl_loop::UNIT_TIME_STEP_S
                };

                InputData {
                    telem: Some(telem),
                    dt_s
                }
            },
            SimEvent::Manual => {
                last_telem_instant = None;

                InputData {
                    telem: None,
                    dt_s: ctl_loop::UNIT_TIME_STEP_S
                }
            }
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        match ctl_loop.proc(&input) {
            Ok((OutputData::Dems(dems), _report)) => {
                if let Err(e) = server.send_dems(&dems) {
                    warn!("Could not send demands to the simulator: {}", e);
                }

                // ---- WRITE ARCHIVES ----

                if let Err(e) = ctl_loop.write() {
                    warn!("Could not archive the status report: {}", e);
                }
            },
            Ok((OutputData::ManualAck, _)) => {
                if let Err(e) = server.send_manual_ack() {
                    warn!("Could not acknowledge manual driving: {}", e);
                }
            },
            Err(e) => {
                warn!("Error during CtlLoop processing: {}", e);
            }
        }
    }
}
