//! # Simulator Server Module
//!
//! This module abstracts over the networking side of the control executable.
//! The server accepts a connection from the vehicle simulator, allowing
//! telemetry events to be recieved and actuation demands to be sent back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions, MonitoredSocketError},
    sim::{SimEvent, VehDems, MANUAL_ACK}
};

use crate::params::CtlExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the control executable.
///
/// One bidirectional socket carries the whole simulator link: events in,
/// demands and acknowledgements out. A PAIR socket is used rather than a
/// request/reply pair so that a discarded frame does not leave the link
/// expecting a reply that will never come.
pub struct SimServer {

    /// PAIR socket carrying events from and demands to the simulator
    sim_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`SimServer`]
#[derive(thiserror::Error, Debug)]
pub enum SimServerError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("Could not read from the simulator socket: {0}")]
    RecvError(zmq::Error),

    #[error("Recieved a frame which is not valid UTF-8")]
    NonUtf8Frame,

    #[error("Could not decode the recieved frame: {0}")]
    FrameDecodeError(serde_json::Error),

    #[error("Could not send data to the simulator: {0}")]
    SendError(zmq::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimServer {

    /// Create a new instance of the simulator server.
    ///
    /// This function will not wait for a connection from the simulator before
    /// returning.
    pub fn new(params: &CtlExecParams) -> Result<Self, SimServerError> {

        // Create the zmq context
        let ctx = zmq::Context::new();

        // Create the socket options
        let sim_socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            recv_timeout: 200,
            send_timeout: 10,
            ..Default::default()
        };

        // Create the socket
        let sim_socket = MonitoredSocket::new(
            &ctx,
            zmq::PAIR,
            sim_socket_options,
            &params.sim_endpoint
        )?;

        // Create self
        Ok(Self {
            sim_socket
        })
    }

    /// Return whether the simulator is currently connected.
    pub fn connected(&self) -> bool {
        self.sim_socket.connected()
    }

    /// Retrieve the next event from the simulator.
    ///
    /// `Ok(None)` is returned if no event arrived within the socket's receive
    /// window. A decode error means the frame must be discarded by the
    /// caller: no controller state may change and no demands may be sent for
    /// that frame.
    pub fn recv_event(&mut self) -> Result<Option<SimEvent>, SimServerError> {

        // Read from the socket
        let msg = match self.sim_socket.recv_msg(0) {
            Ok(m) => m,
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(SimServerError::RecvError(e))
        };

        let msg_str = msg.as_str().ok_or(SimServerError::NonUtf8Frame)?;

        serde_json::from_str(msg_str)
            .map(Some)
            .map_err(SimServerError::FrameDecodeError)
    }

    /// Send actuation demands to the simulator.
    pub fn send_dems(&mut self, dems: &VehDems) -> Result<(), SimServerError> {
        // Serialize demands
        let dems_str = serde_json::to_string(dems)
            .expect("Demands serialization failed. This should not happen");

        // Send demands
        match self.sim_socket.send(&dems_str, 0) {
            Ok(_) => Ok(()),
            Err(e) => Err(SimServerError::SendError(e))
        }
    }

    /// Acknowledge a manual driving event.
    ///
    /// The acknowledgement is a fixed empty object sent verbatim.
    pub fn send_manual_ack(&mut self) -> Result<(), SimServerError> {
        match self.sim_socket.send(MANUAL_ACK, 0) {
            Ok(_) => Ok(()),
            Err(e) => Err(SimServerError::SendError(e))
        }
    }
}
