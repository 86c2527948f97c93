//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Event and demand definitions for the vehicle simulator link
pub mod sim;

/// Network module
pub mod net;
