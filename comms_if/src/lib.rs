//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the base software: the
//! telecommands sent to the base by a command source, and the telemetry the
//! controllers report back.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommand definitions
pub mod tc;

/// Telemetry (diagnostic report) definitions
pub mod tm;
