//! portctl library
//!
//! Exposes the control channel and its host-side pieces for use by the
//! `portctl` binary and by embedding applications.
//!
//! CHANGELOG:
//! - 10/19/2026 - Initial library structure

pub mod config;
pub mod control;
pub mod error;
pub mod host;
pub mod output;
