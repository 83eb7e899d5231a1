//! Core library for the hackfest coordination service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
