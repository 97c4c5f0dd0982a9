//! fencekv server library
//!
//! HTTP API, configuration and startup wiring for the fencekv binary.

pub mod api;
pub mod model;
pub mod startup;
