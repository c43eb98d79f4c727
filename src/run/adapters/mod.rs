//! Adapter implementations of the run ports.

pub mod memory;
pub mod postgres;
