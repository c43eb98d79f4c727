//! Adapter implementations of the backup policy ports.

pub mod memory;
pub mod postgres;
