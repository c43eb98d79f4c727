//! Adapter implementations of the restore plan ports.

pub mod memory;
pub mod postgres;
