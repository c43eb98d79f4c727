//! Hypervisor gateway adapters.

mod memory;
mod xe;

pub use memory::{GatewayCall, InMemoryHypervisorGateway};
pub use xe::XeCommandGateway;
