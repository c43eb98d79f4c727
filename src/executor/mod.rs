//! Run execution against the hypervisor.
//!
//! The executor turns a policy or plan into a [`Run`], holds the target's
//! exclusive lock while the run is in flight, bounds concurrent gateway calls
//! per host, and records the terminal outcome. Gateway failures and timeouts
//! become failed runs rather than caller-visible errors.
//!
//! - Port contracts in [`ports`]
//! - Gateway adapters in [`adapters`]
//! - The executor itself in [`services`]
//!
//! [`Run`]: crate::run::domain::Run

pub mod adapters;
pub mod ports;
pub mod services;
