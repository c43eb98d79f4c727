//! Restore plan catalog and restore source resolution.
//!
//! A restore plan names a destination host and storage repository and the
//! backup policy whose artifacts it restores. Each restore run resolves, at
//! submission time, exactly one successful backup run of that policy as its
//! data source.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
