//! Backup policy catalog.
//!
//! A backup policy names a VM on a hypervisor host, the storage repository
//! that receives its exports, a five-field cron schedule, and how many
//! successful backups to keep. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
