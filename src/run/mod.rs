//! Run catalog shared by backup and restore executions.
//!
//! Every execution, scheduled or manual, backup or restore, is one [`Run`]
//! record moving through `pending -> running -> success | failed`. Terminal
//! runs are immutable; only retention pruning removes successful backup
//! runs.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//!
//! [`Run`]: domain::Run

pub mod adapters;
pub mod domain;
pub mod ports;
