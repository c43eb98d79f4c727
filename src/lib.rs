//! Strongroom: backup and restore orchestration for hypervisor-hosted VMs.
//!
//! This crate provides the orchestration core behind a VM backup dashboard:
//! cron-driven backup policies, a job state machine that records every run,
//! retention pruning of old backup artifacts, and resolution of restore
//! requests onto a concrete prior backup.
//!
//! # Architecture
//!
//! Strongroom follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, hypervisor)
//!
//! # Modules
//!
//! - [`backup`]: Backup policy catalog
//! - [`restore`]: Restore plan catalog and source resolution
//! - [`run`]: Shared run record and lifecycle state machine
//! - [`scheduler`]: Cron evaluation and trigger emission
//! - [`executor`]: Run execution against the hypervisor gateway
//! - [`retention`]: Pruning of historical backup artifacts
//! - [`host`]: Known hypervisor host lookup
//! - [`orchestrator`]: Facade exposing the request/response operations

pub mod backup;
pub mod config;
pub mod executor;
pub mod host;
pub mod orchestrator;
pub mod postgres;
pub mod restore;
pub mod retention;
pub mod run;
pub mod scheduler;
pub mod shell;
