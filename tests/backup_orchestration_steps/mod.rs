//! Step definitions for backup orchestration scenarios.

mod given;
mod then;
mod when;
pub mod world;
