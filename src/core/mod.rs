// src/core/mod.rs

/// Scan configuration as received from the CLI or the API, and the validated
/// plan it turns into.
pub mod config;

pub mod error;

/// Static explanations and remediation advice for every finding code.
pub mod knowledge_base;

/// Data structures shared across the crate, such as `ScanReport`, `Slot` and
/// the per-check result types.
pub mod models;

pub mod orchestrator;

/// Port profiles.
pub mod profiles;

/// The network checks and the traits they implement.
pub mod scanner;

pub mod scheduler;

pub mod target;
