//! Failure excerpt services.
//!
//! - [`excerpt`] - extracts the relevant window from a failed build's console tail
//! - [`failure_log`] - gated, cached per-build excerpt queries (build and project level)
//! - [`flag_propagation`] - one-shot copy of the feature flag from parent to child jobs
//! - [`build_host`] - collaborator traits for the host build system, with mock and
//!   SQLite implementations
//! - [`config`] - JSON configuration

pub mod build_host;
pub mod config;
pub mod excerpt;
pub mod failure_log;
pub mod flag_propagation;
