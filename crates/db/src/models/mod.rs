//! Database models for jobs, their builds, and captured console output.

pub mod build;
pub mod build_log;
pub mod job;
