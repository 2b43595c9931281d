//! Ambient plumbing shared by Bazargan services: health probes, request ids
//! and tracing setup.

pub mod health;
pub mod middleware;
pub mod tracing;
