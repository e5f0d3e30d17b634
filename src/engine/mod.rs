//! Core engine: one listing → decide → buy run.

pub mod executor;
pub mod runner;
