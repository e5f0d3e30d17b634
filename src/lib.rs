//! NOTEPICKER — automated note buyer for peer-to-peer lending marketplaces
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod marketplace;
pub mod strategy;
pub mod engine;
