//! shadowfolio-rebalancer: CSV-driven driver for the shadowfolio pipeline.
//!
//! Reads the reference and holdings tables, runs the rebalancing pipeline,
//! shows the resulting order plan, and after confirmation writes an
//! order-entry CSV with a JSONL audit trail alongside.

pub mod audit;
pub mod config;
pub mod error;
pub mod execution;
pub mod orders;
pub mod tables;
