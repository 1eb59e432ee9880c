//! Valet Dispatch job engine
//!
//! Recurring trash-valet jobs from schedule to completion: instance
//! generation, the optimistic-concurrency state machine, trust-weighted
//! release, penalties and surge, photo verification, and the periodic
//! escalation and maintenance sweeps.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
