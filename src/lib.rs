pub mod applicants;
pub mod applications;
pub mod config;
pub mod error;
pub mod infra;
pub mod intermediaries;
pub mod locale;
pub mod predicates;
pub mod programs;
pub mod questions;
pub mod telemetry;
