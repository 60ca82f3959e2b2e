//! Urgency scoring for shelter animal populations.
//!
//! The [`workflows::risk`] module holds the scoring engine, profile assembly,
//! threshold-crossing alerts and the batch recalculator. Storage, record lookup and
//! alert delivery are reached only through the traits in
//! [`workflows::risk::repository`].

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
