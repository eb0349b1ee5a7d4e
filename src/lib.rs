//! # doctrack
//!
//! Compliance document tracking core: the requirement lifecycle state
//! machine, validity recomputation, the reminder job scheduler, and the
//! dispatcher that turns due jobs into notifications.

pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod repositories;
pub mod schedule;
pub mod scheduler;
pub mod server;
pub mod telemetry;
