//! # photo-dispatch
//!
//! Hands photo classification work to remote workers over WebSocket.
//!
//! Posts sit in a Postgres-backed work queue. Each connected worker gets a
//! session that leases one post at a time, streams its photo references to
//! the worker, ORs the per-photo verdicts, and writes the result back.
//! Leases expire after a TTL so work held by a vanished worker is reclaimed.

pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod lease;
pub mod model;
pub mod queue;
pub mod server;
pub mod telemetry;
pub mod worker;
