//! Pick'em Core - playoff pick'em sync and scoring pipeline.
//!
//! This crate provides:
//! - ESPN schedule and box score feed (`clients`, `providers`)
//! - Team and player identity reconciliation (`reconcile`)
//! - Box score stat extraction (`stats`)
//! - Per-date ingestion into the store (`ingest`)
//! - Pick submission rules, lock window, scoring and leaderboards (`picks`)
//! - Group membership over external identity and invite services (`groups`)
//! - PostgreSQL and in-memory persistence (`db`)

pub mod clients;
pub mod db;
pub mod error;
pub mod groups;
pub mod ingest;
pub mod league_config;
pub mod models;
pub mod picks;
pub mod providers;
pub mod reconcile;
pub mod stats;

pub use error::{Error, Result};
pub use groups::{Groups, Identity, InviteResolution, InviteTokens};
pub use ingest::{BatchResult, Ingestor};
pub use picks::{PickEngine, PickView, PickWindow};
pub use providers::ScheduleFeed;
