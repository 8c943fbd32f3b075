//! # roster-bridge-core
//!
//! Mirrors LMS course group membership into chat channels over REST.
//!
//! The bridge keeps a local replica of the host LMS roster (courses, groups,
//! enrolments) in SQLite, and on demand pushes the matching structure into a
//! Rocket.Chat-compatible backend:
//! - one private channel per allow-listed course group
//! - one chat user per enrolled LMS user
//! - one subscription per group member holding a synced role
//!
//! ## Architecture
//!
//! ```text
//! event / manual trigger / periodic task
//!              │
//!              ▼
//!       ┌─────────────┐     ┌──────────────────┐
//!       │ SyncRunner  │────►│ SqliteStorage    │
//!       └──────┬──────┘     │ (roster + state) │
//!              │            └──────────────────┘
//!   ┌──────────┼───────────────┐
//!   ▼          ▼               ▼
//! ChannelSync  UserSync  SubscriptionSync
//!   └──────────┼───────────────┘
//!              ▼
//!        AuthClient ──► chat REST API
//! ```
//!
//! A sync run is fail-soft: remote failures are collected per stage and
//! recorded on the course's sync row, never propagated to the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod channels;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod ops;
pub mod storage;
pub mod subscriptions;
pub mod sync;
pub mod task;
pub mod transport;
pub mod users;
