//! Waypoint: task lifecycle and multi-client synchronization for dispatch
//! boards.
//!
//! Dispatchers edit a shared set of field tasks from many clients at once.
//! This crate keeps each client's view consistent with the authoritative task
//! store while gating status transitions behind the workflows a task's
//! classification requires.
//!
//! # Architecture
//!
//! Waypoint follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the store, the change event bus
//!   and workflow storage
//! - **Adapters**: In-memory implementations of every port
//!
//! # Modules
//!
//! - [`task`]: Server-truth task records, the task store and change events
//! - [`workflow`]: Pre-condition workflows and the transition guard
//! - [`sync`]: Optimistic mutations, bulk operations and event reconciliation
//! - [`config`]: Client synchronization settings
//! - [`clock`]: Manually advanced clock for deterministic timing

pub mod clock;
pub mod config;
pub mod sync;
pub mod task;
pub mod workflow;
