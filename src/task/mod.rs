//! Server-truth task records and the ports clients reach them through.
//!
//! The task store is the single shared mutable resource: clients write to it
//! through [`ports::TaskStore`] and observe every committed write through
//! [`ports::ChangeEventBus`]. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - History rendering in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
