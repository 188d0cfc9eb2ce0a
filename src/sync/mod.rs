//! Client-side synchronization engine.
//!
//! Each dispatcher holds a local board mirroring the task store. Gestures are
//! applied to the board optimistically and rolled back when the store rejects
//! them; committed writes from every client arrive over the change event bus
//! and are merged by a single reconciliation loop. The module follows the same
//! layout as the other contexts:
//!
//! - Board state, mutations, conflicts and notices in [`domain`]
//! - Pipeline, bulk, transition, reconciler and client services in
//!   [`services`]

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
