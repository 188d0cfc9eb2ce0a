//! Pre-condition workflows gating task status transitions.
//!
//! The guard consults the workflow catalog before a transition is requested
//! and either forwards it or opens a workflow whose payload must be stored
//! before the status call fires.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
