//! Step definitions for workflow gating scenarios.

pub mod world;

mod given;
mod then;
mod when;
