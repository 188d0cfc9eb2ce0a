//! Step definitions for concurrent dispatch scenarios.

pub mod world;

mod given;
mod then;
mod when;
