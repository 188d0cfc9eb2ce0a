//! Unit tests for the client synchronization engine.

mod bulk_tests;
mod reconciler_tests;
