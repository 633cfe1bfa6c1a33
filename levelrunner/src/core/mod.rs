//! Deterministic, pure logic shared by the submission engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod catalog;
pub mod error;
pub mod reconcile;
pub mod sequencer;
pub mod types;
