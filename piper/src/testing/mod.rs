//! Testing utilities for piper pipelines.
//!
//! Ready-made stage functions and a registry holding them, for tests that
//! drive whole pipelines.

mod mocks;

pub use mocks::{
    add, double, fail, identity, never, sleep_then, test_registry, CallRecorder, RecordedCall,
};
