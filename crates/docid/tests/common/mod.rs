//! Shared test utilities for docid integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated test execution with temp directories
//! - Stub rasterizers and detectors standing in for poppler and zbar
//! - `FakeOcrService` replaying canned remote OCR responses

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::*;
