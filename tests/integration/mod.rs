//! Integration test suite for texen
//!
//! End-to-end runs of the generation pipeline and the `texen` binary.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **generation**: full runs through `GenerationTask`
//! - **workers**: worker templates writing their own files
//! - **errors**: configuration and generation failures
//! - **cli**: the `texen` binary

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod errors;
mod generation;
mod workers;
