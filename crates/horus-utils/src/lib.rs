//! Shared utilities for the horus package registry.
//!
//! This crate provides the low-level helpers the rest of the workspace
//! builds on: filesystem primitives and SHA-256 hashing for
//! content-addressed artifacts.

pub mod error;
pub mod fs;
pub mod hash;
