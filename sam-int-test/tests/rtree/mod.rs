//! R-Tree integration test module.
//!
//! These tests drive the tree only through its public API and compare it
//! against brute-force scans and the `rstar` crate.

mod property_test;
