//! Shared index integration test module.

mod multi_threaded_test;
mod spatial_index_test;
