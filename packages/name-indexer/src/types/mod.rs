//! Data types for the indexer library.

pub mod config;
pub mod generation;
pub mod profile;
