// src/lib.rs

//! Keyword usage statistics for Essence specifications.
//!
//! Files are parsed to their JSON syntax tree by conjure, the mapping keys of
//! each tree are counted, and the counts are aggregated per keyword across the
//! whole corpus.

pub mod cli;
pub mod colour;
pub mod config;
pub mod error;
pub mod essence_file;
pub mod git;
pub mod index;
pub mod keyword;
pub mod keywords;
pub mod model;
pub mod oracle;
pub mod paths;
pub mod release;
pub mod renderer;
pub mod stats;
