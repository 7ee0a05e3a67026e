//! Transformation module.
//!
//! This module handles survey rows to `.meta` contents:
//! - DSL: Extraction matrix, extractors and aggregation
//! - Grouper: Derived rows to metadata per participant code
//! - Suffix: Supplementary metadata from file-name suffixes
//! - Pipeline: Main pipeline

pub mod dsl;
pub mod grouper;
pub mod pipeline;
pub mod suffix;

pub use dsl::*;
pub use grouper::{group_by_code, DuplicatePolicy, GroupOptions, GroupResult};
pub use pipeline::*;
pub use suffix::decode_suffix;
