//! Rhizome Core: static dependency analysis for Python source trees.
//!
//! This crate contains all analysis logic: source discovery, module identity,
//! tree-sitter import extraction, graph construction, metrics and artifact output.

pub mod config;
pub mod error;
pub mod graph;
pub mod languages;
pub mod output;
pub mod phases;
pub mod pipeline;

pub use error::{AnalysisError, Result};
