//! Graph storage and algorithms.

pub mod cycles;
pub mod dependency_graph;
pub mod module_index;
