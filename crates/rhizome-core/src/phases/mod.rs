//! Pipeline phases: discovery, extraction, graph_build, then analytics.

pub mod analytics;
pub mod discovery;
pub mod extraction;
pub mod graph_build;
