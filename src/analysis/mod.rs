//! Analysis pipeline.
//!
//! The runner executes analyzer batches for a tier, the aggregator merges
//! their fragments into one result, and scoring derives the summary once
//! everything is merged.

pub mod aggregator;
pub mod runner;
pub mod scoring;

pub use aggregator::*;
pub use runner::{AnalyzerRunner, TierRequest};
pub use scoring::summarize;
