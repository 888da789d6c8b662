// Pipelines: single-input aggregation and multi-input batch runs.

pub mod aggregate;
pub mod batch;

pub use aggregate::Aggregator;
