// Concordance: weighted aggregation of manipulation detectors for a post.
//
// This is the library root. Each module corresponds to a major subsystem
// of the scoring engine or one of its thin outer surfaces.

pub mod config;
pub mod db;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod scorer;
pub mod scoring;
pub mod status;
