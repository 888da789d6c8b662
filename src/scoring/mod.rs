// Scoring: composite computation and risk classification.

pub mod composite;
pub mod risk;
