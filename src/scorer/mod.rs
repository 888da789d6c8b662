// Model scoring: trait-based abstraction over how a detector is run.
//
// The ModelScorer trait defines the interface. SubprocessScorer runs each
// detector as an isolated child process (the standard deployment);
// KeyedScorer calls linked functions and reads the score from a named
// result field.

pub mod keyed;
pub mod subprocess;
pub mod traits;

pub use traits::{ModelOutcome, ModelScorer, OutcomeStatus};
