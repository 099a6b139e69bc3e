//! Learner module - the incremental associative half of the pipeline
//!
//! Applies the Rescorla-Wagner rule one trial at a time to a dense
//! cue × outcome association matrix:
//! - total activation per outcome from the cues present in the trial
//! - clamping of activations above lambda (logged as a warning)
//! - a prediction-error delta for every outcome, added to every present cue row
//!
//! The matrix is owned by the [`Learner`]; nothing else mutates it.

pub mod rescorla_wagner;

pub use rescorla_wagner::{Learner, LearningParams, TrialReport};
