//! Cue/outcome indexing.
//!
//! A single pass over the corpus closes the vocabulary and assigns dense,
//! zero-based ids: cues become matrix rows, outcomes become columns. Trials
//! are then encoded against that closed vocabulary before learning.

pub mod vocabulary;

pub use vocabulary::{EncodedTrial, SymbolIndex, UnknownSymbolPolicy, Vocabulary};
