//! Checkpoint persistence.
//!
//! A checkpoint is the association matrix plus both id mappings, taken after
//! a given percentage of the corpus and stored as one group:
//!
//! - `associationMatrix_<p>.npy` - NumPy v1.0 array, little-endian `f64`
//! - `cueIDs_<p>.json` - `{cue: row}`
//! - `outcomeIDs_<p>.json` - `{outcome: column}`
//!
//! Groups are immutable once written. The store answers whether a full set of
//! requested percentages exists so a run with identical parameters can skip
//! training entirely.

pub mod npy;
pub mod plan;
pub mod store;

pub use npy::{read_npy, write_npy, NpyError};
pub use plan::{boundary, CheckpointPlan};
pub use store::{Checkpoint, CheckpointStore};
