//! Post-hoc inspection of association matrices.

pub mod statistics;

pub use statistics::{
    activations, group_outcomes, median_absolute_deviation, norm, rank_nodes, rearrange, Norm,
};
