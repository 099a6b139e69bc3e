//! Lane statistics over a subset of rows or columns.
//!
//! With `Axis(0)` the `indices` select rows (cues) and one value is returned
//! per column (outcome). With `Axis(1)` the `indices` select columns and one
//! value is returned per row.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;

use crate::error::{NdlError, NdlResult, SymbolKind};
use crate::index::SymbolIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Norm {
    /// Sum of absolute values
    L1,
    /// Euclidean length
    L2,
}

/// Summed activation per lane over the selected rows or columns.
pub fn activations(weights: &Array2<f64>, indices: &[usize], axis: Axis) -> NdlResult<Array1<f64>> {
    let selected = select(weights, indices, axis)?;
    Ok(selected.sum_axis(axis))
}

pub fn norm(
    weights: &Array2<f64>,
    indices: &[usize],
    axis: Axis,
    order: Norm,
) -> NdlResult<Array1<f64>> {
    let selected = select(weights, indices, axis)?;
    Ok(per_lane(&selected, axis, |lane| match order {
        Norm::L1 => lane.iter().map(|w| w.abs()).sum(),
        Norm::L2 => lane.iter().map(|w| w * w).sum::<f64>().sqrt(),
    }))
}

/// Median absolute deviation from the lane median. Empty selections give NaN.
pub fn median_absolute_deviation(
    weights: &Array2<f64>,
    indices: &[usize],
    axis: Axis,
) -> NdlResult<Array1<f64>> {
    let selected = select(weights, indices, axis)?;
    Ok(per_lane(&selected, axis, |lane| {
        let values: Vec<f64> = lane.to_vec();
        let center = median(values.clone());
        median(values.into_iter().map(|w| (w - center).abs()).collect())
    }))
}

/// Reorders the columns so outcomes sharing a part-of-speech tag (the text
/// after `|` in `word|tag`) are adjacent. Ties keep their column order.
/// Returns the permuted matrix and the matching outcome index.
pub fn group_outcomes(
    weights: &Array2<f64>,
    outcomes: &SymbolIndex,
) -> NdlResult<(Array2<f64>, SymbolIndex)> {
    if weights.ncols() != outcomes.len() {
        return Err(NdlError::ShapeMismatch {
            expected: (weights.nrows(), outcomes.len()),
            found: weights.dim(),
        });
    }

    let mut order: Vec<usize> = (0..outcomes.len()).collect();
    order.sort_by_key(|&id| pos_tag(outcomes.symbols()[id].as_str()));

    let grouped = weights.select(Axis(1), &order);
    let index = order
        .iter()
        .map(|&id| outcomes.symbols()[id].as_str())
        .collect();
    Ok((grouped, index))
}

/// Reorders rows (`Axis(0)`) or columns (`Axis(1)`) by `key` evaluated on
/// each of them, ascending unless `descending`. Ties keep their order.
/// Returns the permuted matrix and, for each new position, the old index.
pub fn rearrange<F>(
    weights: &Array2<f64>,
    axis: Axis,
    key: F,
    descending: bool,
) -> (Array2<f64>, Vec<usize>)
where
    F: Fn(ArrayView1<'_, f64>) -> f64 + Sync + Send,
{
    let scores: Vec<f64> = weights.axis_iter(axis).into_par_iter().map(key).collect();
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        let ordering = scores[a].total_cmp(&scores[b]);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    (weights.select(axis, &order), order)
}

/// Names each lane value after its symbol and ranks them, highest first.
/// Only ids for which `filter(id, symbol)` holds are kept; ties keep id order.
pub fn rank_nodes<F>(
    values: &Array1<f64>,
    symbols: &SymbolIndex,
    filter: F,
) -> NdlResult<Vec<(String, f64)>>
where
    F: Fn(usize, &str) -> bool,
{
    if values.len() != symbols.len() {
        return Err(NdlError::ShapeMismatch {
            expected: (symbols.len(), 1),
            found: (values.len(), 1),
        });
    }

    let mut ranked: Vec<(String, f64)> = symbols
        .symbols()
        .iter()
        .zip(values.iter())
        .enumerate()
        .filter(|(id, (symbol, _))| filter(*id, symbol.as_str()))
        .map(|(_, (symbol, &value))| (symbol.clone(), value))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(ranked)
}

fn pos_tag(outcome: &str) -> &str {
    outcome.split('|').nth(1).unwrap_or("")
}

fn select(weights: &Array2<f64>, indices: &[usize], axis: Axis) -> NdlResult<Array2<f64>> {
    let (len, kind) = if axis == Axis(0) {
        (weights.nrows(), SymbolKind::Cue)
    } else {
        (weights.ncols(), SymbolKind::Outcome)
    };
    if let Some(&id) = indices.iter().find(|&&id| id >= len) {
        return Err(NdlError::UnknownId { kind, id, len });
    }
    Ok(weights.select(axis, indices))
}

/// Applies `f` to every lane that runs along `axis`, in parallel.
fn per_lane<F>(selected: &Array2<f64>, axis: Axis, f: F) -> Array1<f64>
where
    F: Fn(ArrayView1<'_, f64>) -> f64 + Sync + Send,
{
    let across = if axis == Axis(0) { Axis(1) } else { Axis(0) };
    let values: Vec<f64> = selected.axis_iter(across).into_par_iter().map(f).collect();
    Array1::from(values)
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
