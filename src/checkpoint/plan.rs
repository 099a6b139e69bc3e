use serde::Serialize;

use crate::error::{NdlError, NdlResult};

/// Percentages of the corpus after which a snapshot is taken. Always sorted,
/// deduplicated and within `1..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointPlan {
    percentages: Vec<u8>,
}

impl CheckpointPlan {
    /// Validates and normalises an explicit set of percentages.
    pub fn new<I: IntoIterator<Item = u32>>(percentages: I) -> NdlResult<Self> {
        let mut checked = Vec::new();
        for percentage in percentages {
            if !(1..=100).contains(&percentage) {
                return Err(NdlError::InvalidPercentage(percentage));
            }
            checked.push(percentage as u8);
        }
        checked.sort_unstable();
        checked.dedup();
        Ok(Self {
            percentages: checked,
        })
    }

    /// The end of training only.
    pub fn single() -> Self {
        Self {
            percentages: vec![100],
        }
    }

    /// `points` evenly spaced percentages ending at 100.
    ///
    /// ```
    /// use ndl_core::CheckpointPlan;
    ///
    /// let plan = CheckpointPlan::longitudinal(4);
    /// assert_eq!(plan.percentages(), &[25, 50, 75, 100]);
    /// ```
    pub fn longitudinal(points: u32) -> Self {
        let points = points.clamp(1, 100);
        let mut percentages: Vec<u8> = (1..=points).map(|k| (100 * k / points) as u8).collect();
        percentages.dedup();
        Self { percentages }
    }

    pub fn percentages(&self) -> &[u8] {
        &self.percentages
    }

    pub fn is_longitudinal(&self) -> bool {
        self.percentages.len() > 1
    }

    /// `(trial count, percentage)` pairs in training order for a corpus of
    /// `total` trials.
    pub fn boundaries(&self, total: usize) -> Vec<(usize, u8)> {
        self.percentages
            .iter()
            .map(|&percentage| (boundary(percentage, total), percentage))
            .collect()
    }
}

impl Default for CheckpointPlan {
    fn default() -> Self {
        Self::single()
    }
}

/// Number of trials processed when `percentage` of `total` is reached,
/// rounded down.
pub fn boundary(percentage: u8, total: usize) -> usize {
    total * percentage as usize / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_points_step_by_five() {
        let plan = CheckpointPlan::longitudinal(20);
        let expected: Vec<u8> = (1..=20).map(|k| k * 5).collect();
        assert_eq!(plan.percentages(), expected.as_slice());
        assert!(plan.is_longitudinal());
        assert!(!CheckpointPlan::single().is_longitudinal());
    }

    #[test]
    fn uneven_points_still_end_at_hundred() {
        assert_eq!(CheckpointPlan::longitudinal(3).percentages(), &[33, 66, 100]);
    }

    #[test]
    fn explicit_plan_is_sorted_and_validated() {
        let plan = CheckpointPlan::new([100, 50, 50, 10]).unwrap();
        assert_eq!(plan.percentages(), &[10, 50, 100]);
        assert!(matches!(
            CheckpointPlan::new([0]),
            Err(NdlError::InvalidPercentage(0))
        ));
        assert!(matches!(
            CheckpointPlan::new([101]),
            Err(NdlError::InvalidPercentage(101))
        ));
    }

    #[test]
    fn boundaries_round_down() {
        assert_eq!(boundary(50, 2), 1);
        assert_eq!(boundary(100, 2), 2);
        assert_eq!(boundary(5, 10), 0);
        assert_eq!(boundary(33, 1000), 330);

        let plan = CheckpointPlan::new([10, 50, 100]).unwrap();
        assert_eq!(plan.boundaries(7), vec![(0, 10), (3, 50), (7, 100)]);
    }
}
