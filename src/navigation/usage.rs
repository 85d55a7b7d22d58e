//! Per-area dwell scores accumulated from observed occupancy. Scores bias
//! edge costs through a logistic multiplier so the search drifts toward areas
//! real traffic has proven walkable. Scores only ever grow, the full reset on
//! map change is the only decay
//!

use std::collections::HashMap;

use crate::prelude::*;

/// Convert a dwell score into a cost discount in `[0, 0.9]`.
///
/// Logistic curve `2 * (0.9 / (1 + e^(-0.2 * score)) - 0.45)`, zero at a
/// score of zero and saturating at `0.9` as dwell time accumulates
pub fn score_multiplier(score: f32) -> f32 {
	2.0 * (0.9 / (1.0 + (-0.2 * score).exp()) - 0.45)
}

/// Dwell time observed per area, in seconds
#[derive(Default, Clone, Debug)]
pub struct AreaUsage {
	/// Accumulated seconds of occupancy keyed by area
	scores: HashMap<AreaId, f32>,
}

impl AreaUsage {
	/// Record `seconds` of observed occupancy of `area`
	pub fn add_dwell(&mut self, area: AreaId, seconds: f32) {
		*self.scores.entry(area).or_insert(0.0) += seconds;
	}
	/// Get the accumulated score of an area, zero when never visited
	pub fn get_score(&self, area: AreaId) -> f32 {
		self.scores.get(&area).copied().unwrap_or(0.0)
	}
	/// Drop all scores, used on map change
	pub fn clear(&mut self) {
		self.scores.clear();
	}
	/// Number of areas with a recorded score
	pub fn len(&self) -> usize {
		self.scores.len()
	}
	/// Are any scores recorded
	pub fn is_empty(&self) -> bool {
		self.scores.is_empty()
	}
}
