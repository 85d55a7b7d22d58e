//! Best-first search over a [NavGraph] with a memoised solve cache. Edge
//! costs depend on live vischeck state so any invalidation of that state must
//! [AreaPather::reset] the memo, otherwise a route priced against stale
//! geometry could be reused
//!

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::prelude::*;
use bevy::prelude::*;

/// A solved route of area handles and its total cost
pub type Solution = (Vec<AreaId>, f32);

/// Open-set entry ordered by estimated total cost, smallest first
#[derive(PartialEq)]
struct OpenNode {
	/// Cost so far plus heuristic to the goal
	estimate: f32,
	/// The area to expand
	area: AreaId,
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
	fn cmp(&self, other: &Self) -> Ordering {
		// reversed so the BinaryHeap pops the cheapest estimate
		other
			.estimate
			.total_cmp(&self.estimate)
			.then_with(|| self.area.cmp(&other.area))
	}
}

impl PartialOrd for OpenNode {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Solves start/goal area queries against a [NavGraph]. Solutions, including
/// failures, are memoised per `(start, goal)` pair until [AreaPather::reset]
#[derive(Default)]
pub struct AreaPather {
	/// Memoised solutions, `None` records "no solution"
	solved: HashMap<(AreaId, AreaId), Option<Solution>>,
}

impl AreaPather {
	/// Find the cheapest area sequence from `start` to `goal`. Returns [None]
	/// when no connected route exists, `start == goal` yields the one-element
	/// path at zero cost rather than a failure
	pub fn solve<G: NavGraph>(
		&mut self,
		graph: &mut G,
		start: AreaId,
		goal: AreaId,
	) -> Option<Solution> {
		if let Some(memoised) = self.solved.get(&(start, goal)) {
			return memoised.clone();
		}
		let solution = self.search(graph, start, goal);
		self.solved.insert((start, goal), solution.clone());
		solution
	}
	/// Discard every memoised solution, called whenever edge costs may have
	/// changed
	pub fn reset(&mut self) {
		self.solved.clear();
	}
	/// Number of memoised solutions
	pub fn solved_count(&self) -> usize {
		self.solved.len()
	}
	fn search<G: NavGraph>(&self, graph: &mut G, start: AreaId, goal: AreaId) -> Option<Solution> {
		if start == goal {
			return Some((vec![start], 0.0));
		}
		let mut queue = BinaryHeap::new();
		let mut came_from: HashMap<AreaId, AreaId> = HashMap::new();
		let mut best_cost: HashMap<AreaId, f32> = HashMap::new();
		let mut adjacent = Vec::new();

		best_cost.insert(start, 0.0);
		queue.push(OpenNode {
			estimate: graph.least_cost_estimate(start, goal),
			area: start,
		});

		while let Some(OpenNode { area, .. }) = queue.pop() {
			let cost_so_far = best_cost[&area];
			if area == goal {
				let mut path = vec![goal];
				let mut current = goal;
				while let Some(previous) = came_from.get(&current) {
					path.push(*previous);
					current = *previous;
				}
				path.reverse();
				return Some((path, cost_so_far));
			}
			adjacent.clear();
			graph.adjacent_cost(area, &mut adjacent);
			for edge in adjacent.iter() {
				let tentative = cost_so_far + edge.cost;
				let known = best_cost.get(&edge.area).copied().unwrap_or(f32::MAX);
				if tentative < known {
					best_cost.insert(edge.area, tentative);
					came_from.insert(edge.area, area);
					queue.push(OpenNode {
						estimate: tentative + graph.least_cost_estimate(edge.area, goal),
						area: edge.area,
					});
				}
			}
		}
		None
	}
}
