//! The adapter between the mesh plus live world geometry and the generic
//! area search. Edges are enumerated per connection, priced by the refined
//! waypoint distance and gated by vischeck verdicts, with two height rules:
//! a drop beyond jump height is always allowed (the mesh encodes valid
//! drop-offs) and a rise beyond jump height is never allowed
//!

use crate::prelude::*;
use bevy::prelude::*;
use std::time::Duration;

/// One reachable neighbour and the cost of walking to it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateCost {
	/// The neighbouring area
	pub area: AreaId,
	/// Traversal cost of the edge
	pub cost: f32,
}

/// The graph contract consumed by [AreaPather]. Implementors hand out opaque
/// [AreaId] handles, a conservative straight-line heuristic and the priced
/// edge list of an area
pub trait NavGraph {
	/// Admissible estimate of the cost between two areas
	fn least_cost_estimate(&self, start: AreaId, end: AreaId) -> f32;
	/// Push every currently traversable edge of `area` into `adjacent`
	fn adjacent_cost(&mut self, area: AreaId, adjacent: &mut Vec<StateCost>);
}

/// Borrows the session state a solve needs and implements [NavGraph] over it.
/// Constructed per solve, it never outlives the schedule tick that runs it
pub struct NavGraphAdapter<'a> {
	/// The immutable mesh
	mesh: &'a NavMesh,
	/// Vischeck memo, written through on misses
	cache: &'a mut VischeckCache,
	/// Live geometry queries
	collision: &'a dyn CollisionWorld,
	/// Agent movement profile
	profile: &'a AgentProfile,
	/// Usage scores biasing edge costs, when scoring is enabled
	usage: Option<&'a AreaUsage>,
	/// Elapsed app time, stamps fresh cache entries
	now: Duration,
}

impl<'a> NavGraphAdapter<'a> {
	pub fn new(
		mesh: &'a NavMesh,
		cache: &'a mut VischeckCache,
		collision: &'a dyn CollisionWorld,
		profile: &'a AgentProfile,
		usage: Option<&'a AreaUsage>,
		now: Duration,
	) -> Self {
		NavGraphAdapter {
			mesh,
			cache,
			collision,
			profile,
			usage,
			now,
		}
	}
	/// Discount or penalise an edge cost by the destination area's observed
	/// traffic
	fn bias_cost(&self, to: AreaId, cost: f32) -> f32 {
		if let Some(usage) = self.usage {
			let multiplier = score_multiplier(usage.get_score(to));
			cost * (1.0 - multiplier)
		} else {
			cost
		}
	}
}

impl NavGraph for NavGraphAdapter<'_> {
	fn least_cost_estimate(&self, start: AreaId, end: AreaId) -> f32 {
		match (self.mesh.get_area(start), self.mesh.get_area(end)) {
			(Some(a), Some(b)) => a.get_centroid().distance(b.get_centroid()),
			_ => f32::MAX,
		}
	}
	fn adjacent_cost(&mut self, area_id: AreaId, adjacent: &mut Vec<StateCost>) {
		let Some(area) = self.mesh.get_area(area_id) else {
			return;
		};
		for connection in area.get_connections() {
			let Some(next_area) = self.mesh.get_area(*connection) else {
				continue;
			};
			let mut points = determine_points(area, next_area);

			let height_diff = points.current.z - points.center.z;
			// deep drops are trusted, the mesh connection encodes a valid drop-off
			let mut allowed = height_diff > self.profile.get_jump_height();

			// too high to jump up to
			if -height_diff > self.profile.get_jump_height() {
				continue;
			}

			points.current = handle_dropdown(points.current, points.center, self.profile);
			points.center = handle_dropdown(points.center, points.next, self.profile);
			points.raise(self.profile);

			if let Some(passable) = self.cache.get(area_id, *connection, self.now) {
				if passable || allowed {
					let cost = next_area.get_centroid().distance(area.get_centroid());
					adjacent.push(StateCost {
						area: *connection,
						cost: self.bias_cost(*connection, cost),
					});
				}
			} else {
				let passable = is_agent_passable(
					self.collision,
					points.current,
					points.center,
					self.profile,
					MASK_AGENT_SOLID,
				) && is_agent_passable(
					self.collision,
					points.center,
					points.next,
					self.profile,
					MASK_AGENT_SOLID,
				);
				self.cache.insert(area_id, *connection, passable, self.now);
				if passable {
					allowed = true;
				}
				if allowed {
					// cost of the walked path, not the raw centroid distance
					let cost = points.next.distance(points.current);
					adjacent.push(StateCost {
						area: *connection,
						cost: self.bias_cost(*connection, cost),
					});
				}
			}
		}
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;

	/// Counts casts, answers with a fixed verdict
	struct CountingWorld {
		hit: bool,
		casts: Cell<usize>,
	}
	impl CountingWorld {
		fn new(hit: bool) -> Self {
			CountingWorld {
				hit,
				casts: Cell::new(0),
			}
		}
	}
	impl CollisionWorld for CountingWorld {
		fn cast_ray(&self, _origin: Vec3, _end: Vec3, _mask: u32) -> bool {
			self.casts.set(self.casts.get() + 1);
			self.hit
		}
	}

	fn area_at(id: u32, nw: Vec3, se: Vec3, connections: Vec<u32>) -> Area {
		Area::new(
			AreaId::new(id),
			nw,
			se,
			AreaFlags::default(),
			connections.into_iter().map(AreaId::new).collect(),
		)
	}

	fn two_area_mesh(z_next: f32) -> NavMesh {
		NavMesh::new(
			String::from("test"),
			vec![
				area_at(
					1,
					Vec3::new(0.0, 0.0, 0.0),
					Vec3::new(100.0, 100.0, 0.0),
					vec![2],
				),
				area_at(
					2,
					Vec3::new(100.0, 0.0, z_next),
					Vec3::new(200.0, 100.0, z_next),
					vec![1],
				),
			],
		)
	}

	/// Second area offset diagonally so the convergence point falls on its
	/// boundary and carries its height
	fn oblique_mesh(z_next: f32) -> NavMesh {
		NavMesh::new(
			String::from("test"),
			vec![
				area_at(
					1,
					Vec3::new(0.0, 0.0, 0.0),
					Vec3::new(100.0, 100.0, 0.0),
					vec![2],
				),
				area_at(
					2,
					Vec3::new(130.0, 130.0, z_next),
					Vec3::new(260.0, 260.0, z_next),
					vec![1],
				),
			],
		)
	}

	#[test]
	fn passable_edge_included_with_refined_cost() {
		let mesh = two_area_mesh(0.0);
		let mut cache = VischeckCache::default();
		let world = CountingWorld::new(false);
		let profile = AgentProfile::default();
		let mut adapter =
			NavGraphAdapter::new(&mesh, &mut cache, &world, &profile, None, Duration::ZERO);
		let mut adjacent = Vec::new();
		adapter.adjacent_cost(AreaId::new(1), &mut adjacent);
		assert_eq!(adjacent.len(), 1);
		assert_eq!(adjacent[0].area, AreaId::new(2));
		// centroid to centroid along x is 100
		assert!((adjacent[0].cost - 100.0).abs() < 1e-3);
	}
	#[test]
	fn blocked_edge_excluded_and_memoised() {
		let mesh = two_area_mesh(0.0);
		let mut cache = VischeckCache::default();
		let world = CountingWorld::new(true);
		let profile = AgentProfile::default();
		let mut adjacent = Vec::new();
		{
			let mut adapter =
				NavGraphAdapter::new(&mesh, &mut cache, &world, &profile, None, Duration::ZERO);
			adapter.adjacent_cost(AreaId::new(1), &mut adjacent);
		}
		assert!(adjacent.is_empty());
		let casts_after_first = world.casts.get();
		assert!(casts_after_first > 0);
		// a second enumeration within the TTL must not re-run the vischeck
		{
			let mut adapter =
				NavGraphAdapter::new(&mesh, &mut cache, &world, &profile, None, Duration::ZERO);
			adapter.adjacent_cost(AreaId::new(1), &mut adjacent);
		}
		assert!(adjacent.is_empty());
		assert_eq!(world.casts.get(), casts_after_first);
	}
	#[test]
	fn expired_verdict_reprobes_after_sweep() {
		let mesh = two_area_mesh(0.0);
		let mut cache = VischeckCache::default();
		let world = CountingWorld::new(false);
		let profile = AgentProfile::default();
		let mut adjacent = Vec::new();
		{
			let mut adapter =
				NavGraphAdapter::new(&mesh, &mut cache, &world, &profile, None, Duration::ZERO);
			adapter.adjacent_cost(AreaId::new(1), &mut adjacent);
		}
		let casts_after_first = world.casts.get();
		assert!(casts_after_first > 0);
		// within the TTL the memoised verdict answers without the oracle
		adjacent.clear();
		{
			let mut adapter = NavGraphAdapter::new(
				&mesh,
				&mut cache,
				&world,
				&profile,
				None,
				Duration::from_secs(5),
			);
			adapter.adjacent_cost(AreaId::new(1), &mut adjacent);
		}
		assert_eq!(world.casts.get(), casts_after_first);
		// past the TTL the sweep evicts the entry and the next enumeration
		// must go back to the oracle
		let later = VISCHECK_TTL + Duration::from_secs(1);
		assert!(cache.sweep(later));
		adjacent.clear();
		{
			let mut adapter =
				NavGraphAdapter::new(&mesh, &mut cache, &world, &profile, None, later);
			adapter.adjacent_cost(AreaId::new(1), &mut adjacent);
		}
		assert!(world.casts.get() > casts_after_first);
		assert_eq!(adjacent.len(), 1);
	}
	#[test]
	fn deep_drop_allowed_despite_blocked_vischeck() {
		// next area sits 100 below, well past jump height
		let mesh = oblique_mesh(-100.0);
		let mut cache = VischeckCache::default();
		let world = CountingWorld::new(true);
		let profile = AgentProfile::default();
		let mut adapter =
			NavGraphAdapter::new(&mesh, &mut cache, &world, &profile, None, Duration::ZERO);
		let mut adjacent = Vec::new();
		adapter.adjacent_cost(AreaId::new(1), &mut adjacent);
		assert_eq!(adjacent.len(), 1);
		assert_eq!(adjacent[0].area, AreaId::new(2));
	}
	#[test]
	fn deep_drop_allowed_on_cached_blocked_verdict() {
		let mesh = oblique_mesh(-100.0);
		let mut cache = VischeckCache::default();
		cache.insert(AreaId::new(1), AreaId::new(2), false, Duration::ZERO);
		let world = CountingWorld::new(true);
		let profile = AgentProfile::default();
		let mut adapter =
			NavGraphAdapter::new(&mesh, &mut cache, &world, &profile, None, Duration::ZERO);
		let mut adjacent = Vec::new();
		adapter.adjacent_cost(AreaId::new(1), &mut adjacent);
		assert_eq!(adjacent.len(), 1);
		assert_eq!(world.casts.get(), 0);
	}
	#[test]
	fn too_high_edge_always_excluded() {
		// next area sits 100 above, beyond jump height, even a clear vischeck
		// cannot include it
		let mesh = oblique_mesh(100.0);
		let mut cache = VischeckCache::default();
		let world = CountingWorld::new(false);
		let profile = AgentProfile::default();
		let mut adapter =
			NavGraphAdapter::new(&mesh, &mut cache, &world, &profile, None, Duration::ZERO);
		let mut adjacent = Vec::new();
		adapter.adjacent_cost(AreaId::new(1), &mut adjacent);
		assert!(adjacent.is_empty());
		assert_eq!(world.casts.get(), 0);
	}
	#[test]
	fn usage_score_discounts_cost() {
		let mesh = two_area_mesh(0.0);
		let profile = AgentProfile::default();
		let world = CountingWorld::new(false);
		let mut usage = AreaUsage::default();
		usage.add_dwell(AreaId::new(2), 30.0);

		let mut cache = VischeckCache::default();
		let mut plain = Vec::new();
		{
			let mut adapter =
				NavGraphAdapter::new(&mesh, &mut cache, &world, &profile, None, Duration::ZERO);
			adapter.adjacent_cost(AreaId::new(1), &mut plain);
		}
		let mut cache = VischeckCache::default();
		let mut biased = Vec::new();
		{
			let mut adapter = NavGraphAdapter::new(
				&mesh,
				&mut cache,
				&world,
				&profile,
				Some(&usage),
				Duration::ZERO,
			);
			adapter.adjacent_cost(AreaId::new(1), &mut biased);
		}
		assert!(biased[0].cost < plain[0].cost);
	}
	#[test]
	fn heuristic_is_centroid_distance() {
		let mesh = two_area_mesh(0.0);
		let mut cache = VischeckCache::default();
		let world = CountingWorld::new(false);
		let profile = AgentProfile::default();
		let adapter =
			NavGraphAdapter::new(&mesh, &mut cache, &world, &profile, None, Duration::ZERO);
		let estimate = adapter.least_cost_estimate(AreaId::new(1), AreaId::new(2));
		assert!((estimate - 100.0).abs() < 1e-3);
	}
}
