//! The crumb trail is the refined, ordered list of 3D waypoints an agent
//! walks, produced by expanding a solved area sequence through the waypoint
//! refiner. [RouteState] tracks the request that produced the trail
//!

use crate::prelude::*;
use bevy::prelude::*;

/// One waypoint of the active route. The final crumb of a trail carries no
/// owning area since the destination is an arbitrary world position
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crumb {
	/// Area the waypoint belongs to
	pub area: Option<AreaId>,
	/// The point to walk toward
	pub pos: Vec3,
}

impl Crumb {
	pub fn new(area: Option<AreaId>, pos: Vec3) -> Self {
		Crumb { area, pos }
	}
}

/// Expand a solved area sequence into walkable waypoints. Every area except
/// the last contributes its dropdown-corrected exit and convergence points
/// toward the next area, the last contributes its centroid, and the raw
/// `destination` terminates the trail
pub fn build_crumb_trail(
	mesh: &NavMesh,
	path: &[AreaId],
	destination: Vec3,
	profile: &AgentProfile,
) -> Vec<Crumb> {
	let mut crumbs = Vec::new();
	for (i, area_id) in path.iter().enumerate() {
		let Some(area) = mesh.get_area(*area_id) else {
			continue;
		};
		if i != path.len() - 1 {
			let Some(next_area) = mesh.get_area(path[i + 1]) else {
				continue;
			};
			let mut points = determine_points(area, next_area);
			points.current = handle_dropdown(points.current, points.center, profile);
			points.center = handle_dropdown(points.center, points.next, profile);
			crumbs.push(Crumb::new(Some(*area_id), points.current));
			crumbs.push(Crumb::new(Some(*area_id), points.center));
		} else {
			crumbs.push(Crumb::new(Some(*area_id), area.get_centroid()));
		}
	}
	crumbs.push(Crumb::new(None, destination));
	crumbs
}

/// The active navigation request of an agent. Created when a request is
/// accepted, cleared on arrival, cancellation or supersession by a request of
/// equal or higher priority
#[derive(Default, Clone, Debug)]
pub struct RouteState {
	/// Priority of the active request, zero when idle
	priority: i32,
	/// Remaining waypoints, the head is consumed as it is reached
	crumbs: Vec<Crumb>,
	/// Final destination point, outlives the crumbs so arrival is exact
	end_point: Option<Vec3>,
	/// Re-issue the request when the route becomes impassable
	ensure_arrival: bool,
}

impl RouteState {
	/// Would a request at `priority` be accepted right now. Lower-priority
	/// requests fail routinely and silently
	pub fn accepts_priority(&self, priority: i32) -> bool {
		priority >= self.priority
	}
	/// Get the active priority
	pub fn get_priority(&self) -> i32 {
		self.priority
	}
	/// Get the remaining crumbs
	pub fn get_crumbs(&self) -> &Vec<Crumb> {
		&self.crumbs
	}
	/// Get the head crumb
	pub fn head(&self) -> Option<&Crumb> {
		self.crumbs.first()
	}
	/// Consume the head crumb
	pub fn pop_head(&mut self) -> Option<Crumb> {
		if self.crumbs.is_empty() {
			None
		} else {
			Some(self.crumbs.remove(0))
		}
	}
	/// Get the final destination
	pub fn get_end_point(&self) -> Option<Vec3> {
		self.end_point
	}
	/// Forget the final destination once reached
	pub fn take_end_point(&mut self) -> Option<Vec3> {
		self.end_point.take()
	}
	/// Should the follower re-issue this request when blocked
	pub fn is_ensure_arrival(&self) -> bool {
		self.ensure_arrival
	}
	/// Is there anything left to walk toward
	pub fn is_active(&self) -> bool {
		!self.crumbs.is_empty() || self.end_point.is_some()
	}
	/// Install a freshly accepted route
	pub fn activate(
		&mut self,
		priority: i32,
		crumbs: Vec<Crumb>,
		end_point: Vec3,
		ensure_arrival: bool,
	) {
		self.priority = priority;
		self.crumbs = crumbs;
		self.end_point = Some(end_point);
		self.ensure_arrival = ensure_arrival;
	}
	/// Discard the remaining crumbs but keep the request alive, used by the
	/// re-route path
	pub fn discard_crumbs(&mut self) {
		self.crumbs.clear();
	}
	/// Full teardown back to the idle state
	pub fn clear(&mut self) {
		self.priority = 0;
		self.crumbs.clear();
		self.end_point = None;
		self.ensure_arrival = false;
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;

	fn area_at(id: u32, nw: Vec3, se: Vec3, connections: Vec<u32>) -> Area {
		Area::new(
			AreaId::new(id),
			nw,
			se,
			AreaFlags::default(),
			connections.into_iter().map(AreaId::new).collect(),
		)
	}

	fn three_area_mesh() -> NavMesh {
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
					Vec3::new(100.0, 0.0, 0.0),
					Vec3::new(200.0, 100.0, 0.0),
					vec![1, 3],
				),
				area_at(
					3,
					Vec3::new(200.0, 0.0, 0.0),
					Vec3::new(300.0, 100.0, 0.0),
					vec![2],
				),
			],
		)
	}

	#[test]
	fn trail_shape_exit_center_per_hop() {
		let mesh = three_area_mesh();
		let profile = AgentProfile::default();
		let path = vec![AreaId::new(1), AreaId::new(2), AreaId::new(3)];
		let destination = Vec3::new(280.0, 40.0, 0.0);
		let crumbs = build_crumb_trail(&mesh, &path, destination, &profile);
		// two crumbs per traversed connection, the last area centroid, the destination
		assert_eq!(crumbs.len(), 6);
		assert_eq!(crumbs[0].area, Some(AreaId::new(1)));
		assert_eq!(crumbs[2].area, Some(AreaId::new(2)));
		assert_eq!(
			crumbs[4],
			Crumb::new(
				Some(AreaId::new(3)),
				mesh.get_area(AreaId::new(3)).unwrap().get_centroid()
			)
		);
		let last = crumbs.last().unwrap();
		assert_eq!(last.area, None);
		assert_eq!(last.pos, destination);
	}
	#[test]
	fn single_area_trail_is_centroid_then_destination() {
		let mesh = three_area_mesh();
		let profile = AgentProfile::default();
		let destination = Vec3::new(10.0, 10.0, 0.0);
		let crumbs = build_crumb_trail(&mesh, &[AreaId::new(1)], destination, &profile);
		assert_eq!(crumbs.len(), 2);
		assert_eq!(crumbs[0].area, Some(AreaId::new(1)));
		assert_eq!(crumbs[1].area, None);
	}
	#[test]
	fn priority_acceptance() {
		let mut route = RouteState::default();
		route.activate(5, vec![], Vec3::ZERO, false);
		assert!(!route.accepts_priority(3));
		assert!(route.accepts_priority(5));
		assert!(route.accepts_priority(6));
	}
	#[test]
	fn clear_resets_everything() {
		let mut route = RouteState::default();
		route.activate(
			7,
			vec![Crumb::new(None, Vec3::X)],
			Vec3::new(1.0, 2.0, 3.0),
			true,
		);
		route.clear();
		assert_eq!(route.get_priority(), 0);
		assert!(route.get_crumbs().is_empty());
		assert!(route.get_end_point().is_none());
		assert!(!route.is_ensure_arrival());
		assert!(!route.is_active());
	}
}
