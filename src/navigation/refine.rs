//! Refines a coarse area-to-area step into the three waypoints an agent
//! actually walks: the exit point of the current area, a convergence point
//! and the entry point of the next area. Vischecks and crumb generation must
//! both use this logic so what was tested is what gets walked
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Tolerance for deciding whether a boundary point shares an axis with a
/// centroid. Exact float equality is too brittle for mesh data, this is a
/// tunable rather than a derived constant
pub const ALIGNMENT_TOLERANCE: f32 = 0.1;

/// The refined waypoint triple for one traversed connection
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavPoints {
	/// Exit point, on the boundary of the current area
	pub current: Vec3,
	/// Convergence point between the two areas
	pub center: Vec3,
	/// Entry point, on the boundary of the next area
	pub next: Vec3,
}

impl NavPoints {
	pub fn new(current: Vec3, center: Vec3, next: Vec3) -> Self {
		NavPoints {
			current,
			center,
			next,
		}
	}
	/// Raise every point by the agent jump height, the height at which
	/// vischeck probes are cast
	pub fn raise(&mut self, profile: &AgentProfile) {
		self.current.z += profile.get_jump_height();
		self.center.z += profile.get_jump_height();
		self.next.z += profile.get_jump_height();
	}
}

/// Compute the waypoint triple for stepping from `current` into `next`.
///
/// The exit point is the point on the current area's boundary nearest the
/// next centroid and vice versa for the entry point. The convergence point is
/// the exit point unless it is not axis-aligned with either centroid, in
/// which case the entry point is used instead, otherwise the agent would cut
/// the corner through a wall
pub fn determine_points(current: &Area, next: &Area) -> NavPoints {
	let area_center = current.get_centroid();
	let next_center = next.get_centroid();
	let area_closest = current.nearest_point(next_center.truncate());
	let next_closest = next.nearest_point(area_center.truncate());

	let mut center_point = area_closest;
	if (center_point.x - area_center.x).abs() > ALIGNMENT_TOLERANCE
		&& (center_point.y - area_center.y).abs() > ALIGNMENT_TOLERANCE
		&& (center_point.x - next_center.x).abs() > ALIGNMENT_TOLERANCE
		&& (center_point.y - next_center.y).abs() > ALIGNMENT_TOLERANCE
	{
		center_point = next_closest;
	}

	NavPoints::new(area_center, center_point, next_center)
}

/// Correct the start of a segment that ends in a drop the agent cannot jump
/// back up. The start point is pulled forward along the horizontal travel
/// direction by one agent width so the agent steps off the ledge instead of
/// hugging it, then the travel direction is re-derived from the corrected
/// point, a flipped direction means the correction overshot and the start
/// snaps to the target
pub fn handle_dropdown(current_pos: Vec3, next_pos: Vec3, profile: &AgentProfile) -> Vec3 {
	let to_target = next_pos - current_pos;
	// only correct if the fall is too deep to simply walk back up
	if -to_target.z > profile.get_jump_height() {
		let mut flat = Vec3::new(to_target.x, to_target.y, 0.0);
		if flat.length_squared() <= f32::EPSILON {
			return current_pos;
		}
		flat = flat.normalize();
		let corrected = current_pos + flat * profile.get_width();

		let new_to_target = Vec3::new(next_pos.x - corrected.x, next_pos.y - corrected.y, 0.0);
		// direction flipped, corrected point ended up past the target
		if new_to_target.dot(flat) <= 0.0 {
			return next_pos;
		}
		return corrected;
	}
	current_pos
}
