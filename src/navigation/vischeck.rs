//! Width-aware passability testing between two points. Instead of a swept
//! volume (roughly 1000x the cost for the coverage it buys) two parallel rays
//! are cast, offset to the left and right of the travel line by half the
//! agent width
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Ray mask selecting geometry that blocks agent movement
pub const MASK_AGENT_SOLID: u32 = 1;

/// Collaborator answering ray queries against live world geometry. A hit
/// means the segment crosses solid geometry. Implementations must be safe to
/// call from the load worker as well as the main schedule
pub trait CollisionWorld {
	fn cast_ray(&self, origin: Vec3, end: Vec3, mask: u32) -> bool;
}

/// Is the straight segment from `from` to `to` unobstructed
pub fn is_point_visible(collision: &dyn CollisionWorld, from: Vec3, to: Vec3, mask: u32) -> bool {
	!collision.cast_ray(from, to, mask)
}

/// Can an agent of the profile width walk the segment from `origin` to
/// `target`. Both probes share the travel direction, their offset axis is the
/// perpendicular of the horizontal travel direction levelled to the ground
/// plane so width is measured across the agent hull rather than tilted with
/// slopes
pub fn is_agent_passable(
	collision: &dyn CollisionWorld,
	origin: Vec3,
	target: Vec3,
	profile: &AgentProfile,
	mask: u32,
) -> bool {
	let travel = target - origin;
	let flat = Vec3::new(travel.x, travel.y, 0.0);
	// perpendicular of the horizontal direction, z stays zeroed
	let right = if flat.length_squared() > f32::EPSILON {
		Vec3::new(flat.y, -flat.x, 0.0).normalize() * (profile.get_width() / 2.0)
	} else {
		// purely vertical travel degenerates to a single centred probe
		Vec3::ZERO
	};

	// both probes must keep the same relative end offset
	let left_origin = origin - right;
	if collision.cast_ray(left_origin, left_origin + travel, mask) {
		return false;
	}
	let right_origin = origin + right;
	!collision.cast_ray(right_origin, right_origin + travel, mask)
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;

	/// Records every cast and answers from a fixed script
	struct ProbeRecorder {
		casts: RefCell<Vec<(Vec3, Vec3)>>,
		hits: Vec<bool>,
	}
	impl ProbeRecorder {
		fn new(hits: Vec<bool>) -> Self {
			ProbeRecorder {
				casts: RefCell::new(Vec::new()),
				hits,
			}
		}
	}
	impl CollisionWorld for ProbeRecorder {
		fn cast_ray(&self, origin: Vec3, end: Vec3, _mask: u32) -> bool {
			let mut casts = self.casts.borrow_mut();
			let hit = self.hits.get(casts.len()).copied().unwrap_or(false);
			casts.push((origin, end));
			hit
		}
	}

	#[test]
	fn two_probes_offset_by_half_width() {
		let world = ProbeRecorder::new(vec![false, false]);
		let profile = AgentProfile::default();
		let origin = Vec3::new(0.0, 0.0, 10.0);
		let target = Vec3::new(100.0, 0.0, 10.0);
		assert!(is_agent_passable(&world, origin, target, &profile, MASK_AGENT_SOLID));
		let casts = world.casts.borrow();
		assert_eq!(casts.len(), 2);
		// travelling along +x, the probes sit either side along y
		let (left_origin, left_end) = casts[0];
		let (right_origin, right_end) = casts[1];
		assert!((left_origin.y - right_origin.y).abs() - profile.get_width() < 1e-4);
		assert_eq!(left_origin.z, 10.0);
		assert_eq!(right_origin.z, 10.0);
		// same relative end offset for both probes
		assert_eq!(left_end - left_origin, target - origin);
		assert_eq!(right_end - right_origin, target - origin);
	}
	#[test]
	fn first_probe_hit_blocks_without_second_cast() {
		let world = ProbeRecorder::new(vec![true]);
		let profile = AgentProfile::default();
		assert!(!is_agent_passable(
			&world,
			Vec3::ZERO,
			Vec3::new(100.0, 0.0, 0.0),
			&profile,
			MASK_AGENT_SOLID
		));
		assert_eq!(world.casts.borrow().len(), 1);
	}
	#[test]
	fn second_probe_hit_blocks() {
		let world = ProbeRecorder::new(vec![false, true]);
		let profile = AgentProfile::default();
		assert!(!is_agent_passable(
			&world,
			Vec3::ZERO,
			Vec3::new(100.0, 0.0, 0.0),
			&profile,
			MASK_AGENT_SOLID
		));
		assert_eq!(world.casts.borrow().len(), 2);
	}
	#[test]
	fn vertical_travel_uses_centred_probe() {
		let world = ProbeRecorder::new(vec![false, false]);
		let profile = AgentProfile::default();
		let origin = Vec3::new(5.0, 5.0, 0.0);
		let target = Vec3::new(5.0, 5.0, 80.0);
		assert!(is_agent_passable(&world, origin, target, &profile, MASK_AGENT_SOLID));
		let casts = world.casts.borrow();
		assert_eq!(casts[0].0, origin);
		assert_eq!(casts[1].0, origin);
	}
}
