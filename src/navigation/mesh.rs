//! The navigation mesh is a collection of convex areas tiling the walkable
//! space of a map. Areas are loaded once per session and never mutated, all
//! other structures refer to them by [AreaId]
//!

use std::collections::BTreeMap;

use crate::prelude::*;
use bevy::prelude::*;
use thiserror::Error;

/// Unique identifier of an [Area] within a [NavMesh]. Used as the key of every
/// per-area map so nothing depends on where an area happens to live in memory
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Reflect, Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AreaId(u32);

impl AreaId {
	/// Create an [AreaId] from a raw mesh id
	pub fn new(id: u32) -> Self {
		AreaId(id)
	}
	/// Get the raw id
	pub fn get(&self) -> u32 {
		self.0
	}
}

/// Attribute flags an [Area] may carry, as stored in the mesh
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Reflect, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AreaFlags(u32);

impl AreaFlags {
	/// Jumping is forbidden while inside the area
	pub const NO_JUMP: AreaFlags = AreaFlags(1 << 3);
	/// The area is a staircase, jumping would interrupt the climb
	pub const STAIRS: AreaFlags = AreaFlags(1 << 12);

	/// Create flags from the raw mesh attribute bits
	pub fn new(bits: u32) -> Self {
		AreaFlags(bits)
	}
	/// Are any of the bits of `other` set
	pub fn contains_any(&self, other: AreaFlags) -> bool {
		self.0 & other.0 != 0
	}
	/// Combine two sets of flags
	pub fn union(&self, other: AreaFlags) -> AreaFlags {
		AreaFlags(self.0 | other.0)
	}
}

/// A convex walkable region of the mesh with a rectangular footprint. The
/// footprint is described by the north-west and south-east corners where each
/// corner carries its own height
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug)]
pub struct Area {
	/// Unique id of the area
	id: AreaId,
	/// Centre of the area
	centroid: Vec3,
	/// North-west corner, minimum `x` and `y` of the footprint
	nw_corner: Vec3,
	/// South-east corner, maximum `x` and `y` of the footprint
	se_corner: Vec3,
	/// Mesh attribute flags
	flags: AreaFlags,
	/// Areas this one has a directed connection to
	connections: Vec<AreaId>,
}

impl Area {
	/// Create a new [Area] from its footprint corners, the centroid is derived
	pub fn new(
		id: AreaId,
		nw_corner: Vec3,
		se_corner: Vec3,
		flags: AreaFlags,
		connections: Vec<AreaId>,
	) -> Self {
		let centroid = (nw_corner + se_corner) / 2.0;
		Area {
			id,
			centroid,
			nw_corner,
			se_corner,
			flags,
			connections,
		}
	}
	/// Get the id
	pub fn get_id(&self) -> AreaId {
		self.id
	}
	/// Get the centre point
	pub fn get_centroid(&self) -> Vec3 {
		self.centroid
	}
	/// Get the north-west corner
	pub fn get_nw_corner(&self) -> Vec3 {
		self.nw_corner
	}
	/// Get the south-east corner
	pub fn get_se_corner(&self) -> Vec3 {
		self.se_corner
	}
	/// Get the attribute flags
	pub fn get_flags(&self) -> AreaFlags {
		self.flags
	}
	/// Get the outgoing connections
	pub fn get_connections(&self) -> &Vec<AreaId> {
		&self.connections
	}
	/// Is the `(x, y)` position of `point` within the footprint
	pub fn is_overlapping(&self, point: Vec3) -> bool {
		point.x >= self.nw_corner.x
			&& point.x <= self.se_corner.x
			&& point.y >= self.nw_corner.y
			&& point.y <= self.se_corner.y
	}
	/// Find the point on the area boundary (or interior) nearest to a 2D
	/// `target`, with the height interpolated between the footprint corners
	pub fn nearest_point(&self, target: Vec2) -> Vec3 {
		let x = target.x.clamp(self.nw_corner.x, self.se_corner.x);
		let y = target.y.clamp(self.nw_corner.y, self.se_corner.y);
		let z = self.height_at(x, y);
		Vec3::new(x, y, z)
	}
	/// Interpolated height of the footprint at `(x, y)`
	fn height_at(&self, x: f32, y: f32) -> f32 {
		let dx = self.se_corner.x - self.nw_corner.x;
		let dy = self.se_corner.y - self.nw_corner.y;
		let tx = if dx.abs() > f32::EPSILON {
			(x - self.nw_corner.x) / dx
		} else {
			0.0
		};
		let ty = if dy.abs() > f32::EPSILON {
			(y - self.nw_corner.y) / dy
		} else {
			0.0
		};
		let t = (tx + ty) / 2.0;
		self.nw_corner.z + (self.se_corner.z - self.nw_corner.z) * t
	}
}

/// The immutable set of [Area]s for the current map. Owned by the navigation
/// session, everything else borrows it
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, Default)]
pub struct NavMesh {
	/// Map identifier this mesh was built from
	map_name: String,
	/// All areas keyed by id
	areas: BTreeMap<AreaId, Area>,
}

impl NavMesh {
	/// Create a [NavMesh] from a list of areas
	pub fn new(map_name: String, area_list: Vec<Area>) -> Self {
		let mut areas = BTreeMap::new();
		for area in area_list {
			areas.insert(area.get_id(), area);
		}
		NavMesh { map_name, areas }
	}
	/// Get the map identifier
	pub fn get_map_name(&self) -> &str {
		&self.map_name
	}
	/// Get the map of areas
	pub fn get(&self) -> &BTreeMap<AreaId, Area> {
		&self.areas
	}
	/// Get an area by id
	pub fn get_area(&self, id: AreaId) -> Option<&Area> {
		self.areas.get(&id)
	}
	/// Number of areas in the mesh
	pub fn area_count(&self) -> usize {
		self.areas.len()
	}
	/// Find the area enclosing `point`, preferring areas whose footprint
	/// overlaps it and whose centroid is visible from it (both raised by the
	/// jump height so probes run at collision-hull height). Falls back to the
	/// area with the nearest centroid so a query off the mesh still resolves
	pub fn find_closest_area(
		&self,
		point: Vec3,
		collision: &dyn CollisionWorld,
		profile: &AgentProfile,
	) -> Option<AreaId> {
		let mut point_corrected = point;
		point_corrected.z += profile.get_jump_height();
		let mut best_dist = f32::MAX;
		let mut overlap_best_dist = f32::MAX;
		let mut best: Option<AreaId> = None;
		let mut overlap_best: Option<AreaId> = None;
		for (id, area) in self.areas.iter() {
			let dist = area.get_centroid().distance(point);
			if dist < best_dist {
				best_dist = dist;
				best = Some(*id);
			}
			let mut centroid_corrected = area.get_centroid();
			centroid_corrected.z += profile.get_jump_height();
			if overlap_best_dist < dist
				|| !area.is_overlapping(point)
				|| !is_point_visible(collision, point_corrected, centroid_corrected, MASK_AGENT_SOLID)
			{
				continue;
			}
			overlap_best_dist = dist;
			overlap_best = Some(*id);
		}
		overlap_best.or(best)
	}
	/// Deserialize a [NavMesh] from a RON file
	#[cfg(feature = "ron")]
	pub fn from_file(path: String) -> Result<Self, MeshLoadError> {
		let file = std::fs::File::open(path)?;
		let mesh: NavMesh =
			ron::de::from_reader(file).map_err(|e| MeshLoadError::Parse(e.to_string()))?;
		Ok(mesh)
	}
}

/// Why a mesh failed to load. A failed load leaves navigation unavailable and
/// all route requests fail fast until a reload succeeds
#[derive(Error, Debug)]
pub enum MeshLoadError {
	#[error("failed to read mesh data: {0}")]
	Io(#[from] std::io::Error),
	#[error("failed to parse mesh data: {0}")]
	Parse(String),
	#[error("mesh contains no areas for map `{0}`")]
	Empty(String),
}

/// Collaborator that produces a [NavMesh] for a map identifier. The on-disk
/// format belongs to the implementor, the plugin only sees the result
pub trait MeshSource {
	fn load_mesh(&self, map_name: &str) -> Result<NavMesh, MeshLoadError>;
}

/// A [MeshSource] reading `<directory>/<map_name>.ron` files
#[cfg(feature = "ron")]
pub struct RonMeshSource {
	/// Directory containing one RON mesh per map
	directory: String,
}

#[cfg(feature = "ron")]
impl RonMeshSource {
	pub fn new(directory: String) -> Self {
		RonMeshSource { directory }
	}
}

#[cfg(feature = "ron")]
impl MeshSource for RonMeshSource {
	fn load_mesh(&self, map_name: &str) -> Result<NavMesh, MeshLoadError> {
		let path = format!("{}/{}.ron", self.directory, map_name);
		let mesh = NavMesh::from_file(path)?;
		if mesh.area_count() == 0 {
			return Err(MeshLoadError::Empty(map_name.to_string()));
		}
		Ok(mesh)
	}
}
