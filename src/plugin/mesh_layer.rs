//! Loads navigation meshes on a background worker and publishes the active
//! one. Until a mesh is active every route request fails fast, the follower
//! idles and nothing panics, readiness is polled rather than awaited
//!

use crate::prelude::*;
use bevy::prelude::*;
use bevy::tasks::{block_on, futures_lite::future, AsyncComputeTaskPool, Task};

/// Readiness of the navigation subsystem
#[derive(Reflect, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavState {
	/// No mesh, no loader or the last load failed
	#[default]
	Unavailable,
	/// A load is running on the worker
	Loading,
	/// A mesh is published and routes can be planned
	Active,
}

/// Request loading the mesh of `map_name`. Any load, re-loading the active
/// map included, tears the session and every agent's route down first so a
/// stale area handle can never survive a map change
#[derive(Event)]
pub struct EventLoadNavMesh {
	map_name: String,
}

impl EventLoadNavMesh {
	pub fn new(map_name: String) -> Self {
		EventLoadNavMesh { map_name }
	}
	pub fn get_map_name(&self) -> &str {
		&self.map_name
	}
}

/// The published mesh and the in-flight load, if any
#[derive(Resource, Default)]
pub struct NavMeshHandle {
	/// Map the mesh belongs to, or the one being loaded
	map_name: String,
	/// The active mesh
	mesh: Option<NavMesh>,
	/// The in-flight load
	loading: Option<Task<Result<NavMesh, MeshLoadError>>>,
}

impl NavMeshHandle {
	/// Current readiness
	pub fn get_state(&self) -> NavState {
		if self.mesh.is_some() {
			NavState::Active
		} else if self.loading.is_some() {
			NavState::Loading
		} else {
			NavState::Unavailable
		}
	}
	/// Is a mesh published
	pub fn is_active(&self) -> bool {
		self.mesh.is_some()
	}
	/// Get the active mesh
	pub fn get(&self) -> Option<&NavMesh> {
		self.mesh.as_ref()
	}
	/// Get the map name of the active or loading mesh
	pub fn get_map_name(&self) -> &str {
		&self.map_name
	}
	/// Publish a mesh directly without going through the worker, used by apps
	/// that build meshes procedurally and by tests
	pub fn activate_with(&mut self, mesh: NavMesh) {
		self.map_name = mesh.get_map_name().to_string();
		self.mesh = Some(mesh);
		self.loading = None;
	}
	/// Drop the mesh and any in-flight load
	pub fn clear(&mut self) {
		self.map_name.clear();
		self.mesh = None;
		self.loading = None;
	}
}

/// Read [EventLoadNavMesh] and kick the load off on the async worker. The
/// session and every agent's route are torn down immediately so nothing keeps
/// navigating against the outgoing mesh
pub fn process_mesh_load_requests(
	mut events: EventReader<EventLoadNavMesh>,
	loader: Option<Res<MeshLoader>>,
	mut handle: ResMut<NavMeshHandle>,
	mut session: ResMut<NavSession>,
	mut agents: Query<&mut NavAgent>,
) {
	for event in events.read() {
		session.reset();
		for mut agent in agents.iter_mut() {
			agent.cancel();
		}
		// reloading the active map is a state reset, not a re-parse
		if handle.is_active() && handle.map_name == event.get_map_name() {
			info!("nav mesh for map {} reset", event.get_map_name());
			continue;
		}
		handle.mesh = None;
		handle.map_name = event.get_map_name().to_string();
		let Some(loader) = loader.as_ref() else {
			warn!("no mesh loader registered, navigation stays unavailable");
			handle.loading = None;
			continue;
		};
		info!("loading nav mesh for map {}", event.get_map_name());
		let source = loader.0.clone();
		let map_name = event.get_map_name().to_string();
		handle.loading = Some(
			AsyncComputeTaskPool::get().spawn(async move { source.load_mesh(&map_name) }),
		);
	}
}

/// Poll the in-flight load and publish the mesh once the worker is done
pub fn poll_mesh_load(mut handle: ResMut<NavMeshHandle>, mut session: ResMut<NavSession>) {
	let Some(task) = handle.loading.as_mut() else {
		return;
	};
	let Some(result) = block_on(future::poll_once(task)) else {
		return;
	};
	handle.loading = None;
	match result {
		Ok(mesh) => {
			info!(
				"nav mesh active, {} areas for map {}",
				mesh.area_count(),
				mesh.get_map_name()
			);
			session.reset();
			handle.activate_with(mesh);
		}
		Err(error) => {
			warn!("nav mesh load failed, navigation unavailable: {}", error);
		}
	}
}
