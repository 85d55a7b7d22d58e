//! Defines the Bevy [Plugin] wiring the navigation layers together
//!

use crate::prelude::*;
use bevy::prelude::*;
use std::sync::Arc;

pub mod follow_layer;
pub mod mesh_layer;
pub mod route_layer;

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	/// Mesh publication, cache sweeps and score upkeep
	Tidy,
	/// Route requests and per-tick following
	Navigate,
}

/// Tunables of the navigation subsystem, shared by every agent
#[derive(Resource, Clone, Debug)]
pub struct NavPluginConfig {
	/// Movement properties routes are planned for
	pub profile: AgentProfile,
	/// Milliseconds without progress before an agent counts as stuck
	pub stuck_time_ms: u64,
	/// Re-issue a route when its remaining trail is found blocked or marked
	/// dangerous
	pub repath_on_block: bool,
	/// Bias edge costs by observed area traffic
	pub usage_scoring: bool,
	/// Chatty logging of requests and solves
	pub log_pathing: bool,
}

impl Default for NavPluginConfig {
	fn default() -> Self {
		NavPluginConfig {
			profile: AgentProfile::default(),
			stuck_time_ms: 1000,
			repath_on_block: false,
			usage_scoring: true,
			log_pathing: false,
		}
	}
}

/// App-provided collision query collaborator, required for any vischeck to
/// run. Without it every connection falls back to its memoised or default
/// verdict
#[derive(Resource, Clone)]
pub struct RayCaster(pub Arc<dyn CollisionWorld + Send + Sync>);

/// App-provided mesh loading collaborator
#[derive(Resource, Clone)]
pub struct MeshLoader(pub Arc<dyn MeshSource + Send + Sync>);

/// Mutable per-map navigation state, torn down whenever a mesh is (re)loaded.
/// Owning the caches in one place keeps resets idempotent, clearing this and
/// the agents' routes is a full navigation reset
#[derive(Resource, Default)]
pub struct NavSession {
	/// Memoised vischeck verdicts
	pub cache: VischeckCache,
	/// Solve-state over the area graph
	pub pather: AreaPather,
	/// Observed per-area traffic
	pub usage: AreaUsage,
	/// Cadence of the cache sweep
	pub sweep_timer: NavTimer,
	/// Cadence of solve resets after usage rescoring
	pub usage_timer: NavTimer,
	/// Cadence of blocked-route checks
	pub repath_timer: NavTimer,
}

impl NavSession {
	/// Drop all cached state, leaving edge costs to be rediscovered
	pub fn reset(&mut self) {
		self.cache.clear();
		self.pather.reset();
		self.usage.clear();
	}
}

pub struct NavAgentPlugin;

impl Plugin for NavAgentPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.register_type::<AreaId>()
			.register_type::<AreaFlags>()
			.register_type::<AgentProfile>()
			.register_type::<FollowerState>()
			.add_event::<mesh_layer::EventLoadNavMesh>()
			.add_event::<route_layer::EventRouteRequest>()
			.add_event::<route_layer::EventCancelRoute>()
			.add_event::<route_layer::EventMarkNavPoint>()
			.add_event::<route_layer::EventRouteToMark>()
			.add_event::<route_layer::EventDebugTraverseCheck>()
			.init_resource::<NavPluginConfig>()
			.init_resource::<NavSession>()
			.init_resource::<mesh_layer::NavMeshHandle>()
			.init_resource::<route_layer::DangerMarks>()
			.init_resource::<route_layer::NavMark>()
			.configure_sets(Update, (OrderingSet::Tidy, OrderingSet::Navigate).chain())
			.add_systems(
				Update,
				(
					(
						mesh_layer::process_mesh_load_requests,
						mesh_layer::poll_mesh_load,
						route_layer::sweep_vischeck_cache,
						route_layer::update_area_usage,
					)
						.chain()
						.in_set(OrderingSet::Tidy),
					(
						route_layer::process_cancellations,
						route_layer::process_debug_events,
						route_layer::process_route_requests,
						follow_layer::check_active_routes,
						follow_layer::follow_path,
					)
						.chain()
						.in_set(OrderingSet::Navigate),
				),
			);
	}
}
