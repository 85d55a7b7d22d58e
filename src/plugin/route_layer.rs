//! Logic turning route requests into accepted crumb trails plus the session
//! upkeep around them, cache sweeps, usage scoring and danger marks
//!

use crate::prelude::*;
use bevy::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

/// Ask the navigation systems to route an agent entity to a world position.
/// Requests below the priority of an agent's active route fail routinely and
/// silently, this is the arbitration between competing behaviours
#[derive(Event)]
pub struct EventRouteRequest {
	/// The agent to route
	entity: Entity,
	/// Where it should end up
	destination: Vec3,
	/// Priority of the requesting behaviour
	priority: i32,
	/// Re-issue the request if the trail becomes blocked
	ensure_arrival: bool,
	/// Keep the first waypoints inside the agent's own area, normally they
	/// are skipped since the agent already stands there
	nav_to_local: bool,
}

impl EventRouteRequest {
	pub fn new(
		entity: Entity,
		destination: Vec3,
		priority: i32,
		ensure_arrival: bool,
		nav_to_local: bool,
	) -> Self {
		EventRouteRequest {
			entity,
			destination,
			priority,
			ensure_arrival,
			nav_to_local,
		}
	}
}

/// Drop an agent's route whatever its priority
#[derive(Event)]
pub struct EventCancelRoute {
	entity: Entity,
}

impl EventCancelRoute {
	pub fn new(entity: Entity) -> Self {
		EventCancelRoute { entity }
	}
}

/// Marker for entities whose position feeds the usage scores, typically every
/// character on the map rather than just the routed agents
#[derive(Component, Default)]
pub struct UsageSource;

/// Areas flagged dangerous by outside observers, a hazard seen, a death spot.
/// Marks expire on the sweep cadence and gate the blocked-route checks, they
/// do not remove areas from the graph
#[derive(Resource, Default)]
pub struct DangerMarks {
	/// Expiry stamp per marked area
	marks: HashMap<AreaId, Duration>,
}

impl DangerMarks {
	/// Flag an area as dangerous for [DANGER_MARK_TIMEOUT_MS]
	pub fn mark(&mut self, area: AreaId, now: Duration) {
		self.marks
			.insert(area, now + Duration::from_millis(DANGER_MARK_TIMEOUT_MS));
	}
	/// Is the area currently flagged
	pub fn is_marked(&self, area: AreaId, now: Duration) -> bool {
		self.marks.get(&area).is_some_and(|expire| *expire > now)
	}
	/// Evict expired marks
	pub fn sweep(&mut self, now: Duration) {
		self.marks.retain(|_, expire| *expire > now);
	}
	/// Drop all marks, used on map change
	pub fn clear(&mut self) {
		self.marks.clear();
	}
}

/// Plan a route for `agent` and install it as the active crumb trail.
/// Returns `false` without logging noise when the request loses arbitration,
/// when navigation is not ready or when no route exists, callers poll and
/// retry rather than handle errors. Any failure past arbitration clears the
/// agent so no partial route survives
#[allow(clippy::too_many_arguments)]
pub fn request_route(
	agent: &mut NavAgent,
	agent_position: Vec3,
	destination: Vec3,
	priority: i32,
	ensure_arrival: bool,
	nav_to_local: bool,
	mesh: &NavMesh,
	session: &mut NavSession,
	collision: &dyn CollisionWorld,
	config: &NavPluginConfig,
	now: Duration,
) -> bool {
	if !agent.get_route().accepts_priority(priority) {
		return false;
	}
	let Some(start) = mesh.find_closest_area(agent_position, collision, &config.profile) else {
		agent.cancel();
		return false;
	};
	let Some(goal) = mesh.find_closest_area(destination, collision, &config.profile) else {
		agent.cancel();
		return false;
	};
	let NavSession {
		cache,
		pather,
		usage,
		..
	} = session;
	let usage = config.usage_scoring.then_some(&*usage);
	let mut graph = NavGraphAdapter::new(mesh, cache, collision, &config.profile, usage, now);
	let Some((mut path, cost)) = pather.solve(&mut graph, start, goal) else {
		agent.cancel();
		return false;
	};
	if !nav_to_local && !path.is_empty() {
		// the agent already stands in the first area
		path.remove(0);
	}
	let crumbs = build_crumb_trail(mesh, &path, destination, &config.profile);
	agent.accept_route(priority, crumbs, destination, ensure_arrival, now);
	if config.log_pathing {
		debug!(
			"route accepted, {} areas at cost {:.0} from {:?} to {:?}",
			path.len(),
			cost,
			start,
			goal
		);
	}
	true
}

/// Process [EventRouteRequest] against the active mesh
#[cfg(not(tarpaulin_include))]
pub fn process_route_requests(
	mut events: EventReader<EventRouteRequest>,
	handle: Res<NavMeshHandle>,
	caster: Option<Res<RayCaster>>,
	config: Res<NavPluginConfig>,
	mut session: ResMut<NavSession>,
	time: Res<Time>,
	mut agents: Query<(&mut NavAgent, &Transform)>,
) {
	for event in events.read() {
		let Some(mesh) = handle.get() else {
			debug!("route request dropped, no active nav mesh");
			continue;
		};
		let Some(caster) = caster.as_ref() else {
			debug!("route request dropped, no ray caster registered");
			continue;
		};
		let Ok((mut agent, transform)) = agents.get_mut(event.entity) else {
			continue;
		};
		let accepted = request_route(
			&mut agent,
			transform.translation,
			event.destination,
			event.priority,
			event.ensure_arrival,
			event.nav_to_local,
			mesh,
			&mut session,
			caster.0.as_ref(),
			&config,
			time.elapsed(),
		);
		if config.log_pathing && !accepted {
			debug!(
				"route request to {:?} at priority {} not accepted",
				event.destination, event.priority
			);
		}
	}
}

/// Process [EventCancelRoute]
#[cfg(not(tarpaulin_include))]
pub fn process_cancellations(
	mut events: EventReader<EventCancelRoute>,
	mut agents: Query<&mut NavAgent>,
) {
	for event in events.read() {
		if let Ok(mut agent) = agents.get_mut(event.entity) {
			agent.cancel();
		}
	}
}

/// Evict expired vischeck verdicts and danger marks on a fixed cadence. Any
/// eviction resets the solve cache so no memoised route outlives the verdicts
/// it was priced against
#[cfg(not(tarpaulin_include))]
pub fn sweep_vischeck_cache(
	mut session: ResMut<NavSession>,
	mut danger: ResMut<DangerMarks>,
	time: Res<Time>,
) {
	let now = time.elapsed();
	if !session.sweep_timer.test_and_set(now, CACHE_SWEEP_INTERVAL_MS) {
		return;
	}
	danger.sweep(now);
	if session.cache.sweep(now) {
		session.pather.reset();
		debug!("expired vischeck entries swept, solve cache reset");
	}
}

/// Accumulate dwell time of every [UsageSource] into the usage scores and
/// periodically reset the solve cache so the new scores take effect
#[cfg(not(tarpaulin_include))]
pub fn update_area_usage(
	handle: Res<NavMeshHandle>,
	caster: Option<Res<RayCaster>>,
	config: Res<NavPluginConfig>,
	mut session: ResMut<NavSession>,
	time: Res<Time>,
	sources: Query<&Transform, With<UsageSource>>,
) {
	if !config.usage_scoring {
		return;
	}
	let (Some(mesh), Some(caster)) = (handle.get(), caster.as_ref()) else {
		return;
	};
	for transform in sources.iter() {
		if let Some(area) =
			mesh.find_closest_area(transform.translation, caster.0.as_ref(), &config.profile)
		{
			session.usage.add_dwell(area, time.delta_secs());
		}
	}
	let now = time.elapsed();
	if session.usage_timer.test_and_set(now, USAGE_RESCORE_INTERVAL_MS)
		&& !session.usage.is_empty()
	{
		session.pather.reset();
	}
}

/// A manually marked world position, a development aid for steering agents
/// around by hand
#[derive(Resource, Default)]
pub struct NavMark {
	point: Option<Vec3>,
}

impl NavMark {
	pub fn get(&self) -> Option<Vec3> {
		self.point
	}
	pub fn set(&mut self, point: Vec3) {
		self.point = Some(point);
	}
	pub fn clear(&mut self) {
		self.point = None;
	}
}

/// Remember a world position for later [EventRouteToMark] requests
#[derive(Event)]
pub struct EventMarkNavPoint {
	position: Vec3,
}

impl EventMarkNavPoint {
	pub fn new(position: Vec3) -> Self {
		EventMarkNavPoint { position }
	}
}

/// Route an agent to the marked position
#[derive(Event)]
pub struct EventRouteToMark {
	entity: Entity,
	priority: i32,
}

impl EventRouteToMark {
	pub fn new(entity: Entity, priority: i32) -> Self {
		EventRouteToMark { entity, priority }
	}
}

/// Log whether two world positions can be walked between in both directions,
/// a development aid for diagnosing vischeck verdicts
#[derive(Event)]
pub struct EventDebugTraverseCheck {
	from: Vec3,
	to: Vec3,
}

impl EventDebugTraverseCheck {
	pub fn new(from: Vec3, to: Vec3) -> Self {
		EventDebugTraverseCheck { from, to }
	}
}

/// Can an agent walk between two world positions, running the same refinement
/// and probes the planner uses for a connection between their enclosing areas
pub fn check_traverse(
	mesh: &NavMesh,
	collision: &dyn CollisionWorld,
	profile: &AgentProfile,
	from: Vec3,
	to: Vec3,
) -> bool {
	let from_area = mesh
		.find_closest_area(from, collision, profile)
		.and_then(|id| mesh.get_area(id));
	let to_area = mesh
		.find_closest_area(to, collision, profile)
		.and_then(|id| mesh.get_area(id));
	if let (Some(from_area), Some(to_area)) = (from_area, to_area) {
		if from_area.get_id() != to_area.get_id() {
			let mut points = determine_points(from_area, to_area);
			points.current = handle_dropdown(points.current, points.center, profile);
			points.center = handle_dropdown(points.center, points.next, profile);
			points.raise(profile);
			return is_agent_passable(
				collision,
				points.current,
				points.center,
				profile,
				MASK_AGENT_SOLID,
			) && is_agent_passable(
				collision,
				points.center,
				points.next,
				profile,
				MASK_AGENT_SOLID,
			);
		}
	}
	let lift = Vec3::new(0.0, 0.0, profile.get_jump_height());
	is_agent_passable(collision, from + lift, to + lift, profile, MASK_AGENT_SOLID)
		&& is_agent_passable(collision, to + lift, from + lift, profile, MASK_AGENT_SOLID)
}

/// Process the development-aid events
#[cfg(not(tarpaulin_include))]
pub fn process_debug_events(
	mut mark_events: EventReader<EventMarkNavPoint>,
	mut route_events: EventReader<EventRouteToMark>,
	mut traverse_events: EventReader<EventDebugTraverseCheck>,
	mut mark: ResMut<NavMark>,
	handle: Res<NavMeshHandle>,
	caster: Option<Res<RayCaster>>,
	config: Res<NavPluginConfig>,
	mut requests: EventWriter<EventRouteRequest>,
) {
	for event in mark_events.read() {
		mark.set(event.position);
		info!("nav point marked at {}", event.position);
	}
	for event in route_events.read() {
		match mark.get() {
			Some(point) => {
				requests.write(EventRouteRequest::new(
					event.entity,
					point,
					event.priority,
					true,
					true,
				));
			}
			None => warn!("no nav point marked, route-to-mark dropped"),
		}
	}
	for event in traverse_events.read() {
		let (Some(mesh), Some(caster)) = (handle.get(), caster.as_ref()) else {
			continue;
		};
		let passable = check_traverse(
			mesh,
			caster.0.as_ref(),
			&config.profile,
			event.from,
			event.to,
		);
		info!(
			"traverse check {} -> {}: {}",
			event.from,
			event.to,
			if passable { "passable" } else { "blocked" }
		);
	}
}
