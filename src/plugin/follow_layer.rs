//! Per-tick steering of routed agents and the blocked-route checks on their
//! remaining trails
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Velocity of the agent as reported by the app's movement layer, fed into
/// progress detection
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct AgentVelocity(pub Vec3);

/// Whether the agent is standing on the ground, fed into the crouch-jump
/// sequence
#[derive(Component, Clone, Copy, Debug)]
pub struct Grounded(pub bool);

impl Default for Grounded {
	fn default() -> Self {
		Grounded(true)
	}
}

/// Stances that forbid jumping while held
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct AgentStance {
	/// Aiming down a scope
	pub zoomed: bool,
	/// Spinning up a heavy weapon
	pub revved: bool,
}

impl AgentStance {
	pub fn blocks_jump(&self) -> bool {
		self.zoomed || self.revved
	}
}

/// The point the movement actuator should steer toward this tick, [None]
/// while no route is being followed
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct MovementTarget(pub Option<Vec3>);

/// Button presses the movement actuator should apply this tick
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct MotionInputs {
	pub jump: bool,
	pub duck: bool,
}

/// Advance every routed agent by one control tick, writing the steering
/// target and button presses its actuator reads
#[cfg(not(tarpaulin_include))]
pub fn follow_path(
	handle: Res<NavMeshHandle>,
	caster: Option<Res<RayCaster>>,
	config: Res<NavPluginConfig>,
	time: Res<Time>,
	mut agents: Query<(
		&mut NavAgent,
		&Transform,
		&AgentVelocity,
		&Grounded,
		&AgentStance,
		&mut MovementTarget,
		&mut MotionInputs,
	)>,
) {
	let (mesh, caster) = match (handle.get(), caster.as_ref()) {
		(Some(mesh), Some(caster)) => (mesh, caster),
		_ => {
			for (_, _, _, _, _, mut target, mut inputs) in agents.iter_mut() {
				target.0 = None;
				*inputs = MotionInputs::default();
			}
			return;
		}
	};
	for (mut agent, transform, velocity, grounded, stance, mut target, mut inputs) in
		agents.iter_mut()
	{
		let input = FollowerInput {
			position: transform.translation,
			velocity: velocity.0,
			grounded: grounded.0,
			stance_blocks_jump: stance.blocks_jump(),
			now: time.elapsed(),
		};
		let output = agent.follow_tick(
			input,
			mesh,
			caster.0.as_ref(),
			&config.profile,
			config.stuck_time_ms,
		);
		if output.arrived && config.log_pathing {
			debug!("agent arrived at {}", transform.translation);
		}
		target.0 = output.target;
		inputs.jump = output.jump;
		inputs.duck = output.duck;
	}
}

/// Re-probe the remaining trails of ensure-arrival routes on a fixed cadence.
/// A trail crossing a blocked connection or a danger-marked area is discarded
/// and the same request re-issued so the next solve routes around the problem
#[cfg(not(tarpaulin_include))]
pub fn check_active_routes(
	handle: Res<NavMeshHandle>,
	caster: Option<Res<RayCaster>>,
	config: Res<NavPluginConfig>,
	danger: Res<DangerMarks>,
	mut session: ResMut<NavSession>,
	time: Res<Time>,
	mut agents: Query<(Entity, &mut NavAgent)>,
	mut requests: EventWriter<EventRouteRequest>,
) {
	if !config.repath_on_block {
		return;
	}
	let (Some(_), Some(caster)) = (handle.get(), caster.as_ref()) else {
		return;
	};
	let now = time.elapsed();
	if !session.repath_timer.test_and_set(now, REPATH_CHECK_INTERVAL_MS) {
		return;
	}
	let lift = Vec3::new(0.0, 0.0, config.profile.get_jump_height());
	for (entity, mut agent) in agents.iter_mut() {
		if agent.get_state() != FollowerState::Following
			|| !agent.get_route().is_ensure_arrival()
		{
			continue;
		}
		let mut blocked_pair: Option<(AreaId, AreaId)> = None;
		let mut danger_hit = false;
		let crumbs = agent.get_route().get_crumbs();
		for crumb in crumbs.iter() {
			if let Some(area) = crumb.area {
				if danger.is_marked(area, now) {
					danger_hit = true;
					break;
				}
			}
		}
		if !danger_hit {
			for window in crumbs.windows(2) {
				let (Some(from), Some(to)) = (window[0].area, window[1].area) else {
					continue;
				};
				if from == to {
					continue;
				}
				// probes run at hull height like the planner's vischecks
				if !is_point_visible(
					caster.0.as_ref(),
					window[0].pos + lift,
					window[1].pos + lift,
					MASK_AGENT_SOLID,
				) {
					blocked_pair = Some((from, to));
					break;
				}
			}
		}
		if blocked_pair.is_none() && !danger_hit {
			continue;
		}
		if let Some((from, to)) = blocked_pair {
			// overwrite the memoised verdict so the re-solve avoids the edge
			session.cache.insert(from, to, false, now);
			session.pather.reset();
		}
		let priority = agent.get_route().get_priority();
		let Some(destination) = agent.get_route().get_end_point() else {
			continue;
		};
		agent.get_route_mut().discard_crumbs();
		requests.write(EventRouteRequest::new(entity, destination, priority, true, true));
		if config.log_pathing {
			debug!(
				"active route blocked, re-requesting {} at priority {}",
				destination, priority
			);
		}
	}
}
