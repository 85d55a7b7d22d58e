//! Per-tick route following. The follower consumes the crumb trail head by
//! head, measures inactivity to detect a stuck agent and runs the nested
//! crouch-jump sequence when a ledge or a stall calls for it
//!

use crate::prelude::*;
use bevy::prelude::*;
use std::time::Duration;

/// Main states of the follower
#[derive(Reflect, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowerState {
	/// No active route, ready for commands
	#[default]
	Idle,
	/// Walking the crumb trail
	Following,
	/// Destination reached this tick, clears to [FollowerState::Idle] on the next
	Arrived,
}

/// The nested crouch-then-jump sequence. Jump is issued for one tick, crouch
/// is held until the agent has been grounded long enough, then the cooldown
/// restarts
#[derive(Default, Clone, Copy, Debug)]
pub struct JumpState {
	/// Holding crouch mid-sequence
	crouch: bool,
	/// Ticks since the sequence began
	ticks_since_jump: u32,
	/// Cooldown between sequences
	last_jump: NavTimer,
}

/// Everything the follower reads about its agent each tick
#[derive(Clone, Copy, Debug)]
pub struct FollowerInput {
	/// Agent position
	pub position: Vec3,
	/// Agent velocity
	pub velocity: Vec3,
	/// Is the agent standing on the ground
	pub grounded: bool,
	/// An active stance (aiming, zoomed, revved) forbids jumping
	pub stance_blocks_jump: bool,
	/// Elapsed app time
	pub now: Duration,
}

/// What the follower wants the movement actuator to do this tick
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct FollowerOutput {
	/// Point to steer toward
	pub target: Option<Vec3>,
	/// Press jump this tick
	pub jump: bool,
	/// Hold crouch this tick
	pub duck: bool,
	/// The final destination was reached this tick
	pub arrived: bool,
}

/// Attach to an entity to let the navigation systems route and steer it
#[derive(Component, Default)]
pub struct NavAgent {
	/// Current follower state
	state: FollowerState,
	/// The active request and its crumb trail
	route: RouteState,
	/// Time since the agent last made progress
	inactivity: NavTimer,
	/// Crouch-jump sub-state
	jump: JumpState,
}

impl NavAgent {
	/// Get the follower state
	pub fn get_state(&self) -> FollowerState {
		self.state
	}
	/// Get the active route
	pub fn get_route(&self) -> &RouteState {
		&self.route
	}
	/// Get a mutable reference to the active route
	pub fn get_route_mut(&mut self) -> &mut RouteState {
		&mut self.route
	}
	/// Is the agent free for a new request of any priority
	pub fn is_ready(&self) -> bool {
		self.state == FollowerState::Idle
	}
	/// Install an accepted route and start following it
	pub fn accept_route(
		&mut self,
		priority: i32,
		crumbs: Vec<Crumb>,
		end_point: Vec3,
		ensure_arrival: bool,
		now: Duration,
	) {
		self.route.activate(priority, crumbs, end_point, ensure_arrival);
		self.inactivity.update(now);
		self.state = FollowerState::Following;
	}
	/// Drop the route and return to [FollowerState::Idle]
	pub fn cancel(&mut self) {
		self.route.clear();
		self.state = FollowerState::Idle;
	}
	/// Has the agent made no progress for `stuck_time_ms`
	pub fn is_stuck(&self, now: Duration, stuck_time_ms: u64) -> bool {
		self.inactivity.check(now, stuck_time_ms)
	}
	/// Advance the follower by one control tick
	pub fn follow_tick(
		&mut self,
		input: FollowerInput,
		mesh: &NavMesh,
		collision: &dyn CollisionWorld,
		profile: &AgentProfile,
		stuck_time_ms: u64,
	) -> FollowerOutput {
		let mut output = FollowerOutput::default();
		if self.state == FollowerState::Idle {
			return output;
		}
		if !self.route.is_active() {
			// trail exhausted, become ready for the next request
			self.route.clear();
			self.state = FollowerState::Idle;
			return output;
		}
		self.state = FollowerState::Following;

		let mut target = match self.route.head() {
			Some(crumb) => crumb.pos,
			// crumbs consumed, walk the exact destination in
			None => match self.route.get_end_point() {
				Some(point) => point,
				None => return output,
			},
		};

		if input.position.distance(target) < CRUMB_PROXIMITY {
			self.inactivity.update(input.now);
			if self.route.pop_head().is_some() {
				target = match self.route.head() {
					Some(crumb) => crumb.pos,
					None => match self.route.get_end_point() {
						Some(point) => point,
						None => {
							self.state = FollowerState::Idle;
							return output;
						}
					},
				};
			} else {
				// that was the destination itself
				self.route.take_end_point();
				self.state = FollowerState::Arrived;
				output.arrived = true;
				return output;
			}
		} else if input.velocity.length() > MIN_PROGRESS_SPEED {
			// progress without reaching the crumb still counts as not stuck
			self.inactivity.update(input.now);
		}

		let cooled = self.jump.last_jump.check(input.now, JUMP_COOLDOWN_MS);
		let ledge_ahead = target.z - input.position.z > JUMP_TRIGGER_HEIGHT;
		let stalled = self.inactivity.check(input.now, stuck_time_ms / 2);
		if (cooled && !input.stance_blocks_jump && (self.jump.crouch || ledge_ahead))
			|| (cooled && stalled)
		{
			let suppressed = mesh
				.find_closest_area(input.position, collision, profile)
				.and_then(|id| mesh.get_area(id))
				.map(|area| {
					area.get_flags()
						.contains_any(AreaFlags::NO_JUMP.union(AreaFlags::STAIRS))
				})
				.unwrap_or(false);
			if !suppressed {
				// jump on the first tick of the sequence, crouch until landed
				output.jump = !self.jump.crouch;
				output.duck = self.jump.crouch;
				if !self.jump.crouch {
					self.jump.crouch = true;
					self.jump.ticks_since_jump = 0;
				}
				self.jump.ticks_since_jump += 1;
				if input.grounded && self.jump.ticks_since_jump > GROUNDED_SETTLE_TICKS {
					self.jump.crouch = false;
					self.jump.last_jump.update(input.now);
				}
			}
		}

		output.target = Some(target);
		output
	}
}
