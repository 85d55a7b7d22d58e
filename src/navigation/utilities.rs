//! Shared constants, the agent movement profile and wall-clock timers used
//! across the navigation structures
//!

use bevy::prelude::*;
use std::time::Duration;

/// Distance at which a crumb counts as reached and is consumed
pub const CRUMB_PROXIMITY: f32 = 50.0;
/// Height difference between the agent and the head crumb which triggers the
/// jump sub-state
pub const JUMP_TRIGGER_HEIGHT: f32 = 18.0;
/// Speed below which an agent is not considered to be making progress
pub const MIN_PROGRESS_SPEED: f32 = 100.0;
/// How long a cached vischeck result stays valid
pub const VISCHECK_TTL: Duration = Duration::from_secs(10);
/// Cadence of the cache sweep that evicts expired vischeck entries
pub const CACHE_SWEEP_INTERVAL_MS: u64 = 1000;
/// Minimum time between jump sequences, prevents jump-spam
pub const JUMP_COOLDOWN_MS: u64 = 200;
/// Ticks an agent must be grounded mid-sequence before the crouch flag clears
pub const GROUNDED_SETTLE_TICKS: u32 = 3;
/// Cadence at which accumulated usage scores invalidate the solve cache
pub const USAGE_RESCORE_INTERVAL_MS: u64 = 10000;
/// Cadence of the blocked-route checks on active crumb trails
pub const REPATH_CHECK_INTERVAL_MS: u64 = 500;
/// How long a danger mark on an area lasts before it is swept
pub const DANGER_MARK_TIMEOUT_MS: u64 = 20000;

/// Physical movement properties of the agent the routes are planned for
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Reflect, Clone, Copy, Debug)]
pub struct AgentProfile {
	/// Collision hull width of the agent
	width: f32,
	/// Greatest height difference the agent can clear by jumping
	jump_height: f32,
}

impl Default for AgentProfile {
	fn default() -> Self {
		AgentProfile {
			width: 49.0,
			jump_height: 41.5,
		}
	}
}

impl AgentProfile {
	/// Create a profile from a hull width and jump height
	pub fn new(width: f32, jump_height: f32) -> Self {
		AgentProfile { width, jump_height }
	}
	/// Get the agent hull width
	pub fn get_width(&self) -> f32 {
		self.width
	}
	/// Get half the agent hull width, the offset of each passability probe
	pub fn get_half_width(&self) -> f32 {
		self.width / 2.0
	}
	/// Get the jump height
	pub fn get_jump_height(&self) -> f32 {
		self.jump_height
	}
}

/// A monotonic wall-clock timer driven by elapsed app time. A timer that was
/// never reset counts as already elapsed, so cadenced work runs on its first
/// opportunity after startup. All timers are read and written on the main
/// schedule only so no synchronisation is needed
#[derive(Reflect, Default, Clone, Copy, Debug)]
pub struct NavTimer {
	/// Elapsed app time at which the timer was last reset, [None] until then
	last: Option<Duration>,
}

impl NavTimer {
	/// Reset the timer to `now`
	pub fn update(&mut self, now: Duration) {
		self.last = Some(now);
	}
	/// Has at least `interval_ms` passed since the last reset
	pub fn check(&self, now: Duration, interval_ms: u64) -> bool {
		match self.last {
			Some(last) => now.saturating_sub(last) >= Duration::from_millis(interval_ms),
			None => true,
		}
	}
	/// If the interval has passed reset the timer and report `true`, otherwise
	/// leave it alone and report `false`
	pub fn test_and_set(&mut self, now: Duration, interval_ms: u64) -> bool {
		if self.check(now, interval_ms) {
			self.update(now);
			true
		} else {
			false
		}
	}
}
