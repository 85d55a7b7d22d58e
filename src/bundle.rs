//!
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Everything an entity needs to be routed and steered by the navigation
/// systems. The app's movement layer keeps [AgentVelocity], [Grounded] and
/// [AgentStance] up to date and reads [MovementTarget] and [MotionInputs]
/// back each tick
#[derive(Bundle, Default)]
pub struct NavAgentBundle {
	agent: NavAgent,
	velocity: AgentVelocity,
	grounded: Grounded,
	stance: AgentStance,
	movement_target: MovementTarget,
	motion_inputs: MotionInputs,
}

impl NavAgentBundle {
	/// Create a new instance of [NavAgentBundle] in the idle state
	pub fn new() -> Self {
		NavAgentBundle::default()
	}
}
