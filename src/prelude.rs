//! `use bevy_nav_agent_plugin::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::navigation::{
	cache::*, follower::*, graph::*, mesh::*, refine::*, search::*, trail::*, usage::*,
	utilities::*, vischeck::*,
};

#[doc(hidden)]
pub use crate::{
	bundle::*,
	plugin::{follow_layer::*, mesh_layer::*, route_layer::*, *},
};
