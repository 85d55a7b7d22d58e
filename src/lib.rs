//! This is a plugin for Bevy game engine to plan routes over a navigation mesh and steer agents along them
//!

pub mod navigation;
pub mod bundle;
pub mod plugin;

pub mod prelude;
