//! Route planning and following over a navigation mesh of convex areas.
//!
//! A map is tiled by convex [mesh::Area]s connected by directed edges. When
//! an agent is asked to move somewhere the enclosing areas of both endpoints
//! are located, an area sequence is solved over a graph whose edges are
//! priced and gated live, and the sequence is refined into a trail of 3D
//! crumbs the follower walks one by one.
//!
//! Definitions:
//!
//! * Area - convex walkable region of the mesh
//! * Connection - directed adjacency between two areas
//! * Vischeck - line-of-sight-with-width passability test between two points,
//!   two parallel rays offset by half the agent width
//! * Crumb - one waypoint of the refined route the agent currently walks
//! * Drop-down - a connection whose destination lies far enough below that it
//!   is traversed by falling rather than walking, always trusted because the
//!   mesh itself encodes it
//!
//! Edge pricing reconciles a memoised, possibly stale vischeck verdict per
//! connection with real-time geometry. Verdicts expire after a TTL and a
//! periodic sweep evicts them, resetting the solver's memo whenever it does,
//! so no route is ever priced against geometry older than the TTL.
//!

pub mod cache;
pub mod follower;
pub mod graph;
pub mod mesh;
pub mod refine;
pub mod search;
pub mod trail;
pub mod usage;
pub mod utilities;
pub mod vischeck;
