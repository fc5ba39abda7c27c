//! Epidemic simulation engine.
//!
//! This module implements the occupancy grid, the per-agent disease and
//! movement rules, and the world that activates every agent once per step.

pub mod grid;
pub mod agent;
pub mod world;
pub mod snapshot;

pub use grid::OccupancyGrid;
pub use agent::Agent;
pub use world::World;
pub use snapshot::{AgentView, Snapshot};
