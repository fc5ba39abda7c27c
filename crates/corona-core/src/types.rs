//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an agent: its index in the world's agent table.
///
/// Identifiers are assigned once at world construction and never reused,
/// so they remain stable for the lifetime of the agent, including after death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl AgentId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 2D position in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Squared Euclidean distance to another position
    pub fn distance_squared(&self, other: &Position) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// Chebyshev (chessboard) distance to another position
    pub fn chebyshev_distance(&self, other: &Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Epidemiological state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Susceptible,
    InfectedAsymptomatic,
    InfectedSymptomatic,
    RecoveredImmune,
    Dead,
}

impl HealthState {
    pub const ALL: [HealthState; 5] = [
        HealthState::Susceptible,
        HealthState::InfectedAsymptomatic,
        HealthState::InfectedSymptomatic,
        HealthState::RecoveredImmune,
        HealthState::Dead,
    ];

    /// Stable index of the state, used for palettes and census slots
    pub fn index(&self) -> usize {
        match self {
            HealthState::Susceptible => 0,
            HealthState::InfectedAsymptomatic => 1,
            HealthState::InfectedSymptomatic => 2,
            HealthState::RecoveredImmune => 3,
            HealthState::Dead => 4,
        }
    }

    pub fn is_infected(&self) -> bool {
        matches!(
            self,
            HealthState::InfectedAsymptomatic | HealthState::InfectedSymptomatic
        )
    }

    pub fn is_alive(&self) -> bool {
        *self != HealthState::Dead
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthState::Susceptible => "susceptible",
            HealthState::InfectedAsymptomatic => "infected_asymptomatic",
            HealthState::InfectedSymptomatic => "infected_symptomatic",
            HealthState::RecoveredImmune => "recovered_immune",
            HealthState::Dead => "dead",
        };
        f.write_str(name)
    }
}
