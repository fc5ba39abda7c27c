//! Read-only view of the world handed to renderers and exporters.

use crate::agent::Agent;
use corona_core::{AgentId, Census, HealthState, Position, Result};
use serde::{Deserialize, Serialize};

/// Renderable state of one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: AgentId,
    pub state: HealthState,
    pub x: i32,
    pub y: i32,
}

impl AgentView {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

impl From<&Agent> for AgentView {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            state: agent.state,
            x: agent.position.x,
            y: agent.position.y,
        }
    }
}

/// Every agent's state and position after a given step, in identifier order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub step: u64,
    pub width: i32,
    pub height: i32,
    pub agents: Vec<AgentView>,
}

impl Snapshot {
    pub fn new(step: u64, width: i32, height: i32, agents: &[Agent]) -> Self {
        Self {
            step,
            width,
            height,
            agents: agents.iter().map(AgentView::from).collect(),
        }
    }

    pub fn census(&self) -> Census {
        Census::from_states(self.agents.iter().map(|a| a.state))
    }

    /// Row-major `height x width` raster of the state occupying each cell
    pub fn state_grid(&self) -> Vec<Option<HealthState>> {
        let mut cells = vec![None; (self.width.max(0) * self.height.max(0)) as usize];
        for view in &self.agents {
            let index = (view.y * self.width + view.x) as usize;
            if let Some(cell) = cells.get_mut(index) {
                *cell = Some(view.state);
            }
        }
        cells
    }

    /// Single-line JSON encoding, suitable for newline-delimited output
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
