//! Agent state and the per-step update rules.

use crate::grid::OccupancyGrid;
use corona_core::{AgentId, DiseaseConfig, Error, HealthState, Position, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// An individual in the simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub state: HealthState,
    /// Steps since the most recent infection; `None` while not tracking
    pub infection_time: Option<u32>,
    pub position: Position,
    /// Cell the agent steers toward during local moves
    pub target: Position,
    pub will_show_symptoms: bool,
    pub will_die: bool,
    pub is_contagious: bool,
}

/// How a local step ranks the candidate cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveMode {
    /// Prefer the cell with the most free space around it
    Distancing,
    /// Prefer the cell closest to the current target
    GoalSeeking,
}

impl Agent {
    pub fn new(
        id: AgentId,
        position: Position,
        state: HealthState,
        will_show_symptoms: bool,
        will_die: bool,
    ) -> Self {
        Self {
            id,
            state,
            infection_time: if state.is_infected() { Some(0) } else { None },
            position,
            target: position,
            will_show_symptoms,
            will_die,
            is_contagious: false,
        }
    }

    /// Create an agent whose symptom and lethality flags are drawn from `config`
    pub fn spawn<R: Rng + ?Sized>(
        id: AgentId,
        position: Position,
        infected: bool,
        config: &DiseaseConfig,
        rng: &mut R,
    ) -> Self {
        let will_show_symptoms = rng.gen_bool(config.symptom_probability);
        let will_die = rng.gen_bool(config.lethal_probability);
        let state = if infected {
            HealthState::InfectedAsymptomatic
        } else {
            HealthState::Susceptible
        };
        Self::new(id, position, state, will_show_symptoms, will_die)
    }

    pub fn is_alive(&self) -> bool {
        self.state.is_alive()
    }

    /// Run one activation of this agent.
    ///
    /// `agents` is read for the contagiousness of neighbours; the entry for
    /// this agent itself is never consulted. Only this agent's own cell and
    /// the cell it moves into are written on the grid.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        grid: &mut OccupancyGrid,
        agents: &[Agent],
        config: &DiseaseConfig,
        rng: &mut R,
    ) -> Result<()> {
        if !self.is_alive() {
            return Ok(());
        }

        if let Some(time) = self.infection_time.as_mut() {
            *time += 1;
        }

        self.select_target(grid, config, rng);
        self.progress_disease(config, rng);
        if !self.is_alive() {
            return Ok(());
        }

        self.update_contagiousness(config, rng);

        if self.state == HealthState::Susceptible {
            self.check_exposure(grid, agents, config, rng)?;
        }

        if self.state != HealthState::InfectedSymptomatic
            && rng.gen_bool(config.travel_probability)
        {
            if rng.gen_bool(config.air_travel_probability) {
                self.fly(grid, rng)?;
            } else {
                self.step_locally(grid, config, rng)?;
            }
        }

        Ok(())
    }

    fn select_target<R: Rng + ?Sized>(
        &mut self,
        grid: &OccupancyGrid,
        config: &DiseaseConfig,
        rng: &mut R,
    ) {
        if self.position != self.target && !rng.gen_bool(config.retarget_probability) {
            return;
        }

        let d = config.travel_distance;
        let x_from = (self.position.x - d).max(0);
        let x_to = (self.position.x + d + 1).min(grid.width);
        let y_from = (self.position.y - d).max(0);
        let y_to = (self.position.y + d + 1).min(grid.height);

        self.target = Position::new(rng.gen_range(x_from..x_to), rng.gen_range(y_from..y_to));
    }

    fn progress_disease<R: Rng + ?Sized>(&mut self, config: &DiseaseConfig, rng: &mut R) {
        let time = self.infection_time.unwrap_or(0);

        match self.state {
            HealthState::InfectedAsymptomatic => {
                if self.will_show_symptoms && time > config.symptom_onset.sample(rng) {
                    self.state = HealthState::InfectedSymptomatic;
                    trace!(agent = %self.id, time, "Agent developed symptoms");
                }
                if time > config.healing.sample(rng) {
                    self.state = HealthState::RecoveredImmune;
                    self.is_contagious = false;
                    trace!(agent = %self.id, time, "Agent recovered");
                }
            }
            HealthState::InfectedSymptomatic => {
                if self.will_die && rng.gen_bool(config.symptomatic_death_probability) {
                    self.die();
                } else if time > config.healing.sample(rng) {
                    self.is_contagious = false;
                    if self.will_die {
                        self.die();
                    } else {
                        self.state = HealthState::RecoveredImmune;
                        trace!(agent = %self.id, time, "Agent recovered");
                    }
                }
            }
            HealthState::RecoveredImmune => {
                if time > config.immunity_loss.sample(rng) {
                    self.state = HealthState::Susceptible;
                    trace!(agent = %self.id, time, "Agent lost immunity");
                }
            }
            HealthState::Susceptible | HealthState::Dead => {}
        }
    }

    fn die(&mut self) {
        self.state = HealthState::Dead;
        self.infection_time = None;
        self.is_contagious = false;
        trace!(agent = %self.id, position = %self.position, "Agent died");
    }

    fn update_contagiousness<R: Rng + ?Sized>(&mut self, config: &DiseaseConfig, rng: &mut R) {
        if self.is_contagious || !self.state.is_infected() {
            return;
        }
        let time = self.infection_time.unwrap_or(0);
        if time > config.contagious_onset.sample(rng) {
            self.is_contagious = true;
        }
    }

    /// Roll against every contagious neighbour in row-major order; the first
    /// success infects and ends the scan.
    fn check_exposure<R: Rng + ?Sized>(
        &mut self,
        grid: &OccupancyGrid,
        agents: &[Agent],
        config: &DiseaseConfig,
        rng: &mut R,
    ) -> Result<()> {
        for (pos, cell) in grid.neighborhood(self.position, config.contamination_radius) {
            if pos == self.position {
                continue;
            }
            let Some(other) = cell else {
                continue;
            };
            let neighbor = agents.get(other.index()).ok_or_else(|| {
                Error::InvalidState(format!(
                    "cell {} holds agent {} which is missing from the agent table",
                    pos, other
                ))
            })?;
            if neighbor.is_contagious && rng.gen_bool(config.infection_probability) {
                self.state = HealthState::InfectedAsymptomatic;
                self.infection_time = Some(0);
                trace!(agent = %self.id, source = %other, "Agent infected");
                break;
            }
        }
        Ok(())
    }

    fn fly<R: Rng + ?Sized>(&mut self, grid: &mut OccupancyGrid, rng: &mut R) -> Result<()> {
        if let Some(destination) = grid.random_empty_cell(rng) {
            self.relocate(grid, destination)?;
        }
        Ok(())
    }

    fn step_locally<R: Rng + ?Sized>(
        &mut self,
        grid: &mut OccupancyGrid,
        config: &DiseaseConfig,
        rng: &mut R,
    ) -> Result<()> {
        let mode = if rng.gen_bool(config.social_distance_probability) {
            MoveMode::Distancing
        } else {
            MoveMode::GoalSeeking
        };

        // Higher score wins in both modes
        let scored: Vec<(Position, i64)> = grid
            .neighborhood(self.position, 1)
            .filter(|(pos, cell)| cell.is_none() || *pos == self.position)
            .map(|(pos, _)| {
                let score = match mode {
                    MoveMode::Distancing => grid.empty_count(pos) as i64,
                    MoveMode::GoalSeeking => -pos.distance_squared(&self.target),
                };
                (pos, score)
            })
            .collect();

        let Some(best) = scored.iter().map(|(_, score)| *score).max() else {
            return Ok(());
        };
        let tied: Vec<Position> = scored
            .into_iter()
            .filter(|(_, score)| *score == best)
            .map(|(pos, _)| pos)
            .collect();

        if let Some(&choice) = tied.choose(rng) {
            if choice != self.position {
                self.relocate(grid, choice)?;
            }
        }
        Ok(())
    }

    fn relocate(&mut self, grid: &mut OccupancyGrid, to: Position) -> Result<()> {
        grid.move_agent(self.id, self.position, to)?;
        self.position = to;
        Ok(())
    }
}
