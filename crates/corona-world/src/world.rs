//! Simulation engine owning the grid and the agent table.

use crate::agent::Agent;
use crate::grid::OccupancyGrid;
use crate::snapshot::Snapshot;
use corona_core::{AgentId, Census, Error, Result, SimulationConfig, WorldConfig};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

pub struct World {
    grid: OccupancyGrid,
    agents: Vec<Agent>,
    config: SimulationConfig,
    rng: ChaCha8Rng,
    step: u64,
}

impl World {
    /// Build and populate a world, seeding the generator from `config.seed`
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }

    /// Build and populate a world using an externally seeded generator
    pub fn with_rng(config: SimulationConfig, mut rng: ChaCha8Rng) -> Result<Self> {
        config.validate()?;

        let mut grid = OccupancyGrid::new(config.world.width, config.world.height);
        let agents = populate(&mut grid, &config, &mut rng)?;

        info!(
            width = config.world.width,
            height = config.world.height,
            agents = agents.len(),
            initial_infections = config.world.initial_infections,
            "World populated"
        );

        Ok(Self {
            grid,
            agents,
            config,
            rng,
            step: 0,
        })
    }

    /// Build a world from explicitly constructed agents.
    ///
    /// Agent `i` must carry identifier `i`, and no two agents may share a cell.
    pub fn from_agents(config: SimulationConfig, agents: Vec<Agent>) -> Result<Self> {
        config.disease.validate()?;
        if config.world.width <= 0 || config.world.height <= 0 {
            return Err(Error::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                config.world.width, config.world.height
            )));
        }

        let mut grid = OccupancyGrid::new(config.world.width, config.world.height);
        for (i, agent) in agents.iter().enumerate() {
            if agent.id.index() != i {
                return Err(Error::InvalidState(format!(
                    "agent at index {} carries identifier {}",
                    i, agent.id
                )));
            }
            grid.place(agent.id, agent.position)?;
        }

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            grid,
            agents,
            config,
            rng,
            step: 0,
        })
    }

    /// Advance the whole world by one step.
    ///
    /// Agents are activated one at a time in a fresh random order; an agent
    /// activated later sees the effects of those activated before it.
    pub fn step(&mut self) -> Result<()> {
        let mut order: Vec<usize> = (0..self.agents.len()).collect();
        order.shuffle(&mut self.rng);

        for i in order {
            let mut agent = self.agents[i].clone();
            agent.update(&mut self.grid, &self.agents, &self.config.disease, &mut self.rng)?;
            self.agents[i] = agent;
        }

        self.step += 1;

        let interval = self.config.census_interval;
        if interval > 0 && self.step % interval == 0 {
            let census = self.census();
            debug!(
                step = self.step,
                susceptible = census.susceptible,
                infected_asymptomatic = census.infected_asymptomatic,
                infected_symptomatic = census.infected_symptomatic,
                recovered_immune = census.recovered_immune,
                dead = census.dead,
                "Population census"
            );
        }

        Ok(())
    }

    /// Run `steps` steps, handing each resulting snapshot to `observer`
    #[instrument(skip(self, observer))]
    pub fn run<F>(&mut self, steps: u64, mut observer: F) -> Result<Census>
    where
        F: FnMut(&Snapshot) -> Result<()>,
    {
        info!("Starting simulation for {} steps", steps);

        for _ in 0..steps {
            self.step()?;
            observer(&self.snapshot())?;
        }

        let census = self.census();
        info!(
            final_step = self.step,
            infected = census.infected(),
            recovered_immune = census.recovered_immune,
            dead = census.dead,
            alive = census.alive(),
            "Simulation complete: {}",
            census
        );
        Ok(census)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.step, self.grid.width, self.grid.height, &self.agents)
    }

    pub fn census(&self) -> Census {
        Census::from_states(self.agents.iter().map(|a| a.state))
    }

    /// Verify that grid cells and agent positions reference each other exactly
    pub fn check_consistency(&self) -> Result<()> {
        for agent in &self.agents {
            if self.grid.occupant(agent.position) != Some(agent.id) {
                return Err(Error::InvalidState(format!(
                    "agent {} believes it is at {} but the grid disagrees",
                    agent.id, agent.position
                )));
            }
        }

        for (pos, cell) in self.grid.iter() {
            if let Some(id) = cell {
                match self.agents.get(id.index()) {
                    Some(agent) if agent.position == pos => {}
                    _ => {
                        return Err(Error::InvalidState(format!(
                            "cell {} references agent {} which is elsewhere",
                            pos, id
                        )))
                    }
                }
            }
        }

        Ok(())
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Number of completed steps
    pub fn step_count(&self) -> u64 {
        self.step
    }
}

/// Place every agent: a few uniformly scattered seeds, then the rest
/// clustered around randomly chosen, already placed anchors.
fn populate(
    grid: &mut OccupancyGrid,
    config: &SimulationConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Agent>> {
    let WorldConfig {
        agents: requested,
        initial_infections,
        seed_agents,
        cluster_radius,
        max_placement_attempts,
        ..
    } = config.world;

    if requested > grid.cell_count() {
        warn!(
            requested,
            cells = grid.cell_count(),
            "More agents requested than the grid has cells"
        );
        return Err(Error::Capacity {
            placed: 0,
            requested,
        });
    }

    let infected: HashSet<usize> = index::sample(rng, requested, initial_infections)
        .into_iter()
        .collect();

    let mut agents = Vec::with_capacity(requested);

    let seeds = seed_agents.min(requested);
    for cell in index::sample(rng, grid.cell_count(), seeds).into_iter() {
        let id = AgentId(agents.len());
        let pos = grid.index_to_pos(cell);
        let agent = Agent::spawn(id, pos, infected.contains(&id.index()), &config.disease, rng);
        grid.place(id, pos)?;
        agents.push(agent);
    }

    for i in seeds..requested {
        let id = AgentId(i);
        let mut spot = None;

        for _ in 0..max_placement_attempts {
            let anchor = agents[rng.gen_range(0..agents.len())].position;
            let candidate = anchor.add(
                rng.gen_range(-cluster_radius..=cluster_radius),
                rng.gen_range(-cluster_radius..=cluster_radius),
            );
            if grid.is_empty(candidate) {
                spot = Some(candidate);
                break;
            }
        }

        let Some(pos) = spot else {
            warn!(
                placed = agents.len(),
                requested,
                attempts = max_placement_attempts,
                "Failed to find a free cell near the existing population"
            );
            return Err(Error::Capacity {
                placed: agents.len(),
                requested,
            });
        };

        let agent = Agent::spawn(id, pos, infected.contains(&i), &config.disease, rng);
        grid.place(id, pos)?;
        agents.push(agent);
    }

    debug!(placed = agents.len(), seeds, "Population seeded");
    Ok(agents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use corona_core::{DiseaseConfig, HealthState, Position, StepRange};

    fn small_config(agents: usize, infections: usize) -> SimulationConfig {
        SimulationConfig {
            seed: 42,
            world: WorldConfig {
                width: 20,
                height: 20,
                agents,
                initial_infections: infections,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn scenario_config(disease: DiseaseConfig) -> SimulationConfig {
        SimulationConfig {
            seed: 7,
            world: WorldConfig {
                width: 10,
                height: 10,
                agents: 0,
                initial_infections: 0,
                ..Default::default()
            },
            disease,
            ..Default::default()
        }
    }

    #[test]
    fn test_world_creation() {
        let world = World::new(small_config(150, 5)).unwrap();
        assert_eq!(world.agents().len(), 150);
        assert_eq!(world.grid().occupied_count(), 150);
        assert_eq!(world.census().infected_asymptomatic, 5);
        assert_eq!(world.census().susceptible, 145);
        assert_eq!(world.step_count(), 0);
        assert_eq!(world.config().world.agents, 150);
        world.check_consistency().unwrap();

        for (i, agent) in world.agents().iter().enumerate() {
            assert_eq!(agent.id, AgentId(i));
            match agent.state {
                HealthState::InfectedAsymptomatic => assert_eq!(agent.infection_time, Some(0)),
                HealthState::Susceptible => assert_eq!(agent.infection_time, None),
                other => panic!("unexpected initial state {:?}", other),
            }
        }
    }

    #[test]
    fn test_fewer_agents_than_seeds() {
        let world = World::new(small_config(5, 1)).unwrap();
        assert_eq!(world.agents().len(), 5);
        world.check_consistency().unwrap();
    }

    #[test]
    fn test_clustered_agents_stay_near_population() {
        let config = SimulationConfig {
            world: WorldConfig {
                width: 200,
                height: 200,
                agents: 300,
                initial_infections: 1,
                seed_agents: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let world = World::new(config).unwrap();

        // Every non-seed agent lies within the cluster radius of an earlier agent
        let agents = world.agents();
        for i in 1..agents.len() {
            let near = agents[..i]
                .iter()
                .any(|a| a.position.chebyshev_distance(&agents[i].position) <= 2);
            assert!(near, "agent {} is isolated", i);
        }
    }

    #[test]
    fn test_capacity_error_when_grid_too_small() {
        let config = SimulationConfig {
            world: WorldConfig {
                width: 4,
                height: 4,
                agents: 17,
                initial_infections: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            World::new(config),
            Err(Error::Capacity { placed: 0, requested: 17 })
        ));
    }

    #[test]
    fn test_capacity_error_when_retries_exhausted() {
        // A zero cluster radius only ever proposes occupied anchor cells
        let config = SimulationConfig {
            world: WorldConfig {
                width: 10,
                height: 10,
                agents: 20,
                initial_infections: 1,
                seed_agents: 1,
                cluster_radius: 0,
                max_placement_attempts: 10,
            },
            ..Default::default()
        };
        assert!(matches!(
            World::new(config),
            Err(Error::Capacity { placed: 1, requested: 20 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config(10, 1);
        config.disease.infection_probability = 3.0;
        assert!(matches!(World::new(config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_agents_rejects_collisions() {
        let agents = vec![
            Agent::new(AgentId(0), Position::new(1, 1), HealthState::Susceptible, false, false),
            Agent::new(AgentId(1), Position::new(1, 1), HealthState::Susceptible, false, false),
        ];
        assert!(matches!(
            World::from_agents(scenario_config(DiseaseConfig::default()), agents),
            Err(Error::CellOccupied { x: 1, y: 1 })
        ));

        let misnumbered = vec![Agent::new(
            AgentId(3),
            Position::new(0, 0),
            HealthState::Susceptible,
            false,
            false,
        )];
        let config = scenario_config(DiseaseConfig::default());
        assert!(World::from_agents(config, misnumbered).is_err());
    }

    #[test]
    fn test_adjacent_contagious_agent_infects_neighbor() {
        let disease = DiseaseConfig {
            infection_probability: 1.0,
            contamination_radius: 1,
            travel_probability: 0.0,
            ..Default::default()
        };
        let mut sick = Agent::new(
            AgentId(0),
            Position::new(4, 4),
            HealthState::InfectedAsymptomatic,
            false,
            false,
        );
        sick.is_contagious = true;
        sick.infection_time = Some(40);
        let healthy = Agent::new(
            AgentId(1),
            Position::new(5, 4),
            HealthState::Susceptible,
            false,
            false,
        );

        let mut world = World::from_agents(scenario_config(disease), vec![sick, healthy]).unwrap();
        world.step().unwrap();

        let neighbor = world.agent(AgentId(1)).unwrap();
        assert_eq!(neighbor.state, HealthState::InfectedAsymptomatic);
        assert_eq!(neighbor.infection_time, Some(0));
        world.check_consistency().unwrap();
    }

    #[test]
    fn test_single_agent_air_travel() {
        let disease = DiseaseConfig {
            travel_probability: 1.0,
            air_travel_probability: 1.0,
            ..Default::default()
        };
        let start = Position::new(2, 7);
        let agent = Agent::new(AgentId(0), start, HealthState::Susceptible, false, false);
        let mut world = World::from_agents(scenario_config(disease), vec![agent]).unwrap();

        world.step().unwrap();

        let moved = world.agent(AgentId(0)).unwrap();
        assert_ne!(moved.position, start);
        assert!(world.grid().is_empty(start));
        assert_eq!(world.grid().occupant(moved.position), Some(AgentId(0)));
    }

    #[test]
    fn test_dead_agent_unchanged_by_steps() {
        let disease = DiseaseConfig {
            travel_probability: 1.0,
            ..Default::default()
        };
        let corpse = Agent::new(AgentId(0), Position::new(5, 5), HealthState::Dead, true, true);
        let walker = Agent::new(
            AgentId(1),
            Position::new(0, 0),
            HealthState::Susceptible,
            false,
            false,
        );
        let agents = vec![corpse.clone(), walker];
        let mut world = World::from_agents(scenario_config(disease), agents).unwrap();

        for _ in 0..100 {
            world.step().unwrap();
            assert_eq!(world.agent(AgentId(0)), Some(&corpse));
            assert_eq!(world.grid().occupant(corpse.position), Some(AgentId(0)));
        }
    }

    #[test]
    fn test_no_infection_with_zero_probability() {
        let mut config = small_config(200, 20);
        config.disease.infection_probability = 0.0;
        config.disease.contagious_onset = StepRange::new(0, 0);
        let mut world = World::new(config).unwrap();

        for _ in 0..100 {
            world.step().unwrap();
        }

        // Nobody beyond the initial cases was ever infected
        let ever_infected = world
            .agents()
            .iter()
            .filter(|a| a.infection_time.is_some() || a.state == HealthState::Dead)
            .count();
        assert!(ever_infected <= 20);
    }

    #[test]
    fn test_no_movement_without_travel() {
        let mut config = small_config(120, 3);
        config.disease.travel_probability = 0.0;
        let mut world = World::new(config).unwrap();
        let start: Vec<Position> = world.agents().iter().map(|a| a.position).collect();

        for _ in 0..50 {
            world.step().unwrap();
        }

        let end: Vec<Position> = world.agents().iter().map(|a| a.position).collect();
        assert_eq!(start, end);
    }

    #[test]
    fn test_same_seed_same_history() {
        let mut a = World::new(small_config(100, 4)).unwrap();
        let mut b = World::new(small_config(100, 4)).unwrap();
        for _ in 0..30 {
            a.step().unwrap();
            b.step().unwrap();
        }
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_run_reports_each_step() {
        let mut world = World::new(small_config(60, 2)).unwrap();
        let mut seen = Vec::new();
        let census = world
            .run(5, |snapshot| {
                seen.push(snapshot.step);
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(census.total(), 60);
        assert_eq!(world.step_count(), 5);
    }

    #[test]
    fn test_run_stops_on_observer_error() {
        let mut world = World::new(small_config(30, 1)).unwrap();
        let result = world.run(10, |snapshot| {
            if snapshot.step == 3 {
                Err(Error::InvalidState("stop".to_string()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert_eq!(world.step_count(), 3);
    }
}
