//! Configuration types for the simulation.

use crate::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Paired step-count threshold.
///
/// Every check draws a fresh threshold from `[min, max)`; there is no
/// per-agent latency fixed at infection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRange {
    pub min: u32,
    pub max: u32,
}

impl StepRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Draw a threshold uniformly from `[min, max)`, or `min` for an empty range
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..self.max)
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.min > self.max {
            return Err(Error::InvalidConfig(format!(
                "{} range is inverted: min {} > max {}",
                name, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Disease and behaviour parameters shared by every agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseConfig {
    /// Chance that one contagious neighbour infects a susceptible agent per step
    pub infection_probability: f64,
    /// Chance, drawn once per agent, that the agent dies if it becomes symptomatic
    pub lethal_probability: f64,
    /// Steps after infection before an agent becomes contagious
    pub contagious_onset: StepRange,
    /// Steps after infection before symptoms appear
    pub symptom_onset: StepRange,
    /// Steps after infection before the agent heals (or dies)
    pub healing: StepRange,
    /// Steps after infection before immunity is lost again
    pub immunity_loss: StepRange,
    /// Chebyshev radius scanned for contagious neighbours
    pub contamination_radius: i32,
    /// Chance, drawn once per agent, that an infection becomes symptomatic
    pub symptom_probability: f64,
    /// Radius within which new movement targets are picked
    pub travel_distance: i32,
    /// Chance of moving at all during a step
    pub travel_probability: f64,
    /// Chance that a move is an air trip to any empty cell
    pub air_travel_probability: f64,
    /// Chance that a local move maximises free space instead of seeking the target
    pub social_distance_probability: f64,
    /// Per-step chance that a doomed symptomatic agent dies before healing
    pub symptomatic_death_probability: f64,
    /// Per-step chance of picking a new movement target before reaching the old one
    pub retarget_probability: f64,
}

impl Default for DiseaseConfig {
    fn default() -> Self {
        Self {
            infection_probability: 0.02,
            lethal_probability: 0.02,
            contagious_onset: StepRange::new(10, 30),
            symptom_onset: StepRange::new(50, 80),
            healing: StepRange::new(200, 300),
            immunity_loss: StepRange::new(500, 700),
            contamination_radius: 1,
            symptom_probability: 0.5,
            travel_distance: 1,
            travel_probability: 0.2,
            air_travel_probability: 0.0,
            social_distance_probability: 0.0,
            symptomatic_death_probability: 0.1,
            retarget_probability: 0.2,
        }
    }
}

impl DiseaseConfig {
    pub fn validate(&self) -> Result<()> {
        let probabilities = [
            ("infection_probability", self.infection_probability),
            ("lethal_probability", self.lethal_probability),
            ("symptom_probability", self.symptom_probability),
            ("travel_probability", self.travel_probability),
            ("air_travel_probability", self.air_travel_probability),
            ("social_distance_probability", self.social_distance_probability),
            ("symptomatic_death_probability", self.symptomatic_death_probability),
            ("retarget_probability", self.retarget_probability),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        self.contagious_onset.validate("contagious_onset")?;
        self.symptom_onset.validate("symptom_onset")?;
        self.healing.validate("healing")?;
        self.immunity_loss.validate("immunity_loss")?;

        if self.contamination_radius < 0 {
            return Err(Error::InvalidConfig(format!(
                "contamination_radius must not be negative, got {}",
                self.contamination_radius
            )));
        }
        if self.travel_distance < 0 {
            return Err(Error::InvalidConfig(format!(
                "travel_distance must not be negative, got {}",
                self.travel_distance
            )));
        }

        Ok(())
    }
}

/// World dimensions and population seeding parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the world grid
    pub width: i32,
    /// Height of the world grid
    pub height: i32,
    /// Number of agents created at initialization
    pub agents: usize,
    /// Number of agents that start infected
    pub initial_infections: usize,
    /// Agents scattered uniformly before clustered placement begins
    pub seed_agents: usize,
    /// Offset radius around an anchor agent for clustered placement
    pub cluster_radius: i32,
    /// Placement attempts per agent before giving up with a capacity error
    pub max_placement_attempts: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            agents: 1000,
            initial_infections: 10,
            seed_agents: 16,
            cluster_radius: 2,
            max_placement_attempts: 100_000,
        }
    }
}

impl WorldConfig {
    pub fn cell_count(&self) -> usize {
        self.width.max(0) as usize * self.height.max(0) as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(Error::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.initial_infections > self.agents {
            return Err(Error::InvalidConfig(format!(
                "initial_infections ({}) exceeds agent count ({})",
                self.initial_infections, self.agents
            )));
        }
        if self.seed_agents == 0 {
            return Err(Error::InvalidConfig(
                "seed_agents must be at least 1".to_string(),
            ));
        }
        if self.cluster_radius < 0 {
            return Err(Error::InvalidConfig(format!(
                "cluster_radius must not be negative, got {}",
                self.cluster_radius
            )));
        }
        if self.max_placement_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_placement_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete configuration for one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of steps the driving loop advances
    pub num_steps: u64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Steps between population census log lines
    pub census_interval: u64,
    /// World configuration
    pub world: WorldConfig,
    /// Disease configuration
    pub disease: DiseaseConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_steps: 3000,
            seed: 0,
            census_interval: 100,
            world: WorldConfig::default(),
            disease: DiseaseConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// The small reference run: 700 agents on a 32x32 grid with one initial case
    pub fn reference() -> Self {
        Self {
            world: WorldConfig {
                width: 32,
                height: 32,
                agents: 700,
                initial_infections: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.world.validate()?;
        self.disease.validate()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_default_configs() {
        let disease = DiseaseConfig::default();
        assert_eq!(disease.healing, StepRange::new(200, 300));
        assert!(disease.validate().is_ok());

        let world = WorldConfig::default();
        assert_eq!(world.width, 1024);
        assert_eq!(world.agents, 1000);
        assert!(world.validate().is_ok());

        let reference = SimulationConfig::reference();
        assert_eq!(reference.world.width, 32);
        assert_eq!(reference.world.agents, 700);
        assert_eq!(reference.world.initial_infections, 1);
        assert_eq!(reference.num_steps, 3000);
    }

    #[test]
    fn test_step_range_sampling() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let range = StepRange::new(10, 30);
        for _ in 0..1000 {
            let value = range.sample(&mut rng);
            assert!((10..30).contains(&value));
        }

        let degenerate = StepRange::new(5, 5);
        assert_eq!(degenerate.sample(&mut rng), 5);
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let config = DiseaseConfig {
            infection_probability: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = DiseaseConfig {
            air_travel_probability: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let config = DiseaseConfig {
            healing: StepRange::new(300, 200),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_world() {
        let config = WorldConfig {
            width: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = WorldConfig {
            agents: 5,
            initial_infections: 6,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "seed": 9, "world": { "width": 16, "height": 16, "agents": 50 } }"#;
        let config = SimulationConfig::from_json(json).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.world.width, 16);
        assert_eq!(config.world.initial_infections, 10);
        assert_eq!(config.disease, DiseaseConfig::default());
    }

    #[test]
    fn test_json_validation_failure() {
        let json = r#"{ "disease": { "travel_probability": 2.0 } }"#;
        assert!(SimulationConfig::from_json(json).is_err());
    }
}
