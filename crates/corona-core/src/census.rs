//! Population counts per health state.

use crate::HealthState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of agents in each health state at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub susceptible: usize,
    pub infected_asymptomatic: usize,
    pub infected_symptomatic: usize,
    pub recovered_immune: usize,
    pub dead: usize,
}

impl Census {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = HealthState>,
    {
        let mut census = Self::new();
        for state in states {
            census.record(state);
        }
        census
    }

    pub fn record(&mut self, state: HealthState) {
        match state {
            HealthState::Susceptible => self.susceptible += 1,
            HealthState::InfectedAsymptomatic => self.infected_asymptomatic += 1,
            HealthState::InfectedSymptomatic => self.infected_symptomatic += 1,
            HealthState::RecoveredImmune => self.recovered_immune += 1,
            HealthState::Dead => self.dead += 1,
        }
    }

    pub fn count(&self, state: HealthState) -> usize {
        match state {
            HealthState::Susceptible => self.susceptible,
            HealthState::InfectedAsymptomatic => self.infected_asymptomatic,
            HealthState::InfectedSymptomatic => self.infected_symptomatic,
            HealthState::RecoveredImmune => self.recovered_immune,
            HealthState::Dead => self.dead,
        }
    }

    pub fn infected(&self) -> usize {
        self.infected_asymptomatic + self.infected_symptomatic
    }

    pub fn alive(&self) -> usize {
        self.total() - self.dead
    }

    pub fn total(&self) -> usize {
        HealthState::ALL.iter().map(|s| self.count(*s)).sum()
    }
}

impl fmt::Display for Census {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S={} I(a)={} I(s)={} R={} D={}",
            self.susceptible,
            self.infected_asymptomatic,
            self.infected_symptomatic,
            self.recovered_immune,
            self.dead
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_census_counts() {
        let census = Census::from_states([
            HealthState::Susceptible,
            HealthState::Susceptible,
            HealthState::InfectedAsymptomatic,
            HealthState::InfectedSymptomatic,
            HealthState::Dead,
        ]);

        assert_eq!(census.susceptible, 2);
        assert_eq!(census.infected(), 2);
        assert_eq!(census.dead, 1);
        assert_eq!(census.total(), 5);
        assert_eq!(census.alive(), 4);
        assert_eq!(census.count(HealthState::RecoveredImmune), 0);
    }

    #[test]
    fn test_census_display() {
        let census = Census::from_states([HealthState::RecoveredImmune]);
        assert_eq!(census.to_string(), "S=0 I(a)=0 I(s)=0 R=1 D=0");
    }
}
