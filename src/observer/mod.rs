//! Read-only snapshot adapters for displays.
//!
//! Design intent:
//! - Observers cannot mutate or steer the simulation.
//! - Snapshotting is *on-demand* and can allocate; the hot loop stays
//!   unchanged.
//! - Incremental per-cell deltas are drained separately through
//!   [`crate::network::Network::drain_changes`], since draining mutates.

use crate::codec;
use crate::engine::CycleEngine;
use crate::grader::AutoGrader;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point-in-time view of a network mid-simulation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkSnapshot {
    pub width: usize,
    pub height: usize,
    /// Full activation matrix, input layer first.
    pub matrix: Vec<Vec<bool>>,
    pub activation_fraction: f64,
    pub threshold_multiplier: f64,
    pub current_step: usize,
    pub total_steps: usize,
}

/// Grader progress, on top of the network view.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraderSnapshot {
    pub network: NetworkSnapshot,
    pub current_streak: String,
    pub best_streak_ever: String,
    pub goal: char,
    /// Distance of the most recent cycle and the one before it.
    pub last_mismatch_distance: Option<u32>,
    pub previous_mismatch_distance: Option<u32>,
    pub cycles_until_growth: u64,
    pub generation: u32,
}

pub struct EngineAdapter<'a> {
    engine: &'a CycleEngine,
}

impl<'a> EngineAdapter<'a> {
    pub fn new(engine: &'a CycleEngine) -> Self {
        Self { engine }
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        let net = self.engine.network();
        NetworkSnapshot {
            width: net.width(),
            height: net.height(),
            matrix: net.matrix(),
            activation_fraction: net.activation_fraction(),
            threshold_multiplier: net.threshold_multiplier(),
            current_step: self.engine.current_step(),
            total_steps: self.engine.steps_per_cycle(),
        }
    }
}

pub struct GraderAdapter<'a> {
    grader: &'a AutoGrader,
}

impl<'a> GraderAdapter<'a> {
    pub fn new(grader: &'a AutoGrader) -> Self {
        Self { grader }
    }

    pub fn snapshot(&self) -> GraderSnapshot {
        GraderSnapshot {
            network: EngineAdapter::new(self.grader.engine()).snapshot(),
            current_streak: self.grader.current_streak().to_string(),
            best_streak_ever: self.grader.best_streak_ever().to_string(),
            goal: codec::printable(self.grader.goal_symbol()),
            last_mismatch_distance: self.grader.last_mismatch_distance(),
            previous_mismatch_distance: self.grader.previous_mismatch_distance(),
            cycles_until_growth: self.grader.cycles_until_growth(),
            generation: self.grader.generation(),
        }
    }
}
