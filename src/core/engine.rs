//! The stochastic cycle sweep.
//!
//! One cycle is a long settling-style walk over the network rather than a
//! single pass per unit: the traversal follows each visited logic unit's
//! cursor-selected incoming connection downward and wraps back to the start
//! of the output layer whenever it reaches an input unit. Visited units drift
//! with a small background mutation probability even without reinforcement.
//!
//! A cycle runs to completion synchronously. Callers needing interactivity
//! run cycles behind the exclusion boundary in [`crate::driver`].

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::network::Network;

/// Chance of a background mutation per visited unit: 1 in this many.
pub const BACKGROUND_MUTATION_DENOMINATOR: u64 = 10_000;

#[derive(Debug)]
pub struct CycleEngine {
    network: Network,

    /// Traversal position, kept across cycles; `None` before the first sweep.
    position: Option<(usize, usize)>,

    steps_per_cycle: usize,
    current_step: usize,
    background_mutation_denominator: u64,
}

impl CycleEngine {
    /// Wraps a network with the default settling budget of `total_units³`
    /// steps per cycle.
    pub fn new(network: Network) -> Self {
        let budget = default_budget(network.total_units());
        Self {
            network,
            position: None,
            steps_per_cycle: budget,
            current_step: 0,
            background_mutation_denominator: BACKGROUND_MUTATION_DENOMINATOR,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn steps_per_cycle(&self) -> usize {
        self.steps_per_cycle
    }

    /// Tunable sweep length, floored at the unit count.
    pub fn set_steps_per_cycle(&mut self, steps: usize) {
        self.steps_per_cycle = steps.max(self.network.total_units());
    }

    /// Shaves one step off the budget, floored at the unit count. The grader
    /// calls this on every correct match: as the network gets it right,
    /// demand less settling randomness.
    pub fn shrink_budget(&mut self) {
        self.steps_per_cycle = self
            .steps_per_cycle
            .saturating_sub(1)
            .max(self.network.total_units());
    }

    /// Step counter within the sweep currently (or last) run.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub(crate) fn set_background_mutation_denominator(&mut self, denominator: u64) {
        self.background_mutation_denominator = denominator;
    }

    /// Runs one full sweep and reads `output_width` bits off the start of the
    /// last layer, most-significant first.
    ///
    /// `output_width` must not exceed the network width; the grader enforces
    /// this at its boundary, so a violation here is a programming error.
    pub fn run_cycle(&mut self, output_width: usize) -> Vec<bool> {
        assert!(
            output_width <= self.network.width(),
            "output width exceeds network width"
        );

        let top = self.network.height() - 1;
        for step in 0..self.steps_per_cycle {
            self.current_step = step;
            let (layer, idx) = self.position.unwrap_or((top, 0));

            // Background drift, then recompute the unit we are standing on.
            if self.network.one_in(self.background_mutation_denominator) {
                self.network.mutate_unit(layer, idx);
            }
            self.network.compute_activation(layer, idx, false);

            self.position = match self.network.next_traversal_source_at(layer, idx) {
                Some(source) => Some((layer - 1, source)),
                // Input units have no successor; wrap to the output layer.
                None => Some((top, 0)),
            };
        }

        // Settle the readout row: each output unit is evaluated eagerly, in
        // index order, against whatever the sweep left in the layers below.
        for idx in 0..output_width {
            self.network.compute_activation(top, idx, false);
        }

        // Keep stake current for the stimulate call that follows scoring.
        for idx in 0..output_width {
            self.network.accumulate_stake(top, idx);
        }

        (0..output_width)
            .map(|idx| self.network.unit(top, idx).activated())
            .collect()
    }
}

fn default_budget(total_units: usize) -> usize {
    total_units.saturating_mul(total_units).saturating_mul(total_units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkConfig;

    fn engine(seed: u64) -> CycleEngine {
        let net = Network::new(NetworkConfig::with_size(5, 3, 2).with_seed(seed)).unwrap();
        CycleEngine::new(net)
    }

    #[test]
    fn default_budget_is_cubic() {
        let e = engine(1);
        assert_eq!(e.steps_per_cycle(), 15 * 15 * 15);
    }

    #[test]
    fn budget_is_floored_at_unit_count() {
        let mut e = engine(2);
        e.set_steps_per_cycle(1);
        assert_eq!(e.steps_per_cycle(), 15);
        e.shrink_budget();
        assert_eq!(e.steps_per_cycle(), 15);
    }

    #[test]
    fn cycle_reads_requested_width_and_preserves_inputs() {
        let mut e = engine(3);
        e.set_steps_per_cycle(100);
        e.network_mut().set_inputs(&[true, false, true, false, true]);

        let bits = e.run_cycle(4);
        assert_eq!(bits.len(), 4);

        // Inputs are assigned, never computed: the sweep must not touch them.
        assert!(e.network().unit(0, 0).activated());
        assert!(!e.network().unit(0, 1).activated());
        assert!(e.network().unit(0, 2).activated());
    }

    #[test]
    fn every_activation_is_defined_after_a_cycle() {
        let mut e = engine(4);
        e.set_steps_per_cycle(200);
        let _ = e.run_cycle(5);
        for row in e.network().matrix() {
            assert_eq!(row.len(), 5);
        }
    }

    #[test]
    fn sweep_leaves_output_units_with_fresh_stake() {
        let mut e = engine(5);
        e.set_steps_per_cycle(50);
        let _ = e.run_cycle(5);
        let top = e.network().height() - 1;
        for idx in 0..5 {
            assert!(e.network().unit(top, idx).stake() > 0);
        }
    }

    #[test]
    #[should_panic(expected = "output width exceeds network width")]
    fn overwide_readout_is_a_contract_violation() {
        let mut e = engine(6);
        e.set_steps_per_cycle(20);
        let _ = e.run_cycle(6);
    }
}
