//! The polymorphic threshold unit.
//!
//! Units come in two flavors: input units, whose activation is assigned from
//! outside, and logic units, whose activation is computed from weighted
//! incoming connections against the network's global threshold. Connections
//! are stored as indices into the immediately preceding layer, which keeps the
//! arena free of ownership cycles.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::prng::Prng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a unit within its layer.
pub type UnitIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Connection {
    /// Source unit in the immediately preceding layer.
    pub source: UnitIndex,
    /// Inert when false: the source cannot contribute to excitation.
    pub weight: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Unit {
    /// Externally driven; activation is only ever assigned.
    Input { activated: bool },

    /// Threshold-computed from exactly K incoming connections.
    Logic {
        activated: bool,
        incoming: Vec<Connection>,
        /// Rotating pointer into `incoming`; wraps modulo K.
        cursor: usize,
        /// Depth-decayed causal contribution accumulator.
        stake: u64,
    },
}

impl Unit {
    pub fn input() -> Self {
        Unit::Input { activated: false }
    }

    /// A logic unit with K zeroed connection slots; the network wires them.
    pub fn logic(incoming_count: usize) -> Self {
        Unit::Logic {
            activated: false,
            incoming: vec![
                Connection {
                    source: 0,
                    weight: false,
                };
                incoming_count
            ],
            cursor: 0,
            stake: 0,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Unit::Input { .. })
    }

    pub fn activated(&self) -> bool {
        match self {
            Unit::Input { activated } | Unit::Logic { activated, .. } => *activated,
        }
    }

    pub(crate) fn set_activated(&mut self, on: bool) {
        match self {
            Unit::Input { activated } | Unit::Logic { activated, .. } => *activated = on,
        }
    }

    /// Incoming connections; empty for an input unit.
    pub fn incoming(&self) -> &[Connection] {
        match self {
            Unit::Input { .. } => &[],
            Unit::Logic { incoming, .. } => incoming,
        }
    }

    pub fn stake(&self) -> u64 {
        match self {
            Unit::Input { .. } => 0,
            Unit::Logic { stake, .. } => *stake,
        }
    }

    pub(crate) fn add_stake(&mut self, amount: u64) {
        if let Unit::Logic { stake, .. } = self {
            *stake = stake.saturating_add(amount);
        }
    }

    pub(crate) fn clear_stake(&mut self) {
        if let Unit::Logic { stake, .. } = self {
            *stake = 0;
        }
    }

    pub fn cursor(&self) -> usize {
        match self {
            Unit::Input { .. } => 0,
            Unit::Logic { cursor, .. } => *cursor,
        }
    }

    /// Applies exactly one of three perturbations, chosen uniformly:
    /// retarget one connection, flip one weight, or move the cursor to a
    /// different slot. Input units never mutate.
    pub fn mutate(&mut self, previous_layer_len: usize, rng: &mut Prng) {
        let Unit::Logic {
            incoming, cursor, ..
        } = self
        else {
            return;
        };

        match rng.gen_range_usize(0, 3) {
            0 => {
                let slot = rng.gen_range_usize(0, incoming.len());
                incoming[slot].source = rng.gen_range_usize(0, previous_layer_len);
            }
            1 => {
                let slot = rng.gen_range_usize(0, incoming.len());
                incoming[slot].weight = !incoming[slot].weight;
            }
            _ => {
                // A different cursor value is guaranteed; with a single slot
                // there is nowhere else to point.
                if incoming.len() < 2 {
                    return;
                }
                let old = *cursor;
                loop {
                    let next = rng.gen_range_usize(0, incoming.len());
                    if next != old {
                        *cursor = next;
                        break;
                    }
                }
            }
        }
    }

    /// The cursor-selected incoming source, advancing the cursor modulo K.
    /// Input units have no successor.
    pub(crate) fn next_traversal_source(&mut self) -> Option<UnitIndex> {
        let Unit::Logic {
            incoming, cursor, ..
        } = self
        else {
            return None;
        };

        if *cursor >= incoming.len() {
            *cursor = 0;
        }
        let source = incoming[*cursor].source;
        *cursor = (*cursor + 1) % incoming.len();
        Some(source)
    }
}
