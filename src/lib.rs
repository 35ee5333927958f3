//! # gridbrain
//!
//! A grid of binary threshold units wired into a pseudo-random graph, improved
//! by biased random mutation under a coarse reward/punish signal. There are no
//! gradients anywhere: learning is hill-climbing over a boolean circuit's
//! topology and weights.
//!
//! ## Quick Start
//!
//! ```
//! use gridbrain::prelude::*;
//!
//! // A 7-wide, 4-layer network with 2 incoming connections per logic unit.
//! let cfg = NetworkConfig::with_size(7, 4, 2).with_seed(42);
//! let network = Network::new(cfg).unwrap();
//!
//! // Wrap it in a grader that drives it toward emitting 'A', 'B', 'C', ...
//! let engine = CycleEngine::new(network);
//! let mut grader = AutoGrader::new(engine, GraderConfig::default()).unwrap();
//!
//! let outcome = grader.run_graded_cycle();
//! assert_eq!(outcome.bits.len(), 7);
//! ```
//!
//! ## Modules
//!
//! - [`unit`]: the polymorphic threshold unit and its mutation operators
//! - [`network`]: the layered arena, homeostasis, and reinforcement
//! - [`engine`]: the stochastic cycle sweep
//! - [`grader`]: target matching, stagnation tracking, and adaptive growth
//! - [`codec`]: symbol ↔ bit-vector conversion
//! - [`driver`]: background auto-cycling with cooperative cancellation
//! - [`observer`]: read-only snapshot adapters for displays
//!
//! ## no_std Support
//!
//! Disable default features for `no_std` environments:
//! ```toml
//! gridbrain = { version = "0.1", default-features = false }
//! ```

// no_std support
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[path = "core/codec.rs"]
pub mod codec;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/unit.rs"]
pub mod unit;

#[path = "core/network.rs"]
pub mod network;

#[path = "core/engine.rs"]
pub mod engine;

#[path = "core/grader.rs"]
pub mod grader;

#[cfg(feature = "std")]
#[path = "core/driver.rs"]
pub mod driver;

#[cfg(feature = "std")]
#[path = "core/storage.rs"]
pub mod storage;

#[cfg(feature = "std")]
pub mod observer;

/// Prelude module for convenient imports.
///
/// ```
/// use gridbrain::prelude::*;
/// ```
pub mod prelude {
    pub use crate::codec::{self, Symbol};
    pub use crate::engine::CycleEngine;
    pub use crate::grader::{AutoGrader, CycleOutcome, GraderConfig};
    pub use crate::network::{CellDelta, ConfigError, Network, NetworkConfig};
    pub use crate::unit::{Connection, Unit};

    #[cfg(feature = "std")]
    pub use crate::driver::CycleDriver;
}
