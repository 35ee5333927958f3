//! Target matching, stagnation tracking, and adaptive growth.
//!
//! The grader wraps a [`CycleEngine`] with an objective: emit the alphabet.
//! Each cycle it writes the current goal symbol's bits into the input layer,
//! runs a sweep, and scores the output. Matches extend the streak and advance
//! the goal; misses are scored by Hamming distance, rewarding only strict
//! improvement. When the streak high-water mark goes unmet for long enough,
//! the network is discarded and rebuilt one size larger.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::codec::{self, Symbol};
use crate::engine::CycleEngine;
use crate::network::{ConfigError, Network};

/// First symbol of the goal cycle.
const SYMBOL_BASE: Symbol = b'A' as Symbol;
/// Goal symbols wrap after 'Z'.
const SYMBOL_SPAN: Symbol = 26;

#[derive(Debug, Clone, Copy)]
pub struct GraderConfig {
    /// Bits read from the output layer; also the symbol bit width.
    pub output_width: usize,
    /// Consecutive unimproved cycles before the network is grown.
    pub growth_threshold: u64,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            output_width: 7,
            growth_threshold: 100_000,
        }
    }
}

/// What one graded cycle did.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub bits: Vec<bool>,
    pub symbol: Symbol,
    pub target: Symbol,
    pub matched: bool,
    /// Hamming distance to the target; zero on a match.
    pub distance: u32,
    /// Whether this cycle ended in a growth transition.
    pub grew: bool,
}

#[derive(Debug)]
pub struct AutoGrader {
    engine: CycleEngine,
    cfg: GraderConfig,

    /// Which symbol in the A–Z cycle is the current goal.
    target_index: Symbol,
    current_streak: String,
    /// High-water mark, carried forward across growth events.
    best_streak_ever: String,
    /// Distance of the most recent cycle; zero on a match, `None` before the
    /// first cycle.
    last_mismatch_distance: Option<u32>,
    /// The cycle before that, for displays showing the trend.
    previous_mismatch_distance: Option<u32>,
    /// Cycles since the streak last met its high-water mark.
    stagnation_counter: u64,
    /// How many growth transitions have happened.
    generation: u32,
}

impl AutoGrader {
    pub fn new(engine: CycleEngine, cfg: GraderConfig) -> Result<Self, ConfigError> {
        if !(codec::MIN_WIDTH..=codec::MAX_WIDTH).contains(&cfg.output_width) {
            return Err(ConfigError::OutputWidthOutOfRange {
                output: cfg.output_width,
            });
        }
        if cfg.output_width > engine.network().width() {
            return Err(ConfigError::OutputWiderThanNetwork {
                output: cfg.output_width,
                width: engine.network().width(),
            });
        }
        Ok(Self {
            engine,
            cfg,
            target_index: 0,
            current_streak: String::new(),
            best_streak_ever: String::new(),
            last_mismatch_distance: None,
            previous_mismatch_distance: None,
            stagnation_counter: 0,
            generation: 0,
        })
    }

    pub fn engine(&self) -> &CycleEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CycleEngine {
        &mut self.engine
    }

    pub fn config(&self) -> &GraderConfig {
        &self.cfg
    }

    pub fn goal_symbol(&self) -> Symbol {
        SYMBOL_BASE + self.target_index
    }

    pub fn current_streak(&self) -> &str {
        &self.current_streak
    }

    pub fn best_streak_ever(&self) -> &str {
        &self.best_streak_ever
    }

    pub fn last_mismatch_distance(&self) -> Option<u32> {
        self.last_mismatch_distance
    }

    pub fn previous_mismatch_distance(&self) -> Option<u32> {
        self.previous_mismatch_distance
    }

    pub fn stagnation_counter(&self) -> u64 {
        self.stagnation_counter
    }

    pub fn cycles_until_growth(&self) -> u64 {
        self.cfg.growth_threshold.saturating_sub(self.stagnation_counter)
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// One graded cycle: inject the goal bits, sweep, score, reinforce, and
    /// possibly grow.
    pub fn run_graded_cycle(&mut self) -> CycleOutcome {
        let target = self.goal_symbol();
        let width = self.cfg.output_width;
        let target_bits = codec::symbol_to_bits(target, width)
            .expect("output width validated at construction");

        self.engine.network_mut().set_inputs(&target_bits);
        let bits = self.engine.run_cycle(width);
        let symbol = codec::bits_to_symbol(&bits)
            .expect("output width validated at construction");

        if symbol == target {
            self.handle_match(symbol);
            return CycleOutcome {
                bits,
                symbol,
                target,
                matched: true,
                distance: 0,
                grew: false,
            };
        }

        let distance = codec::hamming_distance(symbol, target);
        let grew = self.handle_miss(&bits, &target_bits, distance);
        CycleOutcome {
            bits,
            symbol,
            target,
            matched: false,
            distance,
            grew,
        }
    }

    fn handle_match(&mut self, symbol: Symbol) {
        self.engine.network_mut().stimulate(true);

        self.current_streak.push(codec::printable(symbol));
        if self.current_streak.len() >= self.best_streak_ever.len() {
            self.stagnation_counter = 0;
        }
        if self.current_streak.len() > self.best_streak_ever.len() {
            self.best_streak_ever = self.current_streak.clone();
        }

        self.target_index = (self.target_index + 1) % SYMBOL_SPAN;
        self.previous_mismatch_distance = self.last_mismatch_distance;
        self.last_mismatch_distance = Some(0);

        // Getting easier: demand less settling randomness.
        self.engine.shrink_budget();
    }

    fn handle_miss(&mut self, bits: &[bool], target_bits: &[bool], distance: u32) -> bool {
        // Reward strict improvement; equal-or-worse distance punishes.
        let improved = match self.last_mismatch_distance {
            Some(previous) => distance < previous,
            None => true,
        };
        self.engine.network_mut().stimulate(improved);
        self.previous_mismatch_distance = self.last_mismatch_distance;
        self.last_mismatch_distance = Some(distance);

        // Depth-decayed punishment of the output units that got it wrong.
        let top = self.engine.network().height() - 1;
        let denominator = self.engine.network().config().punish_denominator;
        for (idx, (&got, &want)) in bits.iter().zip(target_bits).enumerate() {
            if got != want {
                self.engine.network_mut().punish_by_depth(top, idx, denominator);
            }
        }

        self.current_streak.clear();
        self.target_index = 0;
        self.stagnation_counter += 1;

        if self.stagnation_counter >= self.cfg.growth_threshold {
            self.grow();
            return true;
        }
        false
    }

    /// Discards the network and replaces it with a larger one: height first
    /// until the grid is square, then both dimensions together. Progress
    /// metadata survives; wiring does not.
    fn grow(&mut self) {
        let net = self.engine.network_mut();
        let (width, height) = (net.width(), net.height());
        let (new_width, new_height) = grown_dimensions(width, height);

        let mut cfg = *net.config();
        cfg.width = new_width;
        cfg.height = new_height;
        cfg.seed = Some(net.next_seed());

        let fresh = Network::new(cfg).expect("grown dimensions stay valid");
        self.engine = CycleEngine::new(fresh);

        // best_streak_ever and target_index carry forward; the rest resets.
        self.current_streak.clear();
        self.stagnation_counter = 0;
        self.last_mismatch_distance = None;
        self.previous_mismatch_distance = None;
        self.generation += 1;
    }
}

#[cfg(feature = "std")]
const TAG_NETWORK: [u8; 4] = *b"NETW";
#[cfg(feature = "std")]
const TAG_GRADER: [u8; 4] = *b"GRDR";

#[cfg(feature = "std")]
impl AutoGrader {
    /// Serializes a versioned, chunked grader image: the network's wiring
    /// plus the progress metadata. Unknown chunks are skipped on load.
    pub fn save_image_to<W: std::io::Write>(&self, w: &mut W) -> std::io::Result<()> {
        use crate::storage;

        w.write_all(storage::MAGIC)?;
        storage::write_u32_le(w, storage::VERSION_V1)?;

        let mut net_bytes = Vec::new();
        self.engine.network().write_image(&mut net_bytes)?;
        storage::write_chunk_lz4(w, TAG_NETWORK, &net_bytes)?;

        let mut grader_bytes = Vec::new();
        storage::write_u32_le(&mut grader_bytes, self.cfg.output_width as u32)?;
        storage::write_u64_le(&mut grader_bytes, self.cfg.growth_threshold)?;
        storage::write_u32_le(&mut grader_bytes, u32::from(self.target_index))?;
        storage::write_string(&mut grader_bytes, &self.current_streak)?;
        storage::write_string(&mut grader_bytes, &self.best_streak_ever)?;
        for distance in [self.last_mismatch_distance, self.previous_mismatch_distance] {
            storage::write_u64_le(
                &mut grader_bytes,
                match distance {
                    Some(d) => u64::from(d) + 1,
                    None => 0,
                },
            )?;
        }
        storage::write_u64_le(&mut grader_bytes, self.stagnation_counter)?;
        storage::write_u32_le(&mut grader_bytes, self.generation)?;
        storage::write_u64_le(&mut grader_bytes, self.engine.steps_per_cycle() as u64)?;
        storage::write_chunk_lz4(w, TAG_GRADER, &grader_bytes)?;

        Ok(())
    }

    pub fn load_image_from<R: std::io::Read>(r: &mut R) -> std::io::Result<Self> {
        use crate::storage;
        use std::io;

        let magic = storage::read_exact::<8, _>(r)?;
        if &magic != storage::MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "bad grader image magic",
            ));
        }
        let version = storage::read_u32_le(r)?;
        if version != storage::VERSION_V1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "unsupported grader image version",
            ));
        }

        let mut network: Option<Network> = None;
        let mut grader_bytes: Option<Vec<u8>> = None;
        loop {
            let (tag, len) = match storage::read_chunk_header(r) {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            };
            if tag == TAG_NETWORK {
                let bytes = storage::read_chunk_body_lz4(r, len)?;
                network = Some(Network::read_image(&mut io::Cursor::new(bytes))?);
            } else if tag == TAG_GRADER {
                grader_bytes = Some(storage::read_chunk_body_lz4(r, len)?);
            } else {
                storage::skip_chunk_body(r, len)?;
            }
        }

        let network = network
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing network chunk"))?;
        let bytes = grader_bytes
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing grader chunk"))?;
        let mut cursor = io::Cursor::new(bytes);

        let output_width = storage::read_u32_le(&mut cursor)? as usize;
        let growth_threshold = storage::read_u64_le(&mut cursor)?;
        let target_index = storage::read_u32_le(&mut cursor)? as Symbol;
        let current_streak = storage::read_string(&mut cursor)?;
        let best_streak_ever = storage::read_string(&mut cursor)?;
        let last_mismatch_distance = match storage::read_u64_le(&mut cursor)? {
            0 => None,
            d => Some((d - 1) as u32),
        };
        let previous_mismatch_distance = match storage::read_u64_le(&mut cursor)? {
            0 => None,
            d => Some((d - 1) as u32),
        };
        let stagnation_counter = storage::read_u64_le(&mut cursor)?;
        let generation = storage::read_u32_le(&mut cursor)?;
        let steps_per_cycle = storage::read_u64_le(&mut cursor)? as usize;

        let mut engine = CycleEngine::new(network);
        engine.set_steps_per_cycle(steps_per_cycle);

        let mut grader = Self::new(
            engine,
            GraderConfig {
                output_width,
                growth_threshold,
            },
        )
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        grader.target_index = target_index % SYMBOL_SPAN;
        grader.current_streak = current_streak;
        grader.best_streak_ever = best_streak_ever;
        grader.last_mismatch_distance = last_mismatch_distance;
        grader.previous_mismatch_distance = previous_mismatch_distance;
        grader.stagnation_counter = stagnation_counter;
        grader.generation = generation;
        Ok(grader)
    }
}

/// Next network size: grow height until the grid is square, then grow both.
fn grown_dimensions(width: usize, height: usize) -> (usize, usize) {
    if height < width {
        (width, height + 1)
    } else {
        (width + 1, height + 1)
    }
}
