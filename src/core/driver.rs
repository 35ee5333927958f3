//! Background auto-cycling with cooperative cancellation.
//!
//! The engine has no internal concurrency: `run_cycle`, `stimulate`, and
//! growth must be serialized on a given network. This driver owns that
//! exclusion boundary: one mutex around the live grader, held for the
//! duration of each cycle. The stop flag is a separate object, so a stop
//! request never has to wait on the lock and takes effect at the next cycle
//! boundary rather than mid-sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crate::grader::AutoGrader;

pub struct CycleDriver {
    grader: Arc<Mutex<AutoGrader>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CycleDriver {
    /// Spawns a thread that runs graded cycles back to back until stopped.
    /// The lock is released between cycles so snapshots can get in.
    pub fn spawn(grader: AutoGrader) -> Self {
        let grader = Arc::new(Mutex::new(grader));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = std::thread::spawn({
            let grader = Arc::clone(&grader);
            let stop = Arc::clone(&stop);
            move || {
                while !stop.load(Ordering::Relaxed) {
                    let mut guard = lock_grader(&grader);
                    guard.run_graded_cycle();
                }
            }
        });

        Self {
            grader,
            stop,
            handle: Some(handle),
        }
    }

    /// Shared handle to the live grader. Locking it blocks the cycling
    /// thread at its next cycle boundary; cycles are never interleaved.
    pub fn grader(&self) -> Arc<Mutex<AutoGrader>> {
        Arc::clone(&self.grader)
    }

    /// Requests a stop; the cycling thread exits at the next cycle boundary.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Stops, joins, and hands the grader back, unless other handles from
    /// [`CycleDriver::grader`] are still alive.
    pub fn join(mut self) -> Option<AutoGrader> {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let grader = Arc::clone(&self.grader);
        drop(self);
        Arc::try_unwrap(grader)
            .ok()
            .map(|m| m.into_inner().unwrap_or_else(|p| p.into_inner()))
    }
}

impl Drop for CycleDriver {
    fn drop(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn lock_grader(grader: &Mutex<AutoGrader>) -> MutexGuard<'_, AutoGrader> {
    match grader.lock() {
        Ok(guard) => guard,
        // A panic mid-cycle leaves valid (if half-settled) state; keep going.
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CycleEngine;
    use crate::grader::GraderConfig;
    use crate::network::{Network, NetworkConfig};

    fn test_grader(seed: u64) -> AutoGrader {
        let net = Network::new(NetworkConfig::with_size(7, 2, 2).with_seed(seed)).unwrap();
        let mut engine = CycleEngine::new(net);
        engine.set_steps_per_cycle(14);
        AutoGrader::new(
            engine,
            GraderConfig {
                output_width: 7,
                growth_threshold: u64::MAX,
            },
        )
        .unwrap()
    }

    #[test]
    fn stop_takes_effect_at_a_cycle_boundary() {
        let driver = CycleDriver::spawn(test_grader(1));
        let shared = driver.grader();

        // Wait until at least one cycle has finished.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let cycled = {
                let guard = match shared.lock() {
                    Ok(g) => g,
                    Err(p) => p.into_inner(),
                };
                guard.stagnation_counter() > 0 || !guard.current_streak().is_empty()
            };
            if cycled {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "driver never cycled");
            std::thread::yield_now();
        }
        drop(shared);

        driver.request_stop();
        let grader = driver.join().expect("no outside handles held");
        let cycled = grader.stagnation_counter() > 0 || !grader.current_streak().is_empty();
        assert!(cycled);
    }

    #[test]
    fn snapshots_interleave_between_cycles() {
        let driver = CycleDriver::spawn(test_grader(2));
        let shared = driver.grader();
        for _ in 0..5 {
            let guard = match shared.lock() {
                Ok(g) => g,
                Err(p) => p.into_inner(),
            };
            // Holding the lock means no cycle is in flight right now.
            let _ = guard.cycles_until_growth();
            drop(guard);
            std::thread::yield_now();
        }
        drop(shared);
        assert!(driver.join().is_some());
    }
}
