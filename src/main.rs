use gridbrain::engine::CycleEngine;
use gridbrain::grader::{AutoGrader, GraderConfig};
use gridbrain::network::{Network, NetworkConfig};
use gridbrain::observer::GraderAdapter;
use gridbrain::prelude::codec;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h" || args[1] == "help") {
        print_help();
        return;
    }
    if args.len() >= 2 && args[1] == "drift-demo" {
        run_drift_demo();
        return;
    }
    if args.len() >= 2 && args[1] != "alphabet-demo" {
        eprintln!("Unknown command: {}", args[1]);
        print_help();
        std::process::exit(2);
    }

    let cycles: u64 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2_000);
    run_alphabet_demo(cycles);
}

fn print_help() {
    println!("gridbrain - boolean threshold units learning by biased mutation");
    println!();
    println!("USAGE:");
    println!("  gridbrain [alphabet-demo [cycles]]   grade toward A, B, C, ... (default)");
    println!("  gridbrain drift-demo                 watch threshold homeostasis settle");
    println!("  gridbrain --help");
}

/// Drive a small network toward emitting the alphabet and report progress.
fn run_alphabet_demo(cycles: u64) {
    let cfg = NetworkConfig::with_size(7, 4, 2);
    let network = match Network::new(cfg) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(2);
        }
    };

    let engine = CycleEngine::new(network);
    let mut grader = match AutoGrader::new(
        engine,
        GraderConfig {
            output_width: 7,
            growth_threshold: 100_000,
        },
    ) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(2);
        }
    };

    for cycle in 0..cycles {
        let outcome = grader.run_graded_cycle();
        if outcome.matched {
            println!(
                "cycle={cycle:6} matched '{}'  streak={:?} best={:?}",
                codec::printable(outcome.symbol),
                grader.current_streak(),
                grader.best_streak_ever(),
            );
        } else if cycle % 100 == 0 {
            println!(
                "cycle={cycle:6} got '{}' want '{}' distance={}  best={:?}",
                codec::printable(outcome.symbol),
                codec::printable(outcome.target),
                outcome.distance,
                grader.best_streak_ever(),
            );
        }
        if outcome.grew {
            let net = grader.engine().network();
            println!(
                "cycle={cycle:6} grew to {}x{}",
                net.width(),
                net.height()
            );
        }
    }

    let snap = GraderAdapter::new(&grader).snapshot();
    println!();
    println!(
        "done: goal='{}' best={:?} activation={:.3} threshold={:.5} until_growth={}",
        snap.goal,
        snap.best_streak_ever,
        snap.network.activation_fraction,
        snap.network.threshold_multiplier,
        snap.cycles_until_growth,
    );
}

/// Run raw (ungraded) cycles and watch the homeostatic controller work.
fn run_drift_demo() {
    let cfg = NetworkConfig::with_size(10, 10, 3);
    let network = match Network::new(cfg) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(2);
        }
    };
    let mut engine = CycleEngine::new(network);
    engine.set_steps_per_cycle(10_000);

    for cycle in 0..50 {
        let _ = engine.run_cycle(7);
        let net = engine.network();
        println!(
            "cycle={cycle:3} activation={:.3} threshold={:.5}",
            net.activation_fraction(),
            net.threshold_multiplier(),
        );
    }
}
