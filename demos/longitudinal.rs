//! Longitudinal run over a corpus file.
//!
//! Usage: `cargo run --example longitudinal -- <corpus.json> [config.toml]`
//!
//! Without a config file the run is longitudinal with 20 checkpoints and the
//! default parameters. For every checkpoint the column L1 norm (total
//! association strength per outcome) is summarised.

use std::env;
use std::process;

use ndarray::Axis;
use ndl_core::checkpoint::CheckpointPlan;
use ndl_core::matrix::{norm, Norm};
use ndl_core::{Ndl, NdlConfig};

fn main() {
    let mut args = env::args().skip(1);
    let Some(corpus_path) = args.next() else {
        eprintln!("usage: longitudinal <corpus.json> [config.toml]");
        process::exit(2);
    };

    let config = match args.next() {
        Some(path) => match NdlConfig::load_from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to read {path}: {err}");
                process::exit(2);
            }
        },
        None => NdlConfig {
            checkpoints: CheckpointPlan::longitudinal(20),
            ..NdlConfig::default()
        },
    };
    config.apply_logging();

    let ndl = Ndl::new(config);
    let run = match ndl.run_file(&corpus_path) {
        Ok(run) => run,
        Err(err) => {
            eprintln!("learning failed: {err}");
            process::exit(1);
        }
    };

    println!(
        "{} cues x {} outcomes ({})",
        run.vocabulary.cues.len(),
        run.vocabulary.outcomes.len(),
        if run.reused { "loaded from checkpoints" } else { "trained" }
    );

    let all_cues: Vec<usize> = (0..run.vocabulary.cues.len()).collect();
    for (percentage, matrix) in &run.matrices {
        let strengths = match norm(matrix, &all_cues, Axis(0), Norm::L1) {
            Ok(strengths) => strengths,
            Err(err) => {
                eprintln!("{percentage}%: {err}");
                continue;
            }
        };
        let mean = if strengths.is_empty() {
            0.0
        } else {
            strengths.sum() / strengths.len() as f64
        };
        let max = strengths.iter().cloned().fold(0.0, f64::max);
        println!("{percentage:>3}%  mean outcome L1 {mean:.6}  max {max:.6}");
    }
}
