//! # NDL Core
//!
//! A deterministic Rust engine for naive discriminative learning: an
//! associative network with no hidden layer whose cue → outcome weights are
//! updated trial by trial with the Rescorla-Wagner rule. Snapshots of the
//! weight matrix taken at chosen percentages of the corpus are persisted so
//! that repeated runs with identical parameters skip training.
//!
//! ## Quick Start
//!
//! ```rust
//! use ndl_core::{run_learning, CheckpointPlan, CheckpointStore, Corpus, LearningParams, NdlConfig};
//!
//! let corpus = Corpus::from_pairs(vec![
//!     (vec!["a", "b"], vec!["X"]),
//!     (vec!["b", "c"], vec!["Y"]),
//! ]);
//! let config = NdlConfig {
//!     learning: LearningParams::new(0.1, 0.1, 1.0),
//!     checkpoints: CheckpointPlan::new([50, 100]).unwrap(),
//!     ..NdlConfig::default()
//! };
//! let dir = std::env::temp_dir().join("ndl_core_quick_start");
//! let store = CheckpointStore::for_run(&dir, &config.learning);
//!
//! let run = run_learning(&corpus, &config, &store).unwrap();
//! let b = run.vocabulary.cues.id("b").unwrap();
//! let x = run.vocabulary.outcomes.id("X").unwrap();
//! assert!((run.matrix(100).unwrap()[[b, x]] - 0.0099).abs() < 1e-12);
//! # std::fs::remove_dir_all(&dir).ok();
//! ```
//!
//! ## Core Modules
//!
//! - [`config`] - Run configuration via TOML
//! - [`corpus`] - Ordered cue/outcome trials and the JSON corpus loader
//! - [`index`] - Closed cue and outcome vocabularies
//! - [`learner`] - The Rescorla-Wagner update
//! - [`checkpoint`] - Persisted, memoized snapshots
//! - [`driver`] - Orchestration of a full run
//! - [`matrix`] - Statistics for inspecting learned matrices
//! - [`logging`] - JSON line-delimited logging

pub mod checkpoint;
pub mod config;
pub mod corpus;
pub mod driver;
pub mod error;
pub mod index;
pub mod learner;
pub mod logging;
pub mod matrix;

pub use checkpoint::{Checkpoint, CheckpointPlan, CheckpointStore};
pub use config::{ConfigError, NdlConfig};
pub use corpus::{Corpus, Trial};
pub use driver::{run_learning, run_with_vocabulary, LearningRun, Ndl};
pub use error::{NdlError, NdlResult, SymbolKind};
pub use index::{EncodedTrial, SymbolIndex, UnknownSymbolPolicy, Vocabulary};
pub use learner::{Learner, LearningParams, TrialReport};
