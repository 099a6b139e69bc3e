//! Learning driver.
//!
//! Indexes the corpus, reuses a complete set of persisted checkpoints when
//! one exists for the same vocabulary, and otherwise trains from a zero
//! matrix, snapshotting the matrix whenever the running trial count reaches
//! a requested percentage.
//!
//! A partial cache is never resumed: if any requested checkpoint is missing
//! or was written for another vocabulary, all of them are recomputed from
//! the first trial and rewritten.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde_json::json;

use crate::checkpoint::CheckpointStore;
use crate::config::NdlConfig;
use crate::corpus::Corpus;
use crate::error::{NdlError, NdlResult};
use crate::index::Vocabulary;
use crate::learner::Learner;
use crate::logging;

/// Snapshots of one run keyed by percentage, with the shared id mappings.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningRun {
    pub matrices: BTreeMap<u8, Array2<f64>>,
    pub vocabulary: Vocabulary,
    /// True when every matrix came from the store and no training ran
    pub reused: bool,
}

impl LearningRun {
    pub fn matrix(&self, percentage: u8) -> Option<&Array2<f64>> {
        self.matrices.get(&percentage)
    }

    /// The snapshot taken furthest into the corpus.
    pub fn final_matrix(&self) -> Option<&Array2<f64>> {
        self.matrices.values().next_back()
    }

    pub fn percentages(&self) -> Vec<u8> {
        self.matrices.keys().copied().collect()
    }
}

/// Runs (or reloads) the learner over `corpus` as configured, indexing the
/// corpus itself.
pub fn run_learning(
    corpus: &Corpus,
    config: &NdlConfig,
    store: &CheckpointStore,
) -> NdlResult<LearningRun> {
    let vocabulary = Vocabulary::from_corpus(corpus);
    logging::info(
        "vocabulary_indexed",
        &json!({
            "trials": corpus.len(),
            "cues": vocabulary.cues.len(),
            "outcomes": vocabulary.outcomes.len(),
        }),
    );
    run_with_vocabulary(corpus, vocabulary, config, store)
}

/// Runs (or reloads) the learner over `corpus` with a fixed vocabulary,
/// such as one persisted by an earlier run.
///
/// Symbols outside `vocabulary` are rejected or skipped according to
/// `config.unknown_symbols`. Stored checkpoints are reused only when every
/// one of them was written with this exact vocabulary.
pub fn run_with_vocabulary(
    corpus: &Corpus,
    vocabulary: Vocabulary,
    config: &NdlConfig,
    store: &CheckpointStore,
) -> NdlResult<LearningRun> {
    let percentages = config.checkpoints.percentages();
    if store.contains_all(percentages) {
        match load_cached(store, percentages, &vocabulary) {
            Ok(Some(matrices)) => {
                logging::info(
                    "checkpoints_loaded",
                    &json!({
                        "dir": store.dir().display().to_string(),
                        "percentages": percentages,
                    }),
                );
                return Ok(LearningRun {
                    matrices,
                    vocabulary,
                    reused: true,
                });
            }
            Ok(None) => logging::info(
                "checkpoint_cache_miss",
                &json!({
                    "reason": "vocabulary_mismatch",
                    "dir": store.dir().display().to_string(),
                }),
            ),
            Err(NdlError::MissingCheckpoint { percentage, path }) => logging::info(
                "checkpoint_cache_miss",
                &json!({
                    "reason": "missing",
                    "missing": [percentage],
                    "path": path.display().to_string(),
                }),
            ),
            Err(err) => return Err(err),
        }
    } else {
        let missing: Vec<u8> = percentages
            .iter()
            .copied()
            .filter(|&percentage| !store.contains(percentage))
            .collect();
        logging::info(
            "checkpoint_cache_miss",
            &json!({ "reason": "missing", "missing": missing }),
        );
    }

    train(corpus, vocabulary, config, store)
}

/// Loads every requested matrix, or `None` if any group was written with a
/// different vocabulary.
fn load_cached(
    store: &CheckpointStore,
    percentages: &[u8],
    vocabulary: &Vocabulary,
) -> NdlResult<Option<BTreeMap<u8, Array2<f64>>>> {
    let mut matrices = BTreeMap::new();
    for (percentage, checkpoint) in store.load_all(percentages)? {
        if checkpoint.vocabulary != *vocabulary {
            return Ok(None);
        }
        matrices.insert(percentage, checkpoint.weights);
    }
    Ok(Some(matrices))
}

fn train(
    corpus: &Corpus,
    vocabulary: Vocabulary,
    config: &NdlConfig,
    store: &CheckpointStore,
) -> NdlResult<LearningRun> {
    let (cues, outcomes) = vocabulary.shape();
    let mut learner = Learner::new(cues, outcomes, config.learning);
    let total = corpus.len();

    logging::info(
        "training_started",
        &json!({
            "trials": total,
            "cues": cues,
            "outcomes": outcomes,
            "params": config.learning,
            "percentages": config.checkpoints.percentages(),
        }),
    );

    let mut emitter = Emitter {
        store,
        vocabulary: &vocabulary,
        pending: config.checkpoints.boundaries(total),
        next: 0,
        matrices: BTreeMap::new(),
        total,
        clamped_trials: 0,
    };

    emitter.emit_due(&learner)?;
    for trial in corpus {
        let encoded = vocabulary.encode(trial, config.unknown_symbols)?;
        let report = learner.train(&encoded)?;
        if report.clamped > 0 {
            emitter.clamped_trials += 1;
        }
        emitter.emit_due(&learner)?;
    }

    let matrices = emitter.matrices;
    Ok(LearningRun {
        matrices,
        vocabulary,
        reused: false,
    })
}

/// Tracks which checkpoint boundaries are still ahead of the learner.
struct Emitter<'a> {
    store: &'a CheckpointStore,
    vocabulary: &'a Vocabulary,
    /// `(trial count, percentage)`, ascending
    pending: Vec<(usize, u8)>,
    next: usize,
    matrices: BTreeMap<u8, Array2<f64>>,
    total: usize,
    clamped_trials: usize,
}

impl Emitter<'_> {
    fn emit_due(&mut self, learner: &Learner) -> NdlResult<()> {
        while let Some(&(count, percentage)) = self.pending.get(self.next) {
            if count != learner.trials_seen() {
                break;
            }
            self.next += 1;

            let snapshot = learner.snapshot();
            self.store.save(percentage, &snapshot, self.vocabulary)?;
            logging::info(
                "training_progress",
                &json!({
                    "percentage": percentage,
                    "trials": count,
                    "total": self.total,
                    "clamped_trials": self.clamped_trials,
                }),
            );
            self.matrices.insert(percentage, snapshot);
        }
        Ok(())
    }
}

/// Configured entry point working from corpus files.
///
/// ```no_run
/// use ndl_core::{Ndl, NdlConfig};
///
/// let config = NdlConfig::load_from_file("ndl.toml").unwrap_or_default();
/// let run = Ndl::new(config).run_file("corpora/childes.json").unwrap();
/// for (percentage, matrix) in &run.matrices {
///     println!("{percentage}%: {:?}", matrix.dim());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Ndl {
    config: NdlConfig,
}

impl Ndl {
    pub fn new(config: NdlConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NdlConfig {
        &self.config
    }

    /// Store for a corpus file: `<root>/<corpus stem>` when a root is
    /// configured, otherwise the corpus path without its extension, then one
    /// directory per parameter set.
    pub fn store_for(&self, corpus_path: impl AsRef<Path>) -> CheckpointStore {
        let corpus_path = corpus_path.as_ref();
        let root: PathBuf = match &self.config.store_root {
            Some(root) => root.join(corpus_path.file_stem().unwrap_or(OsStr::new("corpus"))),
            None => corpus_path.with_extension(""),
        };
        CheckpointStore::for_run(root, &self.config.learning)
    }

    pub fn run(&self, corpus: &Corpus, store: &CheckpointStore) -> NdlResult<LearningRun> {
        run_learning(corpus, &self.config, store)
    }

    pub fn run_with_vocabulary(
        &self,
        corpus: &Corpus,
        vocabulary: Vocabulary,
        store: &CheckpointStore,
    ) -> NdlResult<LearningRun> {
        run_with_vocabulary(corpus, vocabulary, &self.config, store)
    }

    pub fn run_file(&self, corpus_path: impl AsRef<Path>) -> NdlResult<LearningRun> {
        let corpus = Corpus::load_json(&corpus_path)?;
        let store = self.store_for(&corpus_path);
        self.run(&corpus, &store)
    }
}
