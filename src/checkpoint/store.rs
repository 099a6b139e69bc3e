use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde_json::json;

use super::npy::{read_npy, write_npy, NpyError};
use crate::error::{NdlError, NdlResult};
use crate::index::{SymbolIndex, Vocabulary};
use crate::learner::LearningParams;
use crate::logging;

/// A loaded snapshot: the matrix and the id mappings it was saved with.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub percentage: u8,
    pub weights: Array2<f64>,
    pub vocabulary: Vocabulary,
}

/// Directory holding the checkpoints of one parameter combination.
///
/// # Example
///
/// ```no_run
/// use ndl_core::{CheckpointStore, LearningParams};
///
/// let store = CheckpointStore::for_run("corpora/childes", &LearningParams::default());
/// if store.contains_all(&[50, 100]) {
///     let checkpoint = store.load(100).unwrap();
///     println!("{} cues", checkpoint.vocabulary.cues.len());
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Store rooted exactly at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store for `params` below `root`, one subdirectory per parameter set.
    pub fn for_run(root: impl AsRef<Path>, params: &LearningParams) -> Self {
        Self::new(root.as_ref().join(params.key()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn matrix_path(&self, percentage: u8) -> PathBuf {
        self.dir.join(format!("associationMatrix_{percentage}.npy"))
    }

    pub fn cue_ids_path(&self, percentage: u8) -> PathBuf {
        self.dir.join(format!("cueIDs_{percentage}.json"))
    }

    pub fn outcome_ids_path(&self, percentage: u8) -> PathBuf {
        self.dir.join(format!("outcomeIDs_{percentage}.json"))
    }

    fn group_paths(&self, percentage: u8) -> [PathBuf; 3] {
        [
            self.cue_ids_path(percentage),
            self.outcome_ids_path(percentage),
            self.matrix_path(percentage),
        ]
    }

    /// Whether every file of the group for `percentage` is present.
    pub fn contains(&self, percentage: u8) -> bool {
        self.group_paths(percentage).iter().all(|path| path.is_file())
    }

    pub fn contains_all(&self, percentages: &[u8]) -> bool {
        percentages.iter().all(|&percentage| self.contains(percentage))
    }

    /// Persists one group. The id files are written before the matrix, and
    /// each file is renamed into place only once complete, so an existing
    /// matrix file implies a complete group.
    pub fn save(
        &self,
        percentage: u8,
        weights: &Array2<f64>,
        vocabulary: &Vocabulary,
    ) -> NdlResult<()> {
        check_percentage(percentage)?;
        if weights.dim() != vocabulary.shape() {
            return Err(NdlError::ShapeMismatch {
                expected: vocabulary.shape(),
                found: weights.dim(),
            });
        }

        fs::create_dir_all(&self.dir)?;
        write_atomic(&self.cue_ids_path(percentage), |writer| {
            serde_json::to_writer(writer, &vocabulary.cues).map_err(NdlError::from)
        })?;
        write_atomic(&self.outcome_ids_path(percentage), |writer| {
            serde_json::to_writer(writer, &vocabulary.outcomes).map_err(NdlError::from)
        })?;
        let matrix_path = self.matrix_path(percentage);
        write_atomic(&matrix_path, |writer| {
            write_npy(writer, weights).map_err(|err| npy_error(&matrix_path, err))
        })?;

        logging::info(
            "checkpoint_saved",
            &json!({
                "percentage": percentage,
                "path": matrix_path.display().to_string(),
                "cues": weights.nrows(),
                "outcomes": weights.ncols(),
            }),
        );
        Ok(())
    }

    /// Loads one group. A missing file is `MissingCheckpoint`; a file that
    /// does not decode, or a matrix whose shape disagrees with the mappings,
    /// is `CorruptCheckpoint`.
    pub fn load(&self, percentage: u8) -> NdlResult<Checkpoint> {
        check_percentage(percentage)?;
        for path in self.group_paths(percentage) {
            if !path.is_file() {
                return Err(NdlError::MissingCheckpoint { percentage, path });
            }
        }

        let cues = read_ids(&self.cue_ids_path(percentage))?;
        let outcomes = read_ids(&self.outcome_ids_path(percentage))?;
        let matrix_path = self.matrix_path(percentage);
        let weights = read_npy(BufReader::new(File::open(&matrix_path)?))
            .map_err(|err| npy_error(&matrix_path, err))?;

        let vocabulary = Vocabulary::new(cues, outcomes);
        if weights.dim() != vocabulary.shape() {
            return Err(NdlError::corrupt(
                matrix_path,
                format!(
                    "matrix is {:?} but the id mappings describe {:?}",
                    weights.dim(),
                    vocabulary.shape()
                ),
            ));
        }

        Ok(Checkpoint {
            percentage,
            weights,
            vocabulary,
        })
    }

    pub fn load_all(&self, percentages: &[u8]) -> NdlResult<BTreeMap<u8, Checkpoint>> {
        percentages
            .iter()
            .map(|&percentage| Ok((percentage, self.load(percentage)?)))
            .collect()
    }
}

fn check_percentage(percentage: u8) -> NdlResult<()> {
    if (1..=100).contains(&percentage) {
        Ok(())
    } else {
        Err(NdlError::InvalidPercentage(percentage as u32))
    }
}

fn read_ids(path: &Path) -> NdlResult<SymbolIndex> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|err| NdlError::corrupt(path, err.to_string()))
}

fn npy_error(path: &Path, err: NpyError) -> NdlError {
    match err {
        NpyError::Io(err) => NdlError::Io(err),
        NpyError::Format(reason) => NdlError::corrupt(path, reason),
    }
}

/// Writes `path` through a temporary sibling, syncs it, then renames.
fn write_atomic<F>(path: &Path, write: F) -> NdlResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> NdlResult<()>,
{
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut writer = BufWriter::new(File::create(&tmp_path)?);
    write(&mut writer)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|err| err.into_error())?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use ndarray::array;
    use tempfile::tempdir;

    fn vocabulary() -> Vocabulary {
        Vocabulary::from_corpus(&Corpus::from_pairs(vec![
            (vec!["a", "b"], vec!["X"]),
            (vec!["b", "c"], vec!["Y"]),
        ]))
    }

    fn weights() -> Array2<f64> {
        array![[0.01, 0.0], [0.0099, 0.01], [-0.0001, 0.01]]
    }

    #[test]
    fn save_then_load_is_identical() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("run"));

        store.save(50, &weights(), &vocabulary()).unwrap();
        assert!(store.contains(50));
        assert!(!store.contains(100));

        let checkpoint = store.load(50).unwrap();
        assert_eq!(checkpoint.percentage, 50);
        assert_eq!(checkpoint.weights, weights());
        assert_eq!(checkpoint.vocabulary, vocabulary());
    }

    #[test]
    fn missing_group_is_reported() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        match store.load(100) {
            Err(NdlError::MissingCheckpoint { percentage, .. }) => assert_eq!(percentage, 100),
            other => panic!("expected MissingCheckpoint, got {other:?}"),
        }
    }

    #[test]
    fn a_missing_id_file_makes_the_group_absent() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save(100, &weights(), &vocabulary()).unwrap();
        fs::remove_file(store.outcome_ids_path(100)).unwrap();

        assert!(!store.contains(100));
        assert!(!store.contains_all(&[100]));
        assert!(matches!(
            store.load(100),
            Err(NdlError::MissingCheckpoint { .. })
        ));
    }

    #[test]
    fn contains_all_requires_every_percentage() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save(50, &weights(), &vocabulary()).unwrap();
        assert!(store.contains_all(&[50]));
        assert!(!store.contains_all(&[50, 100]));

        store.save(100, &weights(), &vocabulary()).unwrap();
        let loaded = store.load_all(&[50, 100]).unwrap();
        assert_eq!(loaded.keys().copied().collect::<Vec<_>>(), vec![50, 100]);
    }

    #[test]
    fn shape_mismatch_is_refused_on_save_and_load() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let wrong = Array2::<f64>::zeros((2, 2));
        assert!(matches!(
            store.save(100, &wrong, &vocabulary()),
            Err(NdlError::ShapeMismatch { .. })
        ));

        store.save(100, &weights(), &vocabulary()).unwrap();
        let file = File::create(store.matrix_path(100)).unwrap();
        write_npy(file, &wrong).unwrap();
        assert!(matches!(
            store.load(100),
            Err(NdlError::CorruptCheckpoint { .. })
        ));
    }

    #[test]
    fn garbage_files_are_corrupt() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save(100, &weights(), &vocabulary()).unwrap();
        fs::write(store.cue_ids_path(100), "[1, 2").unwrap();
        assert!(matches!(
            store.load(100),
            Err(NdlError::CorruptCheckpoint { .. })
        ));
    }

    #[test]
    fn no_temporary_files_are_left_behind() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save(100, &weights(), &vocabulary()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn runs_with_different_parameters_do_not_share_a_directory() {
        let a = CheckpointStore::for_run("root", &LearningParams::new(0.1, 0.1, 1.0));
        let b = CheckpointStore::for_run("root", &LearningParams::new(0.1, 0.2, 1.0));
        assert_ne!(a.dir(), b.dir());
        assert!(a.matrix_path(5).ends_with("associationMatrix_5.npy"));
    }

    #[test]
    fn zero_percent_is_invalid() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(matches!(
            store.save(0, &weights(), &vocabulary()),
            Err(NdlError::InvalidPercentage(0))
        ));
    }
}
