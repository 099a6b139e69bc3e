use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NdlError, NdlResult};

/// One learning event: the cues heard and the outcomes present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    pub cues: Vec<String>,
    pub outcomes: Vec<String>,
}

impl Trial {
    pub fn new<C, O>(cues: C, outcomes: O) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            cues: cues.into_iter().map(Into::into).collect(),
            outcomes: outcomes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered learning trials. Order matters: the learner is history dependent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    trials: Vec<Trial>,
}

impl Corpus {
    pub fn new(trials: Vec<Trial>) -> Self {
        Self { trials }
    }

    /// Builds a corpus from `(cues, outcomes)` pairs.
    ///
    /// ```
    /// use ndl_core::Corpus;
    ///
    /// let corpus = Corpus::from_pairs(vec![
    ///     (vec!["a", "b"], vec!["X"]),
    ///     (vec!["b", "c"], vec!["Y"]),
    /// ]);
    /// assert_eq!(corpus.len(), 2);
    /// ```
    pub fn from_pairs<I, C, O>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, O)>,
        C: IntoIterator,
        C::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            trials: pairs
                .into_iter()
                .map(|(cues, outcomes)| Trial::new(cues, outcomes))
                .collect(),
        }
    }

    /// Reads a corpus file: a JSON array holding the per-trial cue lists and
    /// the per-trial outcome lists, aligned by position.
    pub fn load_json<P: AsRef<Path>>(path: P) -> NdlResult<Self> {
        let reader = BufReader::new(File::open(&path)?);
        let (cues, outcomes): (Vec<Vec<String>>, Vec<Vec<String>>) =
            serde_json::from_reader(reader).map_err(|err| {
                NdlError::malformed(format!("{}: {err}", path.as_ref().display()))
            })?;
        Self::from_columns(cues, outcomes)
    }

    pub fn from_columns(cues: Vec<Vec<String>>, outcomes: Vec<Vec<String>>) -> NdlResult<Self> {
        if cues.len() != outcomes.len() {
            return Err(NdlError::malformed(format!(
                "{} cue lists but {} outcome lists",
                cues.len(),
                outcomes.len()
            )));
        }
        Ok(Self {
            trials: cues
                .into_iter()
                .zip(outcomes)
                .map(|(cues, outcomes)| Trial { cues, outcomes })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trial> {
        self.trials.iter()
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Trial;
    type IntoIter = std::slice::Iter<'a, Trial>;

    fn into_iter(self) -> Self::IntoIter {
        self.trials.iter()
    }
}
