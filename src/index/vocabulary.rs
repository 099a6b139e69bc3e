use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::corpus::{Corpus, Trial};
use crate::error::{NdlError, NdlResult, SymbolKind};
use crate::logging;

/// Bijective symbol ↔ id mapping with ids assigned in first-appearance order.
///
/// On disk it is a JSON object `{symbol: id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolIndex {
    ids: HashMap<String, usize>,
    symbols: Vec<String>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `symbol`, assigning the next free one if unseen.
    pub fn insert(&mut self, symbol: &str) -> usize {
        if let Some(&id) = self.ids.get(symbol) {
            return id;
        }
        let id = self.symbols.len();
        self.ids.insert(symbol.to_string(), id);
        self.symbols.push(symbol.to_string());
        id
    }

    pub fn id(&self, symbol: &str) -> Option<usize> {
        self.ids.get(symbol).copied()
    }

    pub fn symbol(&self, id: usize) -> Option<&str> {
        self.symbols.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in id order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .map(|(id, symbol)| (symbol.as_str(), id))
    }
}

impl<S: AsRef<str>> FromIterator<S> for SymbolIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut index = Self::new();
        for symbol in iter {
            index.insert(symbol.as_ref());
        }
        index
    }
}

impl Serialize for SymbolIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for SymbolIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, usize>::deserialize(deserializer)?;
        let mut slots: Vec<Option<String>> = vec![None; raw.len()];
        for (symbol, id) in raw {
            let slot = slots.get_mut(id).ok_or_else(|| {
                de::Error::custom(format!("id {id} of {symbol:?} is not dense"))
            })?;
            if slot.is_some() {
                return Err(de::Error::custom(format!("id {id} is assigned twice")));
            }
            *slot = Some(symbol);
        }

        let symbols: Vec<String> = slots.into_iter().flatten().collect();
        let ids = symbols
            .iter()
            .enumerate()
            .map(|(id, symbol)| (symbol.clone(), id))
            .collect();
        Ok(Self { ids, symbols })
    }
}

/// What to do with a symbol that is not in the closed vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSymbolPolicy {
    /// Fail the encoding with `NdlError::UnknownSymbol`.
    #[default]
    Reject,
    /// Drop the symbol from the trial and log a warning.
    Skip,
}

impl FromStr for UnknownSymbolPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown symbol policy {other:?} (expected reject or skip)")),
        }
    }
}

impl fmt::Display for UnknownSymbolPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// A trial expressed as matrix indices. Both id lists are sorted and free of
/// duplicates, so a cue repeated in the source trial is updated once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedTrial {
    pub cues: Vec<usize>,
    pub outcomes: Vec<usize>,
}

impl EncodedTrial {
    pub fn new(mut cues: Vec<usize>, mut outcomes: Vec<usize>) -> Self {
        cues.sort_unstable();
        cues.dedup();
        outcomes.sort_unstable();
        outcomes.dedup();
        Self { cues, outcomes }
    }
}

/// The closed cue and outcome vocabularies of a corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub cues: SymbolIndex,
    pub outcomes: SymbolIndex,
}

impl Vocabulary {
    pub fn new(cues: SymbolIndex, outcomes: SymbolIndex) -> Self {
        Self { cues, outcomes }
    }

    /// Collects every distinct cue and outcome in one pass over the corpus.
    ///
    /// ```
    /// use ndl_core::{Corpus, Vocabulary};
    ///
    /// let corpus = Corpus::from_pairs(vec![(vec!["a", "b"], vec!["X"]), (vec!["b", "c"], vec!["Y"])]);
    /// let vocabulary = Vocabulary::from_corpus(&corpus);
    /// assert_eq!(vocabulary.cues.id("c"), Some(2));
    /// assert_eq!(vocabulary.outcomes.id("Y"), Some(1));
    /// ```
    pub fn from_corpus(corpus: &Corpus) -> Self {
        let mut vocabulary = Self::default();
        for trial in corpus {
            for cue in &trial.cues {
                vocabulary.cues.insert(cue);
            }
            for outcome in &trial.outcomes {
                vocabulary.outcomes.insert(outcome);
            }
        }
        vocabulary
    }

    /// Matrix shape `(cues, outcomes)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.cues.len(), self.outcomes.len())
    }

    pub fn encode(&self, trial: &Trial, policy: UnknownSymbolPolicy) -> NdlResult<EncodedTrial> {
        let cues = lookup(&self.cues, &trial.cues, SymbolKind::Cue, policy)?;
        let outcomes = lookup(&self.outcomes, &trial.outcomes, SymbolKind::Outcome, policy)?;
        Ok(EncodedTrial::new(cues, outcomes))
    }
}

fn lookup(
    index: &SymbolIndex,
    symbols: &[String],
    kind: SymbolKind,
    policy: UnknownSymbolPolicy,
) -> NdlResult<Vec<usize>> {
    let mut ids = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match (index.id(symbol), policy) {
            (Some(id), _) => ids.push(id),
            (None, UnknownSymbolPolicy::Reject) => {
                return Err(NdlError::UnknownSymbol {
                    kind,
                    symbol: symbol.clone(),
                })
            }
            (None, UnknownSymbolPolicy::Skip) => logging::warn(
                "unknown_symbol_skipped",
                &json!({ "kind": kind.to_string(), "symbol": symbol }),
            ),
        }
    }
    Ok(ids)
}
