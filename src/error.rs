//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Which side of the association matrix a symbol or id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Cue,
    Outcome,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Cue => write!(f, "cue"),
            SymbolKind::Outcome => write!(f, "outcome"),
        }
    }
}

/// Main error type for learning runs.
#[derive(Error, Debug)]
pub enum NdlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The corpus does not pair every cue list with an outcome list.
    #[error("Malformed corpus: {0}")]
    MalformedCorpus(String),

    /// A symbol outside the closed vocabulary was met under the reject policy.
    #[error("Unknown {kind} symbol {symbol:?}")]
    UnknownSymbol { kind: SymbolKind, symbol: String },

    /// An encoded trial points outside the association matrix.
    #[error("Unknown {kind} id {id} (vocabulary size {len})")]
    UnknownId { kind: SymbolKind, id: usize, len: usize },

    #[error("Matrix shape {found:?} does not match vocabulary shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Checkpoint percentage {0} is outside 1..=100")]
    InvalidPercentage(u32),

    #[error("Checkpoint {percentage}% is missing ({})", path.display())]
    MissingCheckpoint { percentage: u8, path: PathBuf },

    #[error("Checkpoint file {} is corrupt: {reason}", path.display())]
    CorruptCheckpoint { path: PathBuf, reason: String },
}

pub type NdlResult<T> = Result<T, NdlError>;

impl NdlError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptCheckpoint {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedCorpus(msg.into())
    }
}
