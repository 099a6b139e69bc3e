//! Learning corpus: the ordered sequence of cue/outcome trials produced by
//! the encoding stage.

pub mod trial;

pub use trial::{Corpus, Trial};
