//! Question-answering chains over the vector store.

mod qa;

pub use qa::{ChatOutcome, QaChain, DEFAULT_TOP_K};
