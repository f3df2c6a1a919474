//! Text processing and scoring module

pub mod normalizer;
pub mod skills;
pub mod vocabulary;
pub mod ner;
pub mod lexical;
pub mod semantic;
pub mod aggregator;
pub mod engine;
