//! Model-backed embedding and entity-recognition capabilities

pub mod model_manager;
pub mod embedder;
pub mod bert_ner;
