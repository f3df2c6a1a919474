//! Input processing module
//! Reads already-extracted posting and resume text from disk

pub mod file_detector;
pub mod text_extractor;
pub mod manager;

pub use manager::InputManager;
