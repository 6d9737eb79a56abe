//! Failure-window checks and the post-failure validation pipeline.

pub mod corruption;
pub mod pause;
pub mod pipeline;

pub use pause::{MAX_SILENT_MINUTES, PauseReport, silent_minutes};
pub use pipeline::StorageType;
