#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{CheckpointRepository, InMemoryRepository, StorageError};
