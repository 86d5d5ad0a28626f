use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_core::model::{HintCheckpoint, PlaythroughId, SavedCheckpoint};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a hint checkpoint.
///
/// The checkpoint body is kept as JSON so adapters can store it in a single
/// column without knowing the `HelpIndex` layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub playthrough_id: u64,
    pub payload: String,
    pub saved_at: DateTime<Utc>,
}

impl CheckpointRecord {
    /// Serialize a domain checkpoint into its persisted shape.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the checkpoint cannot be encoded.
    pub fn from_saved(saved: &SavedCheckpoint) -> Result<Self, StorageError> {
        let payload = serde_json::to_string(&saved.checkpoint)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Self {
            playthrough_id: saved.playthrough.value(),
            payload,
            saved_at: saved.saved_at,
        })
    }

    /// Convert the record back into a domain checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the payload is corrupt.
    pub fn into_saved(self) -> Result<SavedCheckpoint, StorageError> {
        let checkpoint: HintCheckpoint = serde_json::from_str(&self.payload)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(SavedCheckpoint {
            playthrough: PlaythroughId::new(self.playthrough_id),
            checkpoint,
            saved_at: self.saved_at,
        })
    }
}

/// Repository contract for hint checkpoints, one per play-through.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Persist or replace the checkpoint for a play-through.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the checkpoint cannot be stored.
    async fn save_checkpoint(&self, saved: &SavedCheckpoint) -> Result<(), StorageError>;

    /// Fetch the checkpoint for a play-through, if one was saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the stored record is corrupt.
    async fn get_checkpoint(
        &self,
        playthrough: PlaythroughId,
    ) -> Result<Option<SavedCheckpoint>, StorageError>;

    /// Remove the checkpoint for a play-through.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if nothing was saved, or other storage errors.
    async fn delete_checkpoint(&self, playthrough: PlaythroughId) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    checkpoints: Arc<Mutex<HashMap<PlaythroughId, CheckpointRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            checkpoints: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Overwrite a stored record verbatim, bypassing serialization.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn insert_record(&self, record: CheckpointRecord) -> Result<(), StorageError> {
        let mut guard = self
            .checkpoints
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(PlaythroughId::new(record.playthrough_id), record);
        Ok(())
    }
}

#[async_trait]
impl CheckpointRepository for InMemoryRepository {
    async fn save_checkpoint(&self, saved: &SavedCheckpoint) -> Result<(), StorageError> {
        let record = CheckpointRecord::from_saved(saved)?;
        self.insert_record(record)?;
        tracing::debug!(playthrough = %saved.playthrough, "saved hint checkpoint");
        Ok(())
    }

    async fn get_checkpoint(
        &self,
        playthrough: PlaythroughId,
    ) -> Result<Option<SavedCheckpoint>, StorageError> {
        let record = {
            let guard = self
                .checkpoints
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            guard.get(&playthrough).cloned()
        };
        record.map(CheckpointRecord::into_saved).transpose()
    }

    async fn delete_checkpoint(&self, playthrough: PlaythroughId) -> Result<(), StorageError> {
        let mut guard = self
            .checkpoints
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .remove(&playthrough)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}
