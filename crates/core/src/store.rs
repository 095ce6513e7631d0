//! The data-store port for songs.
//!
//! Storage adapters implement [`SongStore`]; HTTP handlers only ever see
//! `Arc<dyn SongStore>` handed out by the readiness gate.

use async_trait::async_trait;

use crate::song::{NewSong, Song, SongPatch};
use crate::types::SongId;

/// Failure reported by a store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached while running the operation
    /// (no server selectable, socket failure, pool cleared).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other driver failure.
    #[error("{0}")]
    Driver(String),
}

/// CRUD operations over the song collection.
///
/// Each method is a single store round trip. Single-document writes are
/// atomic; nothing spans documents.
#[async_trait]
pub trait SongStore: Send + Sync {
    /// All songs, most recently created first.
    async fn list_songs(&self) -> Result<Vec<Song>, StoreError>;

    async fn find_song(&self, id: &SongId) -> Result<Option<Song>, StoreError>;

    /// Insert a song; the store assigns the id and both timestamps.
    async fn insert_song(&self, new: NewSong) -> Result<Song, StoreError>;

    /// Merge `patch` into the stored song and refresh `updated_at`.
    ///
    /// Returns the song as it is after the update, or `None` if no song has
    /// this id.
    async fn update_song(&self, id: &SongId, patch: &SongPatch)
        -> Result<Option<Song>, StoreError>;

    /// Remove a song, returning what was removed.
    async fn delete_song(&self, id: &SongId) -> Result<Option<Song>, StoreError>;
}
