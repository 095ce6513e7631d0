//! Repository for the `songs` collection.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::ErrorKind;
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use songapi_core::song::{NewSong, Song, SongPatch};
use songapi_core::store::{SongStore, StoreError};
use songapi_core::types::SongId;

use crate::models::song::{to_object_id, update_document, SongDocument, CREATED_AT};

/// MongoDB-backed [`SongStore`].
///
/// Cheap to clone; the underlying client pool is shared.
#[derive(Clone)]
pub struct MongoSongRepo {
    songs: Collection<SongDocument>,
}

impl MongoSongRepo {
    pub fn new(db: &Database, collection: &str) -> Self {
        Self {
            songs: db.collection(collection),
        }
    }
}

/// Map a driver error to the port's error type.
///
/// Connectivity failures become [`StoreError::Unavailable`] so callers can
/// answer "try again later" instead of a generic failure.
fn store_error(err: mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Driver(err.to_string()),
    }
}

#[async_trait]
impl SongStore for MongoSongRepo {
    async fn list_songs(&self) -> Result<Vec<Song>, StoreError> {
        let cursor = self
            .songs
            .find(doc! {})
            .sort(doc! { CREATED_AT: -1, "_id": -1 })
            .await
            .map_err(store_error)?;

        let docs: Vec<SongDocument> = cursor.try_collect().await.map_err(store_error)?;
        docs.into_iter().map(Song::try_from).collect()
    }

    async fn find_song(&self, id: &SongId) -> Result<Option<Song>, StoreError> {
        let Some(oid) = to_object_id(id) else {
            return Ok(None);
        };
        let doc = self
            .songs
            .find_one(doc! { "_id": oid })
            .await
            .map_err(store_error)?;
        doc.map(Song::try_from).transpose()
    }

    async fn insert_song(&self, new: NewSong) -> Result<Song, StoreError> {
        let doc = SongDocument::from_new(new, chrono::Utc::now());
        self.songs.insert_one(&doc).await.map_err(store_error)?;
        Song::try_from(doc)
    }

    async fn update_song(
        &self,
        id: &SongId,
        patch: &SongPatch,
    ) -> Result<Option<Song>, StoreError> {
        let Some(oid) = to_object_id(id) else {
            return Ok(None);
        };
        let doc = self
            .songs
            .find_one_and_update(doc! { "_id": oid }, update_document(patch, chrono::Utc::now()))
            .return_document(ReturnDocument::After)
            .await
            .map_err(store_error)?;
        doc.map(Song::try_from).transpose()
    }

    async fn delete_song(&self, id: &SongId) -> Result<Option<Song>, StoreError> {
        let Some(oid) = to_object_id(id) else {
            return Ok(None);
        };
        let doc = self
            .songs
            .find_one_and_delete(doc! { "_id": oid })
            .await
            .map_err(store_error)?;
        doc.map(Song::try_from).transpose()
    }
}
