//! BSON mapping for song documents.
//!
//! Field names follow the collection layout: `_id`, the song fields, and
//! camelCase `createdAt` / `updatedAt` timestamps.

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, DateTime, Document};
use serde::{Deserialize, Serialize};
use songapi_core::song::{NewSong, Song, SongChange, SongPatch};
use songapi_core::store::StoreError;
use songapi_core::types::{SongId, Timestamp};

/// Document field holding the creation timestamp (also the list sort key).
pub const CREATED_AT: &str = "createdAt";
/// Document field holding the last-update timestamp.
pub const UPDATED_AT: &str = "updatedAt";

/// A document from the `songs` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime,
}

impl SongDocument {
    /// Build a fresh document for insertion with a newly generated id.
    pub fn from_new(new: NewSong, now: Timestamp) -> Self {
        let id = ObjectId::new();
        Self::from_song(id, Song::from_new(to_song_id(&id), new, now))
    }

    fn from_song(id: ObjectId, song: Song) -> Self {
        Self {
            id,
            title: song.title,
            artist: song.artist,
            album: song.album,
            year: song.year,
            published: song.published,
            location: song.location,
            description: song.description,
            image_url: song.image_url,
            created_at: to_bson_datetime(song.created_at),
            updated_at: to_bson_datetime(song.updated_at),
        }
    }
}

impl TryFrom<SongDocument> for Song {
    type Error = StoreError;

    fn try_from(doc: SongDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: to_song_id(&doc.id),
            title: doc.title,
            artist: doc.artist,
            album: doc.album,
            year: doc.year,
            published: doc.published,
            location: doc.location,
            description: doc.description,
            image_url: doc.image_url,
            created_at: to_timestamp(doc.created_at)?,
            updated_at: to_timestamp(doc.updated_at)?,
        })
    }
}

/// Convert a validated [`SongId`] to an [`ObjectId`].
///
/// Returns `None` only if the id is not a valid object id, which cannot
/// happen for ids produced by [`SongId::parse`].
pub fn to_object_id(id: &SongId) -> Option<ObjectId> {
    ObjectId::parse_str(id.as_str()).ok()
}

pub fn to_song_id(oid: &ObjectId) -> SongId {
    SongId::from_bytes(oid.bytes())
}

pub fn to_bson_datetime(ts: Timestamp) -> DateTime {
    DateTime::from_millis(ts.timestamp_millis())
}

/// Fails for stored dates outside the range `chrono` can represent.
pub fn to_timestamp(dt: DateTime) -> Result<Timestamp, StoreError> {
    Timestamp::from_timestamp_millis(dt.timestamp_millis()).ok_or_else(|| {
        StoreError::Driver(format!(
            "stored datetime out of range: {} ms",
            dt.timestamp_millis()
        ))
    })
}

/// Build the update document for a patch.
///
/// Provided fields go into `$set`; `updatedAt` goes through `$max` so it
/// never decreases even if clocks disagree. `_id` and `createdAt` are never
/// part of the update.
pub fn update_document(patch: &SongPatch, now: Timestamp) -> Document {
    let mut set = Document::new();
    for change in patch.changes() {
        let field = change.field();
        match change {
            SongChange::Year(year) => set.insert(field, year),
            SongChange::Title(v)
            | SongChange::Artist(v)
            | SongChange::Album(v)
            | SongChange::Published(v)
            | SongChange::Location(v)
            | SongChange::Description(v)
            | SongChange::ImageUrl(v) => set.insert(field, v),
        };
    }

    let mut update = doc! { "$max": { UPDATED_AT: to_bson_datetime(now) } };
    // Older servers reject an empty `$set`.
    if !patch.is_empty() {
        update.insert("$set", set);
    }
    update
}
