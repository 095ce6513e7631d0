//! The song entity, its request payloads, and field validation.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationErrors};
use crate::types::{SongId, Timestamp};

/// Entity name used in not-found errors and log fields.
pub const SONG_ENTITY: &str = "Song";

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A stored song, as returned by every read and write endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: i32,
    pub published: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Song {
    /// Build the stored form of a validated create payload.
    ///
    /// `created_at` and `updated_at` both start at `now`.
    pub fn from_new(id: SongId, new: NewSong, now: Timestamp) -> Self {
        Self {
            id,
            title: new.title,
            artist: new.artist,
            album: new.album,
            year: new.year,
            published: new.published,
            location: new.location,
            description: new.description,
            image_url: new.image_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a validated patch into this song and refresh `updated_at`.
    ///
    /// `updated_at` never moves backwards, even if the clock does.
    pub fn apply(&mut self, patch: &SongPatch, now: Timestamp) {
        for change in patch.changes() {
            match change {
                SongChange::Title(v) => self.title = v.to_owned(),
                SongChange::Artist(v) => self.artist = v.to_owned(),
                SongChange::Album(v) => self.album = v.to_owned(),
                SongChange::Year(v) => self.year = v,
                SongChange::Published(v) => self.published = Some(v.to_owned()),
                SongChange::Location(v) => self.location = Some(v.to_owned()),
                SongChange::Description(v) => self.description = Some(v.to_owned()),
                SongChange::ImageUrl(v) => self.image_url = Some(v.to_owned()),
            }
        }
        self.updated_at = self.updated_at.max(now);
    }
}

/// A validated create payload. Required fields are guaranteed non-blank.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: i32,
    pub published: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// A validated partial update. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub published: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl SongPatch {
    /// The fields this patch sets, in declaration order.
    ///
    /// Both the in-place merge ([`Song::apply`]) and the store's update
    /// document are built from this list.
    pub fn changes(&self) -> Vec<SongChange<'_>> {
        let mut changes = Vec::new();
        if let Some(v) = &self.title {
            changes.push(SongChange::Title(v));
        }
        if let Some(v) = &self.artist {
            changes.push(SongChange::Artist(v));
        }
        if let Some(v) = &self.album {
            changes.push(SongChange::Album(v));
        }
        if let Some(v) = self.year {
            changes.push(SongChange::Year(v));
        }
        if let Some(v) = &self.published {
            changes.push(SongChange::Published(v));
        }
        if let Some(v) = &self.location {
            changes.push(SongChange::Location(v));
        }
        if let Some(v) = &self.description {
            changes.push(SongChange::Description(v));
        }
        if let Some(v) = &self.image_url {
            changes.push(SongChange::ImageUrl(v));
        }
        changes
    }

    /// True when the patch changes nothing but `updated_at`.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One field set by a [`SongPatch`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SongChange<'a> {
    Title(&'a str),
    Artist(&'a str),
    Album(&'a str),
    Year(i32),
    Published(&'a str),
    Location(&'a str),
    Description(&'a str),
    ImageUrl(&'a str),
}

impl SongChange<'_> {
    /// Serialized name of the field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Title(_) => "title",
            Self::Artist(_) => "artist",
            Self::Album(_) => "album",
            Self::Year(_) => "year",
            Self::Published(_) => "published",
            Self::Location(_) => "location",
            Self::Description(_) => "description",
            Self::ImageUrl(_) => "image_url",
        }
    }
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// Body of `POST /api/songs`.
///
/// Every field is optional at the serde level so a missing required field
/// surfaces as a validation error naming that field rather than as a JSON
/// extractor rejection. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSong {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub published: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Body of `PUT /api/songs/{id}`.
///
/// Identifier and timestamps are not part of this type; if a client sends
/// `id`, `_id`, `created_at` or `updated_at` they are dropped during
/// deserialization and can never reach the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSong {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub published: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check a required text field, recording an error if it is missing or blank.
fn require_text(
    field: &'static str,
    value: Option<String>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match value {
        None => {
            errors.push(field, "is required");
            None
        }
        Some(v) if v.trim().is_empty() => {
            errors.push(field, "must not be empty");
            None
        }
        Some(v) => Some(v),
    }
}

/// Check a required text field that may be absent from a partial update.
fn non_blank_if_present(
    field: &'static str,
    value: Option<String>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match value {
        Some(v) if v.trim().is_empty() => {
            errors.push(field, "must not be empty");
            None
        }
        other => other,
    }
}

/// Validate a create payload.
///
/// Rules:
/// - `title`, `artist`, `album` must be present and not blank.
/// - `year` must be present.
/// - Optional text fields are accepted as-is.
pub fn validate_create(input: CreateSong) -> Result<NewSong, CoreError> {
    let mut errors = ValidationErrors::new();

    let title = require_text("title", input.title, &mut errors);
    let artist = require_text("artist", input.artist, &mut errors);
    let album = require_text("album", input.album, &mut errors);
    if input.year.is_none() {
        errors.push("year", "is required");
    }

    match (title, artist, album, input.year) {
        (Some(title), Some(artist), Some(album), Some(year)) if errors.is_empty() => Ok(NewSong {
            title,
            artist,
            album,
            year,
            published: input.published,
            location: input.location,
            description: input.description,
            image_url: input.image_url,
        }),
        _ => Err(CoreError::Validation(errors)),
    }
}

/// Validate an update payload.
///
/// Required text fields may be omitted, but if provided they must not be
/// blank so a record can never lose a required value.
pub fn validate_update(input: UpdateSong) -> Result<SongPatch, CoreError> {
    let mut errors = ValidationErrors::new();

    let patch = SongPatch {
        title: non_blank_if_present("title", input.title, &mut errors),
        artist: non_blank_if_present("artist", input.artist, &mut errors),
        album: non_blank_if_present("album", input.album, &mut errors),
        year: input.year,
        published: input.published,
        location: input.location,
        description: input.description,
        image_url: input.image_url,
    };

    errors.into_result(patch)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
