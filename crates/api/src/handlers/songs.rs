//! Handlers for the song collection.
//!
//! Every handler passes the readiness gate (`state.store.songs()`) before
//! looking at its path or body, so a disconnected store answers 503 to any
//! song request without a store round trip.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use songapi_core::error::CoreError;
use songapi_core::song::{validate_create, validate_update, CreateSong, UpdateSong, SONG_ENTITY};
use songapi_core::types::SongId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Parse the `{id}` segment, treating a malformed id like an unknown one.
///
/// Takes the extractor result so that segments axum cannot decode (invalid
/// UTF-8 after percent-decoding) also end up as a 404 after the readiness
/// gate, instead of as axum's plain-text rejection.
fn parse_id(path: Result<Path<String>, PathRejection>) -> AppResult<SongId> {
    match path {
        Ok(Path(raw)) => SongId::parse(&raw).ok_or_else(|| not_found(&raw)),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Undecodable song id in path");
            Err(not_found(MALFORMED_ID))
        }
    }
}

/// Stand-in for ids that could not be decoded at all.
const MALFORMED_ID: &str = "<malformed>";

fn not_found(id: &str) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: SONG_ENTITY,
        id: id.to_string(),
    })
}

/// GET /api/songs
///
/// All songs, most recently created first.
pub async fn list_songs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let store = state.store.songs()?;
    let songs = store.list_songs().await?;

    tracing::debug!(count = songs.len(), "Listed songs");

    Ok(Json(songs))
}

/// GET /api/songs/{id}
pub async fn get_song(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let store = state.store.songs()?;
    let id = parse_id(path)?;

    let song = store
        .find_song(&id)
        .await?
        .ok_or_else(|| not_found(id.as_str()))?;

    Ok(Json(song))
}

/// POST /api/songs
///
/// Validate and store a new song. Returns 201 with the stored song.
pub async fn create_song(
    State(state): State<AppState>,
    payload: Result<Json<CreateSong>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let store = state.store.songs()?;
    let Json(input) = payload?;
    let new = validate_create(input)?;

    let song = store.insert_song(new).await?;

    tracing::info!(
        song_id = %song.id,
        title = %song.title,
        artist = %song.artist,
        "Song created",
    );

    Ok((StatusCode::CREATED, Json(song)))
}

/// PUT /api/songs/{id}
///
/// Merge the provided fields into the stored song. Identifier and creation
/// time cannot be changed through the body.
pub async fn update_song(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateSong>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let store = state.store.songs()?;
    let id = parse_id(path)?;
    let Json(input) = payload?;
    let patch = validate_update(input)?;

    let song = store
        .update_song(&id, &patch)
        .await?
        .ok_or_else(|| not_found(id.as_str()))?;

    tracing::info!(song_id = %song.id, "Song updated");

    Ok(Json(song))
}

/// DELETE /api/songs/{id}
///
/// Returns the removed song.
pub async fn delete_song(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let store = state.store.songs()?;
    let id = parse_id(path)?;

    let song = store
        .delete_song(&id)
        .await?
        .ok_or_else(|| not_found(id.as_str()))?;

    tracing::info!(song_id = %song.id, title = %song.title, "Song deleted");

    Ok(Json(song))
}
