use axum::routing::get;
use axum::Router;

use crate::handlers::songs;
use crate::state::AppState;

/// Song routes mounted at `/api/songs`.
///
/// ```text
/// GET    /        -> list_songs
/// POST   /        -> create_song
/// GET    /{id}    -> get_song
/// PUT    /{id}    -> update_song
/// DELETE /{id}    -> delete_song
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(songs::list_songs).post(songs::create_song))
        .route(
            "/{id}",
            get(songs::get_song)
                .put(songs::update_song)
                .delete(songs::delete_song),
        )
}
