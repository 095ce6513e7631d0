#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use songapi_core::readiness::StoreReadiness;
use songapi_core::song::{NewSong, Song, SongPatch};
use songapi_core::store::{SongStore, StoreError};
use songapi_core::types::SongId;
use songapi_db::{DbConfig, StoreHandle};
use tokio::sync::Mutex;
use tower::ServiceExt;

use songapi_api::config::ServerConfig;
use songapi_api::router::build_app_router;
use songapi_api::state::AppState;

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// `SongStore` kept in a `Vec` in insertion order. Counts every call so tests
/// can assert that a request never reached the store.
#[derive(Default)]
pub struct MemoryStore {
    songs: Mutex<Vec<Song>>,
    next_id: AtomicUsize,
    ops: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations performed so far.
    pub fn ops(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.songs.lock().await.len()
    }

    fn touch(&self) {
        self.ops.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SongStore for MemoryStore {
    async fn list_songs(&self) -> Result<Vec<Song>, StoreError> {
        self.touch();
        let mut songs: Vec<Song> = self.songs.lock().await.iter().rev().cloned().collect();
        // Stable sort keeps later inserts first among equal timestamps.
        songs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(songs)
    }

    async fn find_song(&self, id: &SongId) -> Result<Option<Song>, StoreError> {
        self.touch();
        let songs = self.songs.lock().await;
        Ok(songs.iter().find(|s| &s.id == id).cloned())
    }

    async fn insert_song(&self, new: NewSong) -> Result<Song, StoreError> {
        self.touch();
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = SongId::parse(&format!("{n:024x}"))
            .ok_or_else(|| StoreError::Driver("bad generated id".into()))?;
        let song = Song::from_new(id, new, Utc::now());
        self.songs.lock().await.push(song.clone());
        Ok(song)
    }

    async fn update_song(
        &self,
        id: &SongId,
        patch: &SongPatch,
    ) -> Result<Option<Song>, StoreError> {
        self.touch();
        let mut songs = self.songs.lock().await;
        Ok(songs.iter_mut().find(|s| &s.id == id).map(|song| {
            song.apply(patch, Utc::now());
            song.clone()
        }))
    }

    async fn delete_song(&self, id: &SongId) -> Result<Option<Song>, StoreError> {
        self.touch();
        let mut songs = self.songs.lock().await;
        Ok(songs
            .iter()
            .position(|s| &s.id == id)
            .map(|index| songs.remove(index)))
    }
}

/// `SongStore` whose every operation fails.
pub struct FailingStore {
    unavailable: bool,
    message: String,
}

impl FailingStore {
    pub fn unavailable(message: &str) -> Self {
        Self {
            unavailable: true,
            message: message.to_string(),
        }
    }

    pub fn driver(message: &str) -> Self {
        Self {
            unavailable: false,
            message: message.to_string(),
        }
    }

    fn error(&self) -> StoreError {
        if self.unavailable {
            StoreError::Unavailable(self.message.clone())
        } else {
            StoreError::Driver(self.message.clone())
        }
    }
}

#[async_trait]
impl SongStore for FailingStore {
    async fn list_songs(&self) -> Result<Vec<Song>, StoreError> {
        Err(self.error())
    }

    async fn find_song(&self, _id: &SongId) -> Result<Option<Song>, StoreError> {
        Err(self.error())
    }

    async fn insert_song(&self, _new: NewSong) -> Result<Song, StoreError> {
        Err(self.error())
    }

    async fn update_song(
        &self,
        _id: &SongId,
        _patch: &SongPatch,
    ) -> Result<Option<Song>, StoreError> {
        Err(self.error())
    }

    async fn delete_song(&self, _id: &SongId) -> Result<Option<Song>, StoreError> {
        Err(self.error())
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin and a 30-second request
/// timeout. No store URI: tests attach their own store to the handle.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 1,
        db: DbConfig::default(),
    }
}

/// Build the full application router, with the production middleware stack,
/// over the given store handle.
pub fn build_test_app(store: Arc<StoreHandle>) -> Router {
    build_app_router(AppState { store }, &test_config())
}

/// App over a connected in-memory store.
pub fn connected_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let handle = StoreHandle::with_store(store.clone(), StoreReadiness::Connected);
    (build_test_app(Arc::new(handle)), store)
}

/// App whose in-memory store is attached but in `readiness`.
pub fn app_with_readiness(readiness: StoreReadiness) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let handle = StoreHandle::with_store(store.clone(), readiness);
    (build_test_app(Arc::new(handle)), store)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::PUT, uri, body).await
}

async fn json_request(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Send a raw body with an explicit content type.
pub async fn send_raw(
    app: Router,
    method: Method,
    uri: &str,
    content_type: &str,
    body: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
