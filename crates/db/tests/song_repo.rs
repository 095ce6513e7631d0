//! Integration tests for `MongoSongRepo` against a live MongoDB.
//!
//! Set `MONGO_TEST_URI` (e.g. `mongodb://localhost:27017`) to run them; each
//! test uses its own throwaway collection. Without the variable the tests
//! return early.

use chrono::Utc;
use songapi_core::song::{NewSong, SongPatch};
use songapi_core::store::SongStore;
use songapi_core::types::SongId;
use songapi_db::repositories::MongoSongRepo;
use songapi_db::DbConfig;

async fn test_repo(name: &str) -> Option<(MongoSongRepo, mongodb::Collection<mongodb::bson::Document>)> {
    let uri = std::env::var("MONGO_TEST_URI").ok()?;
    let config = DbConfig {
        uri: Some(uri.clone()),
        database: "songapi_test".into(),
        ..DbConfig::default()
    };
    let client = songapi_db::create_client(&uri, &config).await.ok()?;
    let db = songapi_db::database(&client, &config);
    let collection = format!("songs_{name}_{}", Utc::now().timestamp_millis());
    let raw = db.collection(&collection);
    Some((MongoSongRepo::new(&db, &collection), raw))
}

fn new_song(title: &str) -> NewSong {
    NewSong {
        title: title.into(),
        artist: "B".into(),
        album: "C".into(),
        year: 1999,
        published: None,
        location: None,
        description: None,
        image_url: None,
    }
}

#[tokio::test]
async fn insert_then_find_returns_same_song() {
    let Some((repo, raw)) = test_repo("find").await else {
        return;
    };

    let created = repo.insert_song(new_song("A")).await.unwrap();
    assert_eq!(created.created_at, created.updated_at);

    let found = repo.find_song(&created.id).await.unwrap().unwrap();
    assert_eq!(found, created);

    raw.drop().await.unwrap();
}

#[tokio::test]
async fn list_is_newest_first() {
    let Some((repo, raw)) = test_repo("list").await else {
        return;
    };

    let a = repo.insert_song(new_song("A")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let b = repo.insert_song(new_song("B")).await.unwrap();

    let songs = repo.list_songs().await.unwrap();
    let ids: Vec<_> = songs.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, vec![b.id, a.id]);

    raw.drop().await.unwrap();
}

#[tokio::test]
async fn update_merges_and_keeps_created_at() {
    let Some((repo, raw)) = test_repo("update").await else {
        return;
    };

    let created = repo.insert_song(new_song("A")).await.unwrap();
    let patch = SongPatch {
        year: Some(2000),
        ..Default::default()
    };
    let updated = repo.update_song(&created.id, &patch).await.unwrap().unwrap();

    assert_eq!(updated.year, 2000);
    assert_eq!(updated.title, created.title);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);

    raw.drop().await.unwrap();
}

#[tokio::test]
async fn delete_returns_removed_song_once() {
    let Some((repo, raw)) = test_repo("delete").await else {
        return;
    };

    let created = repo.insert_song(new_song("A")).await.unwrap();
    let removed = repo.delete_song(&created.id).await.unwrap();
    assert_eq!(removed.map(|s| s.id), Some(created.id.clone()));

    assert!(repo.delete_song(&created.id).await.unwrap().is_none());
    assert!(repo.find_song(&created.id).await.unwrap().is_none());

    raw.drop().await.unwrap();
}

#[tokio::test]
async fn unknown_id_is_none() {
    let Some((repo, raw)) = test_repo("unknown").await else {
        return;
    };

    let id = SongId::parse("000000000000000000000000").unwrap();
    assert!(repo.find_song(&id).await.unwrap().is_none());
    assert!(repo
        .update_song(&id, &SongPatch::default())
        .await
        .unwrap()
        .is_none());

    raw.drop().await.unwrap();
}
