//! Store adapters implementing the core `SongStore` port.

pub mod song_repo;

pub use song_repo::MongoSongRepo;
