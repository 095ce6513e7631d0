//! MongoDB adapter for the song store.
//!
//! [`connection::ConnectionManager`] owns the client and keeps
//! [`handle::StoreHandle`] readiness current; [`repositories::MongoSongRepo`]
//! implements the `SongStore` port on top of a collection.

use mongodb::bson::doc;
use mongodb::options::{Acknowledgment, ClientOptions, WriteConcern};
use mongodb::{Client, Database};

pub mod config;
pub mod connection;
pub mod handle;
pub mod models;
pub mod reconnect;
pub mod repositories;

pub use config::DbConfig;
pub use connection::ConnectionManager;
pub use handle::StoreHandle;

/// Application name reported to the server in the connection handshake.
const APP_NAME: &str = "songapi";

/// Create a client from a connection string with bounded timeouts, a small
/// fixed pool, retryable writes and majority write acknowledgment.
///
/// Does not contact the server beyond SRV/TXT lookups for `mongodb+srv://`
/// URIs; use [`health_check`] to verify connectivity.
pub async fn create_client(uri: &str, config: &DbConfig) -> Result<Client, mongodb::error::Error> {
    let mut options = ClientOptions::parse(uri).await?;

    options.app_name = Some(APP_NAME.to_string());
    options.server_selection_timeout = Some(config.server_selection_timeout);
    options.connect_timeout = Some(config.connect_timeout);
    options.min_pool_size = Some(config.min_pool_size);
    options.max_pool_size = Some(config.max_pool_size);
    options.retry_writes = Some(true);
    options.write_concern = Some(
        WriteConcern::builder()
            .w(Acknowledgment::Majority)
            .build(),
    );

    Client::with_options(options)
}

/// Pick the database named in the connection string, falling back to the
/// configured name.
pub fn database(client: &Client, config: &DbConfig) -> Database {
    client
        .default_database()
        .unwrap_or_else(|| client.database(&config.database))
}

/// Verify the server answers a `ping`.
pub async fn health_check(db: &Database) -> Result<(), mongodb::error::Error> {
    db.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}
