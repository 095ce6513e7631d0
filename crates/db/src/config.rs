use std::time::Duration;

/// Largest connection pool a deployment can ask for.
pub const MAX_POOL_SIZE_CAP: u32 = 100;

/// Store connection settings loaded from environment variables.
///
/// A missing connection string is not an error here: the connection manager
/// treats it as a startup condition and runs in degraded mode.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// MongoDB connection string. `None` when unset or blank.
    pub uri: Option<String>,
    /// Database used when the connection string names none.
    pub database: String,
    /// Collection holding song documents.
    pub collection: String,
    /// How long an operation waits for a usable server.
    pub server_selection_timeout: Duration,
    /// Socket connect timeout.
    pub connect_timeout: Duration,
    pub min_pool_size: u32,
    pub max_pool_size: u32,
    /// Interval between supervisor pings while connected.
    pub heartbeat_interval: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: "song_management".to_string(),
            collection: "songs".to_string(),
            server_selection_timeout: Duration::from_millis(5_000),
            connect_timeout: Duration::from_millis(10_000),
            min_pool_size: 2,
            max_pool_size: 10,
            heartbeat_interval: Duration::from_secs(10),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                              | Default           |
    /// |--------------------------------------|-------------------|
    /// | `MONGO_URI`                          | (none)            |
    /// | `MONGO_DB_NAME`                      | `song_management` |
    /// | `MONGO_COLLECTION`                   | `songs`           |
    /// | `MONGO_SERVER_SELECTION_TIMEOUT_MS`  | `5000`            |
    /// | `MONGO_CONNECT_TIMEOUT_MS`           | `10000`           |
    /// | `MONGO_MIN_POOL_SIZE`                | `2`               |
    /// | `MONGO_MAX_POOL_SIZE`                | `10`              |
    /// | `MONGO_HEARTBEAT_SECS`               | `10`              |
    ///
    /// Unparseable numbers fall back to their defaults. Pool sizes are capped
    /// at [`MAX_POOL_SIZE_CAP`] and the maximum is never below the minimum.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DbConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |key: &str, default: u64| {
            text(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        let pool_size = |key: &str, default: u32| {
            u32::try_from(number(key, default.into()))
                .unwrap_or(default)
                .min(MAX_POOL_SIZE_CAP)
        };
        let min_pool_size = pool_size("MONGO_MIN_POOL_SIZE", defaults.min_pool_size);
        let max_pool_size = pool_size("MONGO_MAX_POOL_SIZE", defaults.max_pool_size)
            .max(min_pool_size)
            .max(1);

        Self {
            uri: text("MONGO_URI"),
            database: text("MONGO_DB_NAME").unwrap_or(defaults.database),
            collection: text("MONGO_COLLECTION").unwrap_or(defaults.collection),
            server_selection_timeout: Duration::from_millis(number(
                "MONGO_SERVER_SELECTION_TIMEOUT_MS",
                defaults.server_selection_timeout.as_millis() as u64,
            )),
            connect_timeout: Duration::from_millis(number(
                "MONGO_CONNECT_TIMEOUT_MS",
                defaults.connect_timeout.as_millis() as u64,
            )),
            min_pool_size,
            max_pool_size,
            heartbeat_interval: Duration::from_secs(
                number(
                    "MONGO_HEARTBEAT_SECS",
                    defaults.heartbeat_interval.as_secs(),
                )
                .max(1),
            ),
        }
    }
}
