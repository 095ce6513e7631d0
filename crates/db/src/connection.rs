//! Store connection supervisor.
//!
//! [`ConnectionManager::start`] never fails and never blocks: it hands back a
//! [`StoreHandle`] immediately and supervises the MongoDB connection in a
//! background task. The task pings the server, keeps the handle's readiness
//! current, and retries with exponential backoff while the server is away.
//! Connection trouble is logged, never fatal; requests arriving while the
//! store is not connected are rejected by the handle, not queued.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mongodb::error::ErrorKind;
use mongodb::Database;
use songapi_core::readiness::StoreReadiness;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::DbConfig;
use crate::handle::StoreHandle;
use crate::reconnect::{next_delay, ReconnectConfig};
use crate::repositories::MongoSongRepo;

/// Server error codes that mean the credentials were refused.
const AUTH_FAILED_CODES: [i32; 2] = [13, 18];

/// Coarse cause of a connection failure, used to pick the readiness state and
/// an operator-facing hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// `MONGO_URI` not configured.
    MissingUri,
    /// Connection string or client options rejected by the driver.
    InvalidConfig,
    /// Server refused the credentials.
    Authentication,
    /// No server reachable: DNS, routing, firewall, cluster down.
    Unreachable,
    Other,
}

impl FailureKind {
    pub fn classify(err: &mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::InvalidArgument { .. } => Self::InvalidConfig,
            ErrorKind::Authentication { .. } => Self::Authentication,
            ErrorKind::Command(cmd) if AUTH_FAILED_CODES.contains(&cmd.code) => {
                Self::Authentication
            }
            ErrorKind::DnsResolve { .. }
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. } => Self::Unreachable,
            _ => Self::Other,
        }
    }

    /// What an operator should check.
    pub fn hint(self) -> &'static str {
        match self {
            Self::MissingUri => "set MONGO_URI to a mongodb:// or mongodb+srv:// connection string",
            Self::InvalidConfig => "MONGO_URI could not be parsed; check its scheme, host list and options",
            Self::Authentication => {
                "authentication failed; check the username, password and authSource in MONGO_URI"
            }
            Self::Unreachable => {
                "no server reachable; check the host name, that the cluster is running, and that its network access list allows this machine"
            }
            Self::Other => "unexpected driver error; see the error field",
        }
    }

    /// Readiness to report after a failure of this kind.
    ///
    /// Failures that need operator action are `faulted`; the supervisor keeps
    /// retrying either way.
    pub fn readiness(self) -> StoreReadiness {
        match self {
            Self::MissingUri | Self::InvalidConfig | Self::Authentication => {
                StoreReadiness::Faulted
            }
            Self::Unreachable | Self::Other => StoreReadiness::Disconnected,
        }
    }
}

/// Owns the background supervisor and the [`StoreHandle`] it maintains.
pub struct ConnectionManager {
    handle: Arc<StoreHandle>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Start supervising the store described by `config`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: DbConfig) -> Self {
        Self::start_with(config, ReconnectConfig::default())
    }

    pub fn start_with(config: DbConfig, reconnect: ReconnectConfig) -> Self {
        let handle = Arc::new(StoreHandle::new());
        let cancel = CancellationToken::new();

        let Some(uri) = config.uri.clone() else {
            let kind = FailureKind::MissingUri;
            tracing::error!(
                hint = kind.hint(),
                "MONGO_URI is not set; running without a database, song endpoints will return 503",
            );
            handle.set_readiness(kind.readiness());
            return Self {
                handle,
                cancel,
                task: None,
            };
        };

        let task = tokio::spawn(supervise(
            uri,
            config,
            reconnect,
            Arc::clone(&handle),
            cancel.clone(),
        ));

        Self {
            handle,
            cancel,
            task: Some(task),
        }
    }

    /// Shared handle for request handlers.
    pub fn handle(&self) -> Arc<StoreHandle> {
        Arc::clone(&self.handle)
    }

    /// Stop the supervisor, waiting at most `timeout` for it to exit.
    pub async fn shutdown(self, timeout: Duration) {
        self.cancel.cancel();
        if let Some(task) = self.task {
            if tokio::time::timeout(timeout, task).await.is_err() {
                tracing::warn!("Store supervisor did not stop in time");
            }
        }
    }
}

/// Connect, then check forever: heartbeat while connected, back off while not.
async fn supervise(
    uri: String,
    config: DbConfig,
    reconnect: ReconnectConfig,
    handle: Arc<StoreHandle>,
    cancel: CancellationToken,
) {
    let mut delay = reconnect.initial_delay;
    let mut attempt = 0u32;

    // Client creation only fails on bad options or SRV lookup trouble.
    let client = loop {
        match crate::create_client(&uri, &config).await {
            Ok(client) => break client,
            Err(e) => {
                attempt += 1;
                let kind = FailureKind::classify(&e);
                handle.set_readiness(kind.readiness());
                if kind == FailureKind::InvalidConfig {
                    tracing::error!(
                        error = %e,
                        hint = kind.hint(),
                        "Invalid MongoDB configuration; song endpoints will return 503",
                    );
                    return;
                }
                tracing::error!(
                    attempt,
                    error = %e,
                    hint = kind.hint(),
                    retry_in_ms = delay.as_millis() as u64,
                    "Could not create MongoDB client",
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = next_delay(delay, &reconnect);
    };

    let db = crate::database(&client, &config);
    handle.attach(Arc::new(MongoSongRepo::new(&db, &config.collection)));
    tracing::info!(
        database = db.name(),
        collection = %config.collection,
        "MongoDB client ready, checking connection",
    );

    let check = PingCheck { db };
    watch_connection(
        &check,
        &handle,
        config.heartbeat_interval,
        &reconnect,
        &cancel,
    )
    .await;
}

/// A failed liveness check, already classified.
#[derive(Debug, Clone)]
pub struct CheckFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<mongodb::error::Error> for CheckFailure {
    fn from(err: mongodb::error::Error) -> Self {
        Self {
            kind: FailureKind::classify(&err),
            message: err.to_string(),
        }
    }
}

/// One round trip that tells whether the store is reachable.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> Result<(), CheckFailure>;
}

/// Checks with a `ping` command against the configured database.
struct PingCheck {
    db: Database,
}

#[async_trait]
impl HealthCheck for PingCheck {
    async fn check(&self) -> Result<(), CheckFailure> {
        crate::health_check(&self.db).await?;
        Ok(())
    }
}

/// Check until cancelled: every `heartbeat` while connected, on the backoff
/// schedule while not. Leaves the handle `disconnected` on exit.
pub async fn watch_connection<P: HealthCheck + ?Sized>(
    check: &P,
    handle: &StoreHandle,
    heartbeat: Duration,
    reconnect: &ReconnectConfig,
    cancel: &CancellationToken,
) {
    let mut delay = reconnect.initial_delay;
    let mut attempt = 0u32;
    let mut ever_connected = false;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = check.check() => result,
        };

        let wait = match result {
            Ok(()) => {
                let previous = handle.set_readiness(StoreReadiness::Connected);
                if !ever_connected {
                    tracing::info!(attempts = attempt + 1, "Connected to MongoDB");
                    ever_connected = true;
                } else if previous != StoreReadiness::Connected {
                    tracing::info!(%previous, "Reconnected to MongoDB");
                } else {
                    tracing::trace!("MongoDB heartbeat ok");
                }
                attempt = 0;
                delay = reconnect.initial_delay;
                heartbeat
            }
            Err(failure) => {
                attempt += 1;
                let previous = handle.set_readiness(failure.kind.readiness());
                if previous == StoreReadiness::Connected {
                    tracing::warn!(
                        error = %failure.message,
                        hint = failure.kind.hint(),
                        "Lost connection to MongoDB; song endpoints will return 503 until it recovers",
                    );
                } else {
                    tracing::error!(
                        attempt,
                        error = %failure.message,
                        hint = failure.kind.hint(),
                        retry_in_ms = delay.as_millis() as u64,
                        "MongoDB connection attempt failed",
                    );
                }
                let wait = delay;
                delay = next_delay(delay, reconnect);
                wait
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }

    handle.set_readiness(StoreReadiness::Disconnected);
    tracing::info!("Store supervisor stopped");
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;

    /// Wait until the handle leaves `connecting`.
    async fn settled(handle: &StoreHandle) -> StoreReadiness {
        let mut rx = handle.subscribe();
        let wait = rx.wait_for(|r| *r != StoreReadiness::Connecting);
        let readiness = tokio::time::timeout(Duration::from_secs(10), wait)
            .await
            .expect("readiness did not change in time")
            .expect("handle dropped");
        *readiness
    }

    /// Replays a fixed list of check outcomes, recording when each call
    /// happened and the readiness it saw. Cancels the watcher once the list
    /// runs out.
    struct ScriptedCheck {
        script: Mutex<VecDeque<Result<(), FailureKind>>>,
        calls: Mutex<Vec<(Duration, StoreReadiness)>>,
        handle: Arc<StoreHandle>,
        cancel: CancellationToken,
        start: Instant,
    }

    #[async_trait]
    impl HealthCheck for ScriptedCheck {
        async fn check(&self) -> Result<(), CheckFailure> {
            self.calls
                .lock()
                .unwrap()
                .push((self.start.elapsed(), self.handle.readiness()));
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(())) => Ok(()),
                Some(Err(kind)) => Err(CheckFailure {
                    kind,
                    message: format!("{kind:?}"),
                }),
                None => {
                    self.cancel.cancel();
                    std::future::pending().await
                }
            }
        }
    }

    /// Run the watcher over `script` with a 10 s heartbeat and the default
    /// backoff. Returns `(seconds since start, readiness seen)` per check.
    async fn run_script(script: Vec<Result<(), FailureKind>>) -> Vec<(u64, StoreReadiness)> {
        let handle = Arc::new(StoreHandle::new());
        let cancel = CancellationToken::new();
        let check = ScriptedCheck {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            handle: Arc::clone(&handle),
            cancel: cancel.clone(),
            start: Instant::now(),
        };

        watch_connection(
            &check,
            &handle,
            Duration::from_secs(10),
            &ReconnectConfig::default(),
            &cancel,
        )
        .await;

        assert_eq!(handle.readiness(), StoreReadiness::Disconnected);
        let calls = check.calls.lock().unwrap();
        calls.iter().map(|(t, r)| (t.as_secs(), *r)).collect()
    }

    #[test]
    fn operator_failures_are_faulted() {
        assert_eq!(FailureKind::MissingUri.readiness(), StoreReadiness::Faulted);
        assert_eq!(FailureKind::InvalidConfig.readiness(), StoreReadiness::Faulted);
        assert_eq!(
            FailureKind::Authentication.readiness(),
            StoreReadiness::Faulted
        );
    }

    #[test]
    fn transient_failures_are_disconnected() {
        assert_eq!(
            FailureKind::Unreachable.readiness(),
            StoreReadiness::Disconnected
        );
        assert_eq!(FailureKind::Other.readiness(), StoreReadiness::Disconnected);
    }

    #[test]
    fn hints_mention_the_uri_variable() {
        assert!(FailureKind::MissingUri.hint().contains("MONGO_URI"));
        assert!(FailureKind::Authentication.hint().contains("MONGO_URI"));
    }

    #[tokio::test]
    async fn missing_uri_marks_store_faulted_without_task() {
        let manager = ConnectionManager::start(DbConfig::default());
        let handle = manager.handle();

        assert_eq!(handle.readiness(), StoreReadiness::Faulted);
        assert!(handle.songs().is_err());
        assert!(manager.task.is_none());

        manager.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn unparseable_uri_marks_store_faulted() {
        let config = DbConfig {
            uri: Some("definitely-not-a-connection-string".into()),
            ..DbConfig::default()
        };
        let manager = ConnectionManager::start(config);
        let handle = manager.handle();

        assert_eq!(settled(&handle).await, StoreReadiness::Faulted);
        assert!(handle.songs().is_err());

        manager.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn unreachable_server_marks_store_disconnected() {
        let config = DbConfig {
            uri: Some("mongodb://127.0.0.1:1/?directConnection=true".into()),
            server_selection_timeout: Duration::from_millis(200),
            connect_timeout: Duration::from_millis(200),
            ..DbConfig::default()
        };
        let manager = ConnectionManager::start(config);
        let handle = manager.handle();

        assert_eq!(settled(&handle).await, StoreReadiness::Disconnected);
        assert!(handle.songs().is_err());

        manager.shutdown(Duration::from_secs(2)).await;
        assert_eq!(handle.readiness(), StoreReadiness::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_detects_loss_and_recovery() {
        let calls = run_script(vec![
            Ok(()),
            Err(FailureKind::Unreachable),
            Err(FailureKind::Unreachable),
            Ok(()),
            Err(FailureKind::Unreachable),
        ])
        .await;

        assert_eq!(
            calls,
            vec![
                (0, StoreReadiness::Connecting),
                // heartbeat interval while connected
                (10, StoreReadiness::Connected),
                // backoff 1 s, then 2 s
                (11, StoreReadiness::Disconnected),
                (13, StoreReadiness::Disconnected),
                (23, StoreReadiness::Connected),
                // backoff starts over at 1 s after the recovery
                (24, StoreReadiness::Disconnected),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn authentication_failure_marks_faulted_and_keeps_retrying() {
        let calls = run_script(vec![
            Ok(()),
            Err(FailureKind::Authentication),
            Err(FailureKind::Unreachable),
        ])
        .await;

        assert_eq!(
            calls,
            vec![
                (0, StoreReadiness::Connecting),
                (10, StoreReadiness::Connected),
                (11, StoreReadiness::Faulted),
                (13, StoreReadiness::Disconnected),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_capped_while_never_connected() {
        let calls = run_script(vec![Err(FailureKind::Unreachable); 7]).await;
        let times: Vec<u64> = calls.iter().map(|(t, _)| *t).collect();

        // 1, 2, 4, 8, 16, then 30 s between attempts.
        assert_eq!(times, vec![0, 1, 3, 7, 15, 31, 61, 91]);
        assert!(calls[1..]
            .iter()
            .all(|(_, r)| *r == StoreReadiness::Disconnected));
    }
}
