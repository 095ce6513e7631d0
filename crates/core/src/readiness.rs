//! Store readiness as seen by request handlers.

use std::fmt;

use serde::Serialize;

/// Health of the data-store connection.
///
/// Written by the connection supervisor only; everything else reads it.
/// Handlers treat [`StoreReadiness::Connected`] as the only state in which
/// touching the store is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreReadiness {
    /// Startup, first attempt not finished yet.
    Connecting,
    Connected,
    /// Was reachable (or may become reachable); retrying in the background.
    Disconnected,
    /// Will not recover without operator action: missing URI, bad
    /// credentials, unparseable connection string.
    Faulted,
}

impl StoreReadiness {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Faulted => "faulted",
        }
    }
}

impl fmt::Display for StoreReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
