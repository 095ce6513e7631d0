//! Domain layer of the song management service.
//!
//! Holds the `Song` entity, request payload validation, the error taxonomy
//! and the [`store::SongStore`] port implemented by storage adapters. Nothing
//! in here performs I/O.

pub mod error;
pub mod readiness;
pub mod song;
pub mod store;
pub mod types;
