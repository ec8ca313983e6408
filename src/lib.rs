//! Facade crate for the NASTI offline trip-data engine.
//!
//! This crate re-exports the core domain types and exposes the optional
//! SQLite-backed cache store behind a feature flag.

#![forbid(unsafe_code)]

pub use nasti_core::{
    Collection, FieldRecord, LocationParseError, Photo, PhotoIndex, PhotoParent, PhotoSource,
    Provenance, Reconciled, ScoutingNote, Trip, TripDetailsView, TripStore, decode_location,
    reconcile,
};

#[cfg(feature = "store-sqlite")]
pub use nasti_core::{SqliteTripCache, SqliteTripCacheError};
