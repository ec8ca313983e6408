//! Offline trip-data core for the NASTI field collection app.
//!
//! Field botanists record collections, scouting notes and photos on trips,
//! often far from coverage. The device keeps two copies of the data: the last
//! server-confirmed snapshot and a queue of pending local edits. This crate
//! owns the two pieces of derived state the app is built on:
//!
//! - [`decode_location`] parses the raw geometry column every record carries
//!   (well-known text or hex-encoded extended WKB) into a WGS84
//!   [`geo::Coord`].
//! - [`reconcile`] and [`TripDetailsView`] merge server-confirmed and pending
//!   records for a trip — pending edits shadow their server copies by id —
//!   and decorate each record with its coordinate and photos.
//!
//! Both are pure, deterministic transforms over already-fetched data. The
//! [`TripStore`] trait pins down the cache contract they read from, and the
//! optional SQLite store (feature `store-sqlite`) implements it over the
//! device-local cache database.

#![forbid(unsafe_code)]

mod location;
mod photo;
mod reconcile;
mod record;
mod store;
mod trip;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use location::{LocationParseError, decode_location};
pub use photo::{Photo, PhotoIndex, PhotoParent, PhotoSource};
pub use reconcile::{Reconciled, TripDetailsView, reconcile};
pub use record::{Collection, FieldRecord, Provenance, ScoutingNote};
pub use store::TripStore;
#[cfg(feature = "store-sqlite")]
pub use store::{SqliteTripCache, SqliteTripCacheError};
pub use trip::Trip;
