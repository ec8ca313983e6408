//! Data access seam for the device-local trip cache.
//!
//! The `TripStore` trait defines read access to the inputs a trip view is
//! assembled from: server-confirmed records, the pending-mutation queue, and
//! the flat photo list. Implementations own fetching and freshness; the
//! reconciler only ever sees resolved, in-memory data.

use uuid::Uuid;

use crate::{Collection, Photo, ScoutingNote, Trip, TripDetailsView};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteTripCache, SqliteTripCacheError};

/// Read-only access to one trip's records and the cache-wide photo list.
///
/// Query methods are infallible; implementations surface failures when the
/// store is opened, not per query. Pending lookups must return the most
/// recent local edit exactly once per record id.
///
/// # Examples
///
/// ```rust
/// use nasti_core::{Collection, Photo, ScoutingNote, Trip, TripStore};
/// use uuid::Uuid;
///
/// struct SingleTripStore {
///     trip: Trip,
///     collections: Vec<Collection>,
/// }
///
/// impl TripStore for SingleTripStore {
///     fn trip(&self, trip_id: Uuid) -> Option<Trip> {
///         (self.trip.id == trip_id).then(|| self.trip.clone())
///     }
///
///     fn collections(&self, trip_id: Uuid) -> Vec<Collection> {
///         self.collections
///             .iter()
///             .filter(|c| c.trip_id == trip_id)
///             .cloned()
///             .collect()
///     }
///
///     fn pending_collections(&self, _trip_id: Uuid) -> Vec<Collection> {
///         Vec::new()
///     }
///
///     fn scouting_notes(&self, _trip_id: Uuid) -> Vec<ScoutingNote> {
///         Vec::new()
///     }
///
///     fn pending_scouting_notes(&self, _trip_id: Uuid) -> Vec<ScoutingNote> {
///         Vec::new()
///     }
///
///     fn photos(&self) -> Vec<Photo> {
///         Vec::new()
///     }
/// }
/// ```
pub trait TripStore {
    /// Look up a trip by id.
    fn trip(&self, trip_id: Uuid) -> Option<Trip>;

    /// Server-confirmed collections belonging to the trip.
    fn collections(&self, trip_id: Uuid) -> Vec<Collection>;

    /// Locally queued collection edits targeting the trip.
    fn pending_collections(&self, trip_id: Uuid) -> Vec<Collection>;

    /// Server-confirmed scouting notes belonging to the trip.
    fn scouting_notes(&self, trip_id: Uuid) -> Vec<ScoutingNote>;

    /// Locally queued scouting-note edits targeting the trip.
    fn pending_scouting_notes(&self, trip_id: Uuid) -> Vec<ScoutingNote>;

    /// Every photo in the cache, uploaded and queued alike, unfiltered.
    fn photos(&self) -> Vec<Photo>;

    /// Assemble the merged display view for a trip, or `None` when the trip
    /// is not in the cache.
    fn trip_details(&self, trip_id: Uuid) -> Option<TripDetailsView> {
        let trip = self.trip(trip_id)?;
        Some(TripDetailsView::assemble(
            trip,
            &self.collections(trip_id),
            &self.pending_collections(trip_id),
            &self.scouting_notes(trip_id),
            &self.pending_scouting_notes(trip_id),
            &self.photos(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::TripStore;
    use crate::test_support::{MemoryTripStore, collection, sample_trip};
    use rstest::rstest;
    use uuid::Uuid;

    #[rstest]
    fn trip_details_merges_store_inputs() {
        let trip = sample_trip();
        let server = collection(&trip, "confirmed", Some("POINT(1 2)"));
        let mut edited = server.clone();
        edited.description = Some("revised count".to_owned());

        let mut store = MemoryTripStore::with_trip(trip.clone());
        store.push_collection(server);
        store.push_pending_collection(edited.clone());

        let view = store.trip_details(trip.id).expect("trip is cached");
        assert_eq!(view.collections.len(), 1);
        assert_eq!(view.collections[0].record, edited);
    }

    #[rstest]
    fn trip_details_is_none_for_unknown_trip() {
        let store = MemoryTripStore::default();
        assert_eq!(store.trip_details(Uuid::new_v4()), None);
    }
}
