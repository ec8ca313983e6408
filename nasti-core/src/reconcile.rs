//! Merge server-confirmed and locally pending records into one trip view.
//!
//! A trip's children arrive from two places: the last server-confirmed
//! snapshot, and edits queued on the device that the server has not yet
//! acknowledged. The merge is identity-based with pending records taking
//! precedence; no timestamps are compared. A record being edited on this
//! device shadows the server copy even if another device has since written a
//! chronologically newer one.
//!
//! The whole pass is a pure in-memory transform: deterministic for fixed
//! inputs, safe to recompute on every input change, and free of I/O.

use geo::Coord;
use log::warn;
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    Collection, FieldRecord, Photo, PhotoIndex, Provenance, ScoutingNote, Trip, decode_location,
};

/// A record decorated for display in a trip view.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<R> {
    /// The merged record; pending values when a local edit shadows the
    /// server copy.
    pub record: R,
    /// Whether the record came from the pending queue or the server.
    pub provenance: Provenance,
    /// Decoded position, absent when the record has no parseable location.
    pub coordinate: Option<Coord<f64>>,
    /// Photos attached to the record; empty when it has none.
    pub photos: Vec<Photo>,
}

/// Merge one record kind's server and pending copies, pending wins.
///
/// The output lists every pending record first (in input order), then every
/// server record whose id is not shadowed by a pending edit. Each entry is
/// decorated with its decoded coordinate and its photos taken from `photos`.
/// Records whose location fails to decode keep their place in the view with
/// no coordinate; the failure is logged at `warn`.
///
/// # Examples
/// ```
/// use jiff::Timestamp;
/// use nasti_core::{Collection, PhotoIndex, Provenance, reconcile};
/// use uuid::Uuid;
///
/// let id = Uuid::new_v4();
/// let created = Timestamp::new(1_722_470_400, 0).unwrap();
/// let server = Collection::new(id, Uuid::new_v4(), created);
/// let mut edited = server.clone();
/// edited.species_name = Some("Eucalyptus wandoo".into());
///
/// let view = reconcile(&[server], &[edited.clone()], &mut PhotoIndex::default());
/// assert_eq!(view.len(), 1);
/// assert_eq!(view[0].record, edited);
/// assert_eq!(view[0].provenance, Provenance::Pending);
/// ```
pub fn reconcile<R>(server: &[R], pending: &[R], photos: &mut PhotoIndex) -> Vec<Reconciled<R>>
where
    R: FieldRecord + Clone,
{
    let pending_ids: HashSet<Uuid> = pending.iter().map(FieldRecord::id).collect();

    let mut view = Vec::with_capacity(pending.len() + server.len());
    for record in pending {
        view.push(decorate(record, Provenance::Pending, photos));
    }
    for record in server {
        if pending_ids.contains(&record.id()) {
            continue;
        }
        view.push(decorate(record, Provenance::Confirmed, photos));
    }
    view
}

fn decorate<R>(record: &R, provenance: Provenance, photos: &mut PhotoIndex) -> Reconciled<R>
where
    R: FieldRecord + Clone,
{
    Reconciled {
        coordinate: display_coordinate(record.id(), record.raw_location()),
        photos: photos.take(record.id()),
        provenance,
        record: record.clone(),
    }
}

/// Decode a raw location for display.
///
/// Absent and malformed input both yield `None`; malformed input is
/// additionally logged. One bad geometry never fails the batch it rides in.
fn display_coordinate(id: Uuid, raw: Option<&str>) -> Option<Coord<f64>> {
    match decode_location(raw) {
        Ok(coordinate) => coordinate,
        Err(error) => {
            warn!("discarding unparseable location on record {id}: {error}");
            None
        }
    }
}

/// The merged, decorated state of one trip, ready for display.
///
/// Recomputed in full from its inputs on every change; it holds no state of
/// its own and is never incrementally mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct TripDetailsView {
    /// The trip itself.
    pub trip: Trip,
    /// The trip's own decoded reference point, if it has one.
    pub trip_coordinate: Option<Coord<f64>>,
    /// Merged collections, pending edits shadowing server copies.
    pub collections: Vec<Reconciled<Collection>>,
    /// Merged scouting notes, pending edits shadowing server copies.
    pub scouting_notes: Vec<Reconciled<ScoutingNote>>,
}

impl TripDetailsView {
    /// Assemble the display view of one trip from already-fetched inputs.
    ///
    /// `photos` is the flat cache-wide list; it is grouped once and shared
    /// across both record kinds. Empty slices are valid inputs and produce
    /// empty output lists.
    #[must_use]
    pub fn assemble(
        trip: Trip,
        server_collections: &[Collection],
        pending_collections: &[Collection],
        server_notes: &[ScoutingNote],
        pending_notes: &[ScoutingNote],
        photos: &[Photo],
    ) -> Self {
        let mut index = PhotoIndex::build(photos.iter().cloned());
        let collections = reconcile(server_collections, pending_collections, &mut index);
        let scouting_notes = reconcile(server_notes, pending_notes, &mut index);
        let trip_coordinate = display_coordinate(trip.id, trip.raw_location());
        Self {
            trip,
            trip_coordinate,
            collections,
            scouting_notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PhotoParent;
    use crate::test_support::{collection, photo_for, sample_trip, scouting_note};
    use rstest::rstest;

    #[rstest]
    fn record_without_location_keeps_place_with_empty_photos() {
        let trip = sample_trip();
        let server = vec![collection(&trip, "a", None)];

        let view = TripDetailsView::assemble(trip, &server, &[], &[], &[], &[]);

        assert_eq!(view.collections.len(), 1);
        let entry = &view.collections[0];
        assert_eq!(entry.record, server[0]);
        assert_eq!(entry.provenance, Provenance::Confirmed);
        assert_eq!(entry.coordinate, None);
        assert_eq!(entry.photos, Vec::<Photo>::new());
    }

    #[rstest]
    fn pending_edit_shadows_server_copy() {
        let trip = sample_trip();
        let server = vec![collection(&trip, "a", Some("POINT(1 2)"))];
        let mut edited = server[0].clone();
        edited.location = Some("POINT(9 9)".to_owned());

        let view = TripDetailsView::assemble(trip, &server, &[edited.clone()], &[], &[], &[]);

        assert_eq!(view.collections.len(), 1);
        let entry = &view.collections[0];
        assert_eq!(entry.record, edited);
        assert!(entry.provenance.is_pending());
        assert_eq!(entry.coordinate, Some(Coord { x: 9.0, y: 9.0 }));
    }

    #[rstest]
    fn photos_attach_by_parent_id() {
        let trip = sample_trip();
        let server = vec![collection(&trip, "a", None)];
        let photo = photo_for(PhotoParent::Collection(server[0].id), Some("x"));

        let view =
            TripDetailsView::assemble(trip, &server, &[], &[], &[], &[photo.clone()]);

        assert_eq!(view.collections[0].photos, vec![photo]);
    }

    #[rstest]
    fn malformed_location_is_swallowed_per_record() {
        let trip = sample_trip();
        let server = vec![
            collection(&trip, "good", Some("POINT(115.86 -31.95)")),
            collection(&trip, "bad", Some("not hex and not a point")),
        ];

        let view = TripDetailsView::assemble(trip, &server, &[], &[], &[], &[]);

        assert_eq!(view.collections.len(), 2);
        assert_eq!(
            view.collections[0].coordinate,
            Some(Coord {
                x: 115.86,
                y: -31.95
            })
        );
        assert_eq!(view.collections[1].coordinate, None);
    }

    #[rstest]
    fn pending_only_records_appear_first() {
        let trip = sample_trip();
        let server = vec![collection(&trip, "server", None)];
        let fresh = collection(&trip, "fresh", None);

        let merged = reconcile(&server, &[fresh.clone()], &mut PhotoIndex::default());

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].record, fresh);
        assert_eq!(merged[1].record, server[0]);
    }

    #[rstest]
    fn assemble_is_idempotent() {
        let trip = sample_trip();
        let server = vec![collection(&trip, "a", Some("POINT(1 2)"))];
        let pending = vec![collection(&trip, "b", None)];
        let notes = vec![scouting_note(&trip, "mallee stand", None)];
        let photos = vec![photo_for(PhotoParent::Collection(server[0].id), None)];

        let first = TripDetailsView::assemble(
            trip.clone(),
            &server,
            &pending,
            &notes,
            &[],
            &photos,
        );
        let second = TripDetailsView::assemble(trip, &server, &pending, &notes, &[], &photos);

        assert_eq!(first, second);
    }

    #[rstest]
    fn trip_location_decodes_like_any_record() {
        let mut trip = sample_trip();
        trip.location = Some("POINT(121.4 -30.7)".to_owned());

        let view = TripDetailsView::assemble(trip, &[], &[], &[], &[], &[]);

        assert_eq!(view.trip_coordinate, Some(Coord { x: 121.4, y: -30.7 }));
        assert!(view.collections.is_empty());
        assert!(view.scouting_notes.is_empty());
    }
}
