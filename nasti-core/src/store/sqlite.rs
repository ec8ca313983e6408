//! SQLite-backed snapshot of the device-local trip cache.
//!
//! The PWA shell maintains a cache database on the device: confirmed rows
//! mirrored from the backend, a pending-mutation queue of JSON payloads, and
//! the photo table. `SqliteTripCache` opens that database read-only, loads
//! and validates every row up front, and serves [`TripStore`] queries from
//! memory. Contract violations (ids that are not UUIDs, timestamps that are
//! not RFC 3339, payloads that do not parse) surface at `open`, never later.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use uuid::Uuid;

use crate::{Collection, Photo, PhotoParent, PhotoSource, ScoutingNote, Trip};

use super::TripStore;

/// Queue payload discriminator for collection edits.
const PENDING_KIND_COLLECTION: &str = "collection";

/// Queue payload discriminator for scouting-note edits.
const PENDING_KIND_SCOUTING_NOTE: &str = "scouting_note";

/// Error raised when opening or validating the cache database.
#[derive(Debug, Error)]
pub enum SqliteTripCacheError {
    /// Opening the SQLite database failed.
    #[error("failed to open trip cache at {path}: {source}")]
    OpenDatabase {
        /// Location of the cache database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A stored id was not a valid UUID.
    #[error("invalid id {value:?} in table {table}: {source}")]
    InvalidId {
        /// Table the row was read from.
        table: &'static str,
        /// The offending text value.
        value: String,
        /// Parser failure from `uuid`.
        #[source]
        source: uuid::Error,
    },
    /// A stored timestamp was not RFC 3339.
    #[error("invalid timestamp on row {id}: {source}")]
    InvalidTimestamp {
        /// Identity of the offending row.
        id: Uuid,
        /// Parser failure from `jiff`.
        #[source]
        source: jiff::Error,
    },
    /// A pending-mutation payload was not valid JSON for its entity kind.
    #[error("failed to parse pending payload for record {id}: {source}")]
    InvalidPayload {
        /// Identity of the queued record.
        id: Uuid,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A pending mutation named an entity kind this crate does not know.
    #[error("unknown entity kind {kind:?} queued for record {id}")]
    UnknownEntityKind {
        /// Identity of the queued record.
        id: Uuid,
        /// The unrecognised discriminator.
        kind: String,
    },
    /// A photo row had neither a storage path nor a local URI.
    #[error("photo {id} has no storage path and no local uri")]
    MissingPhotoSource {
        /// Identity of the photo row.
        id: Uuid,
    },
    /// Generic SQLite error while reading rows.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Read-only trip cache loaded from a device-local SQLite database.
pub struct SqliteTripCache {
    trips: Vec<Trip>,
    collections: Vec<Collection>,
    scouting_notes: Vec<ScoutingNote>,
    pending_collections: Vec<Collection>,
    pending_scouting_notes: Vec<ScoutingNote>,
    photos: Vec<Photo>,
}

impl fmt::Debug for SqliteTripCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteTripCache")
            .field("trips", &self.trips.len())
            .field("collections", &self.collections.len())
            .field("scouting_notes", &self.scouting_notes.len())
            .field("pending", &(self.pending_collections.len() + self.pending_scouting_notes.len()))
            .field("photos", &self.photos.len())
            .finish_non_exhaustive()
    }
}

impl SqliteTripCache {
    /// Open a cache database and load its contents into memory.
    pub fn open<P>(database_path: P) -> Result<Self, SqliteTripCacheError>
    where
        P: AsRef<Path>,
    {
        let database_path = database_path.as_ref();
        let connection =
            Connection::open_with_flags(database_path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
                |source| SqliteTripCacheError::OpenDatabase {
                    path: database_path.to_path_buf(),
                    source,
                },
            )?;

        let trips = load_trips(&connection)?;
        let collections = load_collections(&connection)?;
        let scouting_notes = load_scouting_notes(&connection)?;
        let (pending_collections, pending_scouting_notes) = load_pending(&connection)?;
        let photos = load_photos(&connection)?;

        Ok(Self {
            trips,
            collections,
            scouting_notes,
            pending_collections,
            pending_scouting_notes,
            photos,
        })
    }
}

impl TripStore for SqliteTripCache {
    fn trip(&self, trip_id: Uuid) -> Option<Trip> {
        self.trips.iter().find(|trip| trip.id == trip_id).cloned()
    }

    fn collections(&self, trip_id: Uuid) -> Vec<Collection> {
        filter_by_trip(&self.collections, trip_id, |record| record.trip_id)
    }

    fn pending_collections(&self, trip_id: Uuid) -> Vec<Collection> {
        filter_by_trip(&self.pending_collections, trip_id, |record| record.trip_id)
    }

    fn scouting_notes(&self, trip_id: Uuid) -> Vec<ScoutingNote> {
        filter_by_trip(&self.scouting_notes, trip_id, |record| record.trip_id)
    }

    fn pending_scouting_notes(&self, trip_id: Uuid) -> Vec<ScoutingNote> {
        filter_by_trip(&self.pending_scouting_notes, trip_id, |record| record.trip_id)
    }

    fn photos(&self) -> Vec<Photo> {
        self.photos.clone()
    }
}

fn filter_by_trip<R, F>(records: &[R], trip_id: Uuid, trip_of: F) -> Vec<R>
where
    R: Clone,
    F: Fn(&R) -> Uuid,
{
    records
        .iter()
        .filter(|record| trip_of(record) == trip_id)
        .cloned()
        .collect()
}

fn read_id(table: &'static str, value: &str) -> Result<Uuid, SqliteTripCacheError> {
    Uuid::parse_str(value).map_err(|source| SqliteTripCacheError::InvalidId {
        table,
        value: value.to_owned(),
        source,
    })
}

fn read_timestamp(id: Uuid, value: &str) -> Result<Timestamp, SqliteTripCacheError> {
    value
        .parse()
        .map_err(|source| SqliteTripCacheError::InvalidTimestamp { id, source })
}

fn load_trips(connection: &Connection) -> Result<Vec<Trip>, SqliteTripCacheError> {
    let mut statement = connection
        .prepare("SELECT id, name, description, location, created_at FROM trips ORDER BY rowid")?;
    let mut rows = statement.query([])?;
    let mut trips = Vec::new();
    while let Some(row) = rows.next()? {
        let id = read_id("trips", &row.get::<_, String>(0)?)?;
        trips.push(Trip {
            id,
            name: row.get(1)?,
            description: row.get(2)?,
            location: row.get(3)?,
            created_at: read_timestamp(id, &row.get::<_, String>(4)?)?,
        });
    }
    Ok(trips)
}

fn load_collections(connection: &Connection) -> Result<Vec<Collection>, SqliteTripCacheError> {
    let mut statement = connection.prepare(
        "SELECT id, trip_id, species_name, field_name, specimen_count, description, \
         location, created_at FROM collections ORDER BY rowid",
    )?;
    let mut rows = statement.query([])?;
    let mut collections = Vec::new();
    while let Some(row) = rows.next()? {
        let id = read_id("collections", &row.get::<_, String>(0)?)?;
        collections.push(Collection {
            id,
            trip_id: read_id("collections", &row.get::<_, String>(1)?)?,
            species_name: row.get(2)?,
            field_name: row.get(3)?,
            specimen_count: row.get(4)?,
            description: row.get(5)?,
            location: row.get(6)?,
            created_at: read_timestamp(id, &row.get::<_, String>(7)?)?,
        });
    }
    Ok(collections)
}

fn load_scouting_notes(connection: &Connection) -> Result<Vec<ScoutingNote>, SqliteTripCacheError> {
    let mut statement = connection.prepare(
        "SELECT id, trip_id, species_name, notes, location, created_at \
         FROM scouting_notes ORDER BY rowid",
    )?;
    let mut rows = statement.query([])?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        let id = read_id("scouting_notes", &row.get::<_, String>(0)?)?;
        notes.push(ScoutingNote {
            id,
            trip_id: read_id("scouting_notes", &row.get::<_, String>(1)?)?,
            species_name: row.get(2)?,
            notes: row.get(3)?,
            location: row.get(4)?,
            created_at: read_timestamp(id, &row.get::<_, String>(5)?)?,
        });
    }
    Ok(notes)
}

/// Load the pending-mutation queue.
///
/// The queue is keyed by record id, so each record appears at most once and
/// always carries its most recent local edit. Payloads are the JSON
/// serialisation of the record they will eventually write.
fn load_pending(
    connection: &Connection,
) -> Result<(Vec<Collection>, Vec<ScoutingNote>), SqliteTripCacheError> {
    let mut statement = connection.prepare(
        "SELECT id, entity_kind, payload FROM pending_mutations ORDER BY queued_at, rowid",
    )?;
    let mut rows = statement.query([])?;
    let mut collections = Vec::new();
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        let id = read_id("pending_mutations", &row.get::<_, String>(0)?)?;
        let kind: String = row.get(1)?;
        let payload: String = row.get(2)?;
        match kind.as_str() {
            PENDING_KIND_COLLECTION => {
                let record: Collection = serde_json::from_str(&payload)
                    .map_err(|source| SqliteTripCacheError::InvalidPayload { id, source })?;
                collections.push(record);
            }
            PENDING_KIND_SCOUTING_NOTE => {
                let record: ScoutingNote = serde_json::from_str(&payload)
                    .map_err(|source| SqliteTripCacheError::InvalidPayload { id, source })?;
                notes.push(record);
            }
            _ => return Err(SqliteTripCacheError::UnknownEntityKind { id, kind }),
        }
    }
    Ok((collections, notes))
}

fn load_photos(connection: &Connection) -> Result<Vec<Photo>, SqliteTripCacheError> {
    let mut statement = connection.prepare(
        "SELECT id, collection_id, scouting_notes_id, caption, storage_path, local_uri \
         FROM photos ORDER BY rowid",
    )?;
    let mut rows = statement.query([])?;
    let mut photos = Vec::new();
    while let Some(row) = rows.next()? {
        let id = read_id("photos", &row.get::<_, String>(0)?)?;
        let collection_id: Option<String> = row.get(1)?;
        let scouting_notes_id: Option<String> = row.get(2)?;
        let parent = match (collection_id, scouting_notes_id) {
            (Some(value), _) => Some(PhotoParent::Collection(read_id("photos", &value)?)),
            (None, Some(value)) => Some(PhotoParent::ScoutingNote(read_id("photos", &value)?)),
            (None, None) => None,
        };
        let storage_path: Option<String> = row.get(4)?;
        let local_uri: Option<String> = row.get(5)?;
        // An uploaded photo keeps its storage path even if the local copy
        // still exists; the upload wins.
        let source = match (storage_path, local_uri) {
            (Some(storage_path), _) => PhotoSource::Stored { storage_path },
            (None, Some(local_uri)) => PhotoSource::Queued { local_uri },
            (None, None) => return Err(SqliteTripCacheError::MissingPhotoSource { id }),
        };
        photos.push(Photo {
            id,
            parent,
            caption: row.get(3)?,
            source,
        });
    }
    Ok(photos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        TripCacheFixture, collection, photo_for, sample_trip, scouting_note, write_trip_cache,
    };
    use crate::TripStore;
    use rstest::{fixture, rstest};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[fixture]
    fn cache_path() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("trip-cache.db");
        (dir, path)
    }

    fn populated_fixture() -> TripCacheFixture {
        let trip = sample_trip();
        let confirmed = collection(&trip, "confirmed", Some("POINT(1 2)"));
        let mut edited = confirmed.clone();
        edited.description = Some("recounted".to_owned());
        let note = scouting_note(&trip, "mallee stand", None);
        let photo = photo_for(crate::PhotoParent::Collection(confirmed.id), Some("habit"));

        TripCacheFixture {
            trips: vec![trip],
            collections: vec![confirmed],
            scouting_notes: vec![note],
            pending_collections: vec![edited],
            pending_scouting_notes: vec![],
            photos: vec![photo],
        }
    }

    #[rstest]
    fn open_loads_and_serves_a_populated_cache(
        #[from(cache_path)] (_dir, path): (TempDir, PathBuf),
    ) {
        let fixture = populated_fixture();
        write_trip_cache(&path, &fixture).expect("persist cache");

        let cache = SqliteTripCache::open(&path).expect("open cache");
        let trip_id = fixture.trips[0].id;

        assert_eq!(cache.trip(trip_id), Some(fixture.trips[0].clone()));
        assert_eq!(cache.collections(trip_id), fixture.collections);
        assert_eq!(cache.pending_collections(trip_id), fixture.pending_collections);
        assert_eq!(cache.scouting_notes(trip_id), fixture.scouting_notes);
        assert_eq!(cache.photos(), fixture.photos);
    }

    #[rstest]
    fn trip_details_shadows_with_the_queued_edit(
        #[from(cache_path)] (_dir, path): (TempDir, PathBuf),
    ) {
        let fixture = populated_fixture();
        write_trip_cache(&path, &fixture).expect("persist cache");

        let cache = SqliteTripCache::open(&path).expect("open cache");
        let view = cache
            .trip_details(fixture.trips[0].id)
            .expect("trip is cached");

        assert_eq!(view.collections.len(), 1);
        assert_eq!(view.collections[0].record, fixture.pending_collections[0]);
        assert!(view.collections[0].provenance.is_pending());
        assert_eq!(view.collections[0].photos, fixture.photos);
        assert_eq!(view.scouting_notes.len(), 1);
    }

    #[rstest]
    fn queries_scoped_to_other_trips_return_nothing(
        #[from(cache_path)] (_dir, path): (TempDir, PathBuf),
    ) {
        write_trip_cache(&path, &populated_fixture()).expect("persist cache");

        let cache = SqliteTripCache::open(&path).expect("open cache");
        let other = Uuid::new_v4();

        assert_eq!(cache.trip(other), None);
        assert!(cache.collections(other).is_empty());
        assert!(cache.pending_collections(other).is_empty());
    }

    #[rstest]
    fn open_fails_for_a_missing_database() {
        let error =
            SqliteTripCache::open("/non-existent/trip-cache.db").expect_err("missing file");
        assert!(matches!(error, SqliteTripCacheError::OpenDatabase { .. }));
    }

    #[rstest]
    fn open_rejects_a_malformed_id(#[from(cache_path)] (_dir, path): (TempDir, PathBuf)) {
        write_trip_cache(&path, &TripCacheFixture::default()).expect("persist cache");
        let connection = Connection::open(&path).expect("reopen writable");
        connection
            .execute(
                "INSERT INTO trips (id, name, description, location, created_at) \
                 VALUES ('not-a-uuid', 'x', NULL, NULL, '2024-08-01T00:00:00Z')",
                [],
            )
            .expect("insert row");
        drop(connection);

        let error = SqliteTripCache::open(&path).expect_err("bad id");
        assert!(matches!(
            error,
            SqliteTripCacheError::InvalidId { table: "trips", .. }
        ));
    }

    #[rstest]
    fn open_rejects_an_unknown_entity_kind(
        #[from(cache_path)] (_dir, path): (TempDir, PathBuf),
    ) {
        write_trip_cache(&path, &TripCacheFixture::default()).expect("persist cache");
        let connection = Connection::open(&path).expect("reopen writable");
        connection
            .execute(
                "INSERT INTO pending_mutations (id, trip_id, entity_kind, payload, queued_at) \
                 VALUES (?1, ?2, 'photo_album', '{}', '2024-08-01T00:00:00Z')",
                [Uuid::new_v4().to_string(), Uuid::new_v4().to_string()],
            )
            .expect("insert row");
        drop(connection);

        let error = SqliteTripCache::open(&path).expect_err("unknown kind");
        assert!(matches!(
            error,
            SqliteTripCacheError::UnknownEntityKind { kind, .. } if kind == "photo_album"
        ));
    }

    #[rstest]
    fn open_rejects_a_corrupt_pending_payload(
        #[from(cache_path)] (_dir, path): (TempDir, PathBuf),
    ) {
        write_trip_cache(&path, &TripCacheFixture::default()).expect("persist cache");
        let connection = Connection::open(&path).expect("reopen writable");
        connection
            .execute(
                "INSERT INTO pending_mutations (id, trip_id, entity_kind, payload, queued_at) \
                 VALUES (?1, ?2, 'collection', 'not-json', '2024-08-01T00:00:00Z')",
                [Uuid::new_v4().to_string(), Uuid::new_v4().to_string()],
            )
            .expect("insert row");
        drop(connection);

        let error = SqliteTripCache::open(&path).expect_err("corrupt payload");
        assert!(matches!(error, SqliteTripCacheError::InvalidPayload { .. }));
    }

    #[rstest]
    fn open_rejects_a_photo_with_no_source(
        #[from(cache_path)] (_dir, path): (TempDir, PathBuf),
    ) {
        write_trip_cache(&path, &TripCacheFixture::default()).expect("persist cache");
        let connection = Connection::open(&path).expect("reopen writable");
        connection
            .execute(
                "INSERT INTO photos (id, collection_id, scouting_notes_id, caption, \
                 storage_path, local_uri) VALUES (?1, NULL, NULL, NULL, NULL, NULL)",
                [Uuid::new_v4().to_string()],
            )
            .expect("insert row");
        drop(connection);

        let error = SqliteTripCache::open(&path).expect_err("sourceless photo");
        assert!(matches!(error, SqliteTripCacheError::MissingPhotoSource { .. }));
    }
}
