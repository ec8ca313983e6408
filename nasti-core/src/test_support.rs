//! Test-only fixtures, an in-memory `TripStore`, and cache-file writers used
//! by unit and behaviour tests.

use jiff::Timestamp;
use uuid::Uuid;

use crate::{Collection, Photo, PhotoParent, PhotoSource, ScoutingNote, Trip, TripStore};

/// In-memory `TripStore` backed by plain vectors.
///
/// The store performs linear scans and is intended only for small fixtures.
#[derive(Default, Debug)]
pub struct MemoryTripStore {
    trips: Vec<Trip>,
    collections: Vec<Collection>,
    scouting_notes: Vec<ScoutingNote>,
    pending_collections: Vec<Collection>,
    pending_scouting_notes: Vec<ScoutingNote>,
    photos: Vec<Photo>,
}

impl MemoryTripStore {
    /// Create a store containing a single trip and nothing else.
    #[must_use]
    pub fn with_trip(trip: Trip) -> Self {
        Self {
            trips: vec![trip],
            ..Self::default()
        }
    }

    /// Add a server-confirmed collection.
    pub fn push_collection(&mut self, record: Collection) {
        self.collections.push(record);
    }

    /// Add a queued collection edit.
    pub fn push_pending_collection(&mut self, record: Collection) {
        self.pending_collections.push(record);
    }

    /// Add a server-confirmed scouting note.
    pub fn push_scouting_note(&mut self, record: ScoutingNote) {
        self.scouting_notes.push(record);
    }

    /// Add a queued scouting-note edit.
    pub fn push_pending_scouting_note(&mut self, record: ScoutingNote) {
        self.pending_scouting_notes.push(record);
    }

    /// Add a photo to the cache-wide list.
    pub fn push_photo(&mut self, photo: Photo) {
        self.photos.push(photo);
    }
}

impl TripStore for MemoryTripStore {
    fn trip(&self, trip_id: Uuid) -> Option<Trip> {
        self.trips.iter().find(|trip| trip.id == trip_id).cloned()
    }

    fn collections(&self, trip_id: Uuid) -> Vec<Collection> {
        self.collections
            .iter()
            .filter(|record| record.trip_id == trip_id)
            .cloned()
            .collect()
    }

    fn pending_collections(&self, trip_id: Uuid) -> Vec<Collection> {
        self.pending_collections
            .iter()
            .filter(|record| record.trip_id == trip_id)
            .cloned()
            .collect()
    }

    fn scouting_notes(&self, trip_id: Uuid) -> Vec<ScoutingNote> {
        self.scouting_notes
            .iter()
            .filter(|record| record.trip_id == trip_id)
            .cloned()
            .collect()
    }

    fn pending_scouting_notes(&self, trip_id: Uuid) -> Vec<ScoutingNote> {
        self.pending_scouting_notes
            .iter()
            .filter(|record| record.trip_id == trip_id)
            .cloned()
            .collect()
    }

    fn photos(&self) -> Vec<Photo> {
        self.photos.clone()
    }
}

/// Fixed creation time shared by fixtures, 2024-08-01T00:00:00Z.
#[must_use]
pub fn fixture_timestamp() -> Timestamp {
    Timestamp::new(1_722_470_400, 0).expect("fixture timestamp in range")
}

/// A trip fixture with a fresh id and no location.
#[must_use]
pub fn sample_trip() -> Trip {
    Trip::new(
        Uuid::new_v4(),
        "Goldfields survey".to_owned(),
        fixture_timestamp(),
    )
}

/// A collection fixture for the given trip.
#[must_use]
pub fn collection(trip: &Trip, field_name: &str, location: Option<&str>) -> Collection {
    let mut record = Collection::new(Uuid::new_v4(), trip.id, fixture_timestamp());
    record.field_name = Some(field_name.to_owned());
    record.location = location.map(str::to_owned);
    record
}

/// A scouting-note fixture for the given trip.
#[must_use]
pub fn scouting_note(trip: &Trip, notes: &str, location: Option<&str>) -> ScoutingNote {
    let mut record = ScoutingNote::new(Uuid::new_v4(), trip.id, fixture_timestamp());
    record.notes = Some(notes.to_owned());
    record.location = location.map(str::to_owned);
    record
}

/// A queued photo fixture attached to the given parent.
#[must_use]
pub fn photo_for(parent: PhotoParent, caption: Option<&str>) -> Photo {
    Photo {
        id: Uuid::new_v4(),
        parent: Some(parent),
        caption: caption.map(str::to_owned),
        source: PhotoSource::Queued {
            local_uri: "file:///captures/pending.jpg".to_owned(),
        },
    }
}

/// Hex-encode `(lon, lat)` as a little-endian extended-WKB point with
/// SRID 4326, matching what the backing spatial database stores.
#[must_use]
pub fn wkb_point_hex(lon: f64, lat: f64) -> String {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(1_u8);
    bytes.extend_from_slice(&0x2000_0001_u32.to_le_bytes());
    bytes.extend_from_slice(&4326_u32.to_le_bytes());
    bytes.extend_from_slice(&lon.to_le_bytes());
    bytes.extend_from_slice(&lat.to_le_bytes());
    hex::encode_upper(bytes)
}

#[cfg(feature = "store-sqlite")]
pub use sqlite_fixture::{TripCacheFixture, write_trip_cache};

#[cfg(feature = "store-sqlite")]
mod sqlite_fixture {
    use std::path::Path;

    use rusqlite::{Connection, params};

    use crate::{Collection, Photo, PhotoParent, PhotoSource, ScoutingNote, Trip};

    /// The full contents of a trip cache database to persist for a test.
    #[derive(Debug, Default, Clone)]
    pub struct TripCacheFixture {
        /// Rows for the `trips` table.
        pub trips: Vec<Trip>,
        /// Rows for the `collections` table.
        pub collections: Vec<Collection>,
        /// Rows for the `scouting_notes` table.
        pub scouting_notes: Vec<ScoutingNote>,
        /// Queued collection edits for `pending_mutations`.
        pub pending_collections: Vec<Collection>,
        /// Queued scouting-note edits for `pending_mutations`.
        pub pending_scouting_notes: Vec<ScoutingNote>,
        /// Rows for the `photos` table.
        pub photos: Vec<Photo>,
    }

    fn json_error(source: serde_json::Error) -> rusqlite::Error {
        rusqlite::Error::ToSqlConversionFailure(Box::new(source))
    }

    /// Persist a fixture cache database at `path`, creating the schema and
    /// truncating nothing (the file is expected not to exist yet).
    pub fn write_trip_cache(path: &Path, fixture: &TripCacheFixture) -> rusqlite::Result<()> {
        let connection = Connection::open(path)?;
        connection.execute_batch(
            "CREATE TABLE trips (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                location TEXT,
                created_at TEXT NOT NULL
            );
            CREATE TABLE collections (
                id TEXT PRIMARY KEY,
                trip_id TEXT NOT NULL,
                species_name TEXT,
                field_name TEXT,
                specimen_count INTEGER,
                description TEXT,
                location TEXT,
                created_at TEXT NOT NULL
            );
            CREATE TABLE scouting_notes (
                id TEXT PRIMARY KEY,
                trip_id TEXT NOT NULL,
                species_name TEXT,
                notes TEXT,
                location TEXT,
                created_at TEXT NOT NULL
            );
            CREATE TABLE pending_mutations (
                id TEXT PRIMARY KEY,
                trip_id TEXT NOT NULL,
                entity_kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                queued_at TEXT NOT NULL
            );
            CREATE TABLE photos (
                id TEXT PRIMARY KEY,
                collection_id TEXT,
                scouting_notes_id TEXT,
                caption TEXT,
                storage_path TEXT,
                local_uri TEXT
            );",
        )?;

        for trip in &fixture.trips {
            connection.execute(
                "INSERT INTO trips (id, name, description, location, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    trip.id.to_string(),
                    trip.name,
                    trip.description,
                    trip.location,
                    trip.created_at.to_string(),
                ],
            )?;
        }

        for record in &fixture.collections {
            connection.execute(
                "INSERT INTO collections (id, trip_id, species_name, field_name, \
                 specimen_count, description, location, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.to_string(),
                    record.trip_id.to_string(),
                    record.species_name,
                    record.field_name,
                    record.specimen_count,
                    record.description,
                    record.location,
                    record.created_at.to_string(),
                ],
            )?;
        }

        for record in &fixture.scouting_notes {
            connection.execute(
                "INSERT INTO scouting_notes (id, trip_id, species_name, notes, location, \
                 created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.to_string(),
                    record.trip_id.to_string(),
                    record.species_name,
                    record.notes,
                    record.location,
                    record.created_at.to_string(),
                ],
            )?;
        }

        for record in &fixture.pending_collections {
            let payload = serde_json::to_string(record).map_err(json_error)?;
            connection.execute(
                "INSERT INTO pending_mutations (id, trip_id, entity_kind, payload, queued_at) \
                 VALUES (?1, ?2, 'collection', ?3, ?4)",
                params![
                    record.id.to_string(),
                    record.trip_id.to_string(),
                    payload,
                    record.created_at.to_string(),
                ],
            )?;
        }

        for record in &fixture.pending_scouting_notes {
            let payload = serde_json::to_string(record).map_err(json_error)?;
            connection.execute(
                "INSERT INTO pending_mutations (id, trip_id, entity_kind, payload, queued_at) \
                 VALUES (?1, ?2, 'scouting_note', ?3, ?4)",
                params![
                    record.id.to_string(),
                    record.trip_id.to_string(),
                    payload,
                    record.created_at.to_string(),
                ],
            )?;
        }

        for photo in &fixture.photos {
            let (collection_id, scouting_notes_id) = match photo.parent {
                Some(PhotoParent::Collection(id)) => (Some(id.to_string()), None),
                Some(PhotoParent::ScoutingNote(id)) => (None, Some(id.to_string())),
                None => (None, None),
            };
            let (storage_path, local_uri) = match &photo.source {
                PhotoSource::Stored { storage_path } => (Some(storage_path.clone()), None),
                PhotoSource::Queued { local_uri } => (None, Some(local_uri.clone())),
            };
            connection.execute(
                "INSERT INTO photos (id, collection_id, scouting_notes_id, caption, \
                 storage_path, local_uri) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    photo.id.to_string(),
                    collection_id,
                    scouting_notes_id,
                    photo.caption,
                    storage_path,
                    local_uri,
                ],
            )?;
        }

        Ok(())
    }
}
