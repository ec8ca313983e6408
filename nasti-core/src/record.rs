//! Field data records captured on collection trips.
//!
//! Records use client-generated UUIDs so an entity keeps one identity from
//! the moment it is created on the device through to server confirmation.
//! The raw `location` column is carried verbatim; decoding happens when a
//! trip view is assembled.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a record reflects the server's confirmed state or a local edit
/// still waiting to sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// The record matches the last state the server confirmed.
    Confirmed,
    /// The record carries a local edit the server has not yet acknowledged.
    Pending,
}

impl Provenance {
    /// True for records still waiting on server confirmation.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// A record that belongs to a trip and may carry a raw location.
///
/// The reconciler is generic over this seam; anything with an identity and
/// an optional geometry column can be merged into a trip view.
pub trait FieldRecord {
    /// Client-generated identity, shared between the pending and confirmed
    /// copies of the same entity.
    fn id(&self) -> Uuid;

    /// Raw geometry text as persisted, if any.
    fn raw_location(&self) -> Option<&str>;
}

/// A seed or specimen collection recorded in the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Client-generated identity.
    pub id: Uuid,
    /// Trip this collection belongs to.
    pub trip_id: Uuid,
    /// Scientific name of the collected species, when identified.
    pub species_name: Option<String>,
    /// Collector's working name when the species is not yet identified.
    pub field_name: Option<String>,
    /// Number of specimens taken.
    pub specimen_count: Option<u32>,
    /// Free-form notes about the collection.
    pub description: Option<String>,
    /// Raw geometry text, either `POINT(...)` or hex-encoded WKB.
    pub location: Option<String>,
    /// Device-side creation time.
    pub created_at: Timestamp,
}

impl Collection {
    /// Construct an empty collection for the given trip.
    #[must_use]
    pub const fn new(id: Uuid, trip_id: Uuid, created_at: Timestamp) -> Self {
        Self {
            id,
            trip_id,
            species_name: None,
            field_name: None,
            specimen_count: None,
            description: None,
            location: None,
            created_at,
        }
    }
}

impl FieldRecord for Collection {
    fn id(&self) -> Uuid {
        self.id
    }

    fn raw_location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

/// A sighting noted for a possible future collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutingNote {
    /// Client-generated identity.
    pub id: Uuid,
    /// Trip this note belongs to.
    pub trip_id: Uuid,
    /// Scientific name of the sighted species, when identified.
    pub species_name: Option<String>,
    /// Observations recorded at the site.
    pub notes: Option<String>,
    /// Raw geometry text, either `POINT(...)` or hex-encoded WKB.
    pub location: Option<String>,
    /// Device-side creation time.
    pub created_at: Timestamp,
}

impl ScoutingNote {
    /// Construct an empty scouting note for the given trip.
    #[must_use]
    pub const fn new(id: Uuid, trip_id: Uuid, created_at: Timestamp) -> Self {
        Self {
            id,
            trip_id,
            species_name: None,
            notes: None,
            location: None,
            created_at,
        }
    }
}

impl FieldRecord for ScoutingNote {
    fn id(&self) -> Uuid {
        self.id
    }

    fn raw_location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}
