//! The top-level grouping entity for a field excursion.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FieldRecord;

/// A field excursion grouping collections and scouting notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// Client-generated identity.
    pub id: Uuid,
    /// Display name chosen by the organisation.
    pub name: String,
    /// Free-form description of the excursion.
    pub description: Option<String>,
    /// Raw geometry text for the trip's own reference point, if set.
    pub location: Option<String>,
    /// Device-side creation time.
    pub created_at: Timestamp,
}

impl Trip {
    /// Construct a trip with the given display name.
    #[must_use]
    pub const fn new(id: Uuid, name: String, created_at: Timestamp) -> Self {
        Self {
            id,
            name,
            description: None,
            location: None,
            created_at,
        }
    }
}

impl FieldRecord for Trip {
    fn id(&self) -> Uuid {
        self.id
    }

    fn raw_location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn trip_exposes_raw_location() {
        let mut trip = Trip::new(
            Uuid::nil(),
            "Goldfields survey".to_owned(),
            Timestamp::new(1_722_470_400, 0).unwrap(),
        );
        assert_eq!(trip.raw_location(), None);
        trip.location = Some("POINT(121.4 -30.7)".to_owned());
        assert_eq!(trip.raw_location(), Some("POINT(121.4 -30.7)"));
    }
}
