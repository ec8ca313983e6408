//! Photo attachments and their parent-entity index.
//!
//! Photos arrive as one flat, cache-wide list mixing uploaded attachments
//! with queued ones still waiting on the device. [`PhotoIndex`] groups that
//! list by parent entity so a trip view can hand each record its own photos.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Foreign key tying a photo to the record it documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhotoParent {
    /// The photo documents a collection.
    Collection(Uuid),
    /// The photo documents a scouting note.
    ScoutingNote(Uuid),
}

impl PhotoParent {
    /// Identity of the parent record, whichever kind it is.
    #[must_use]
    pub const fn entity_id(self) -> Uuid {
        match self {
            Self::Collection(id) | Self::ScoutingNote(id) => id,
        }
    }
}

/// Where a photo's bytes currently live.
///
/// A stored photo has been uploaded and is addressed by its object-store
/// path; a queued photo still only exists on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhotoSource {
    /// Uploaded and confirmed by the backend.
    Stored {
        /// Object-store path of the uploaded file.
        storage_path: String,
    },
    /// Captured on the device, upload not yet confirmed.
    Queued {
        /// Device-local URI of the captured file.
        local_uri: String,
    },
}

impl PhotoSource {
    /// True while the photo's upload has not been confirmed.
    #[must_use]
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

/// A photo attachment, uploaded or still queued on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    /// Client-generated identity.
    pub id: Uuid,
    /// Record the photo documents; photos can briefly be orphaned while
    /// their parent is being deleted.
    pub parent: Option<PhotoParent>,
    /// Caption entered by the collector.
    pub caption: Option<String>,
    /// Current home of the photo's bytes.
    pub source: PhotoSource,
}

/// Photos grouped by parent entity id.
///
/// Insertion order within each group follows input order; no display sort is
/// imposed here. Parentless photos are excluded. Lookups for records with no
/// photos yield an empty list, never an absence.
///
/// # Examples
/// ```
/// use nasti_core::{Photo, PhotoIndex, PhotoParent, PhotoSource};
/// use uuid::Uuid;
///
/// let parent = Uuid::new_v4();
/// let photo = Photo {
///     id: Uuid::new_v4(),
///     parent: Some(PhotoParent::Collection(parent)),
///     caption: None,
///     source: PhotoSource::Queued { local_uri: "file:///p.jpg".into() },
/// };
/// let mut index = PhotoIndex::build([photo.clone()]);
/// assert_eq!(index.take(parent), vec![photo]);
/// assert_eq!(index.take(parent), vec![]);
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PhotoIndex {
    by_parent: HashMap<Uuid, Vec<Photo>>,
}

impl PhotoIndex {
    /// Group the given photos by their parent entity id.
    pub fn build<I>(photos: I) -> Self
    where
        I: IntoIterator<Item = Photo>,
    {
        let mut by_parent: HashMap<Uuid, Vec<Photo>> = HashMap::new();
        for photo in photos {
            let Some(parent) = photo.parent else {
                continue;
            };
            by_parent.entry(parent.entity_id()).or_default().push(photo);
        }
        Self { by_parent }
    }

    /// Remove and return the photos grouped under the given record id.
    ///
    /// Returns an empty list when the record has no photos.
    pub fn take(&mut self, parent_id: Uuid) -> Vec<Photo> {
        self.by_parent.remove(&parent_id).unwrap_or_default()
    }

    /// Photos grouped under the given record id, without removing them.
    #[must_use]
    pub fn get(&self, parent_id: Uuid) -> &[Photo] {
        self.by_parent
            .get(&parent_id)
            .map_or(&[], Vec::as_slice)
    }

    /// Number of parent entities with at least one photo.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_parent.len()
    }

    /// True when no photo in the input carried a parent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_parent.is_empty()
    }
}
