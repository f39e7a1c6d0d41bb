//! Event and subject data model (input-only; owned by the host).

use serde::{Deserialize, Serialize};

/// A host-level record describing one user activity, with metadata and
/// subjects. Constructed and owned by the host; the indexer only ever reads
/// it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id. Must be `> 0` to be indexable.
    pub id: u32,
    /// Milliseconds since epoch.
    pub timestamp: i64,
    /// Type URI, may be empty.
    pub interpretation: String,
    /// Type URI, may be empty.
    pub manifestation: String,
    /// `application://<desktop-id>` URI, may be empty.
    pub actor: String,
    /// Ordered, possibly empty.
    pub subjects: Vec<Subject>,
}

impl Event {
    /// Whether this event's id is in the indexable range (`> 0`).
    #[must_use]
    pub const fn is_indexable(&self) -> bool {
        self.id > 0
    }
}

/// A thing an event is *about* — file, URL, application — with its own typed
/// attributes. All fields are optional strings; empty is treated as absent
/// throughout this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subject {
    pub uri: String,
    pub text: String,
    pub interpretation: String,
    pub manifestation: String,
    pub origin: String,
    pub mimetype: String,
    pub storage: String,
}

/// Maximum subject URI length in bytes; a subject whose URI exceeds this
/// discards the entire event, not just the subject.
pub const MAX_SUBJECT_URI_LEN: usize = 512;
