//! Full-text search extension for an activity-log engine.
//!
//! Indexes host-supplied [`Event`]s into a secondary inverted index and
//! resolves free-text + structured-filter + time-range queries back into
//! fully populated events through a [`HostAdapter`].
//!
//! The indexing subsystem is a task-queued [`Controller`] driving an
//! [`Indexer`], fed by [`Task`]s; the query side is a [`query_compiler`]
//! that expands event [`EventTemplate`]s against a [`SymbolOntology`] and a
//! [`search`] path that executes against the index and rehydrates hits.

#![forbid(unsafe_code)]

pub mod error;
pub mod event;
pub mod host;
pub mod query;
pub mod query_compiler;
pub mod stringutil;

#[cfg(feature = "tantivy-engine")]
pub mod controller;
#[cfg(feature = "tantivy-engine")]
pub mod index_store;
#[cfg(feature = "tantivy-engine")]
pub mod schema;
#[cfg(feature = "tantivy-engine")]
pub mod search;

pub use error::{IndexerError, IndexerResult};
pub use event::{Event, Subject, MAX_SUBJECT_URI_LEN};
pub use host::{desktop_file_id, AppInfo, DesktopFileLookup, HostAdapter, StorageState, SymbolOntology};
pub use query::{
    parse_type_uri_modifiers, EventTemplate, ResultType, SubjectTemplate, TimeRange,
    TypeUriModifiers, MOST_RECENT_EVENTS_CODE,
};
pub use stringutil::{mangle_uri, split_uri, truncate_term, UriParts, DEFAULT_MAX_TERM_LEN};

#[cfg(feature = "tantivy-engine")]
pub use controller::{Controller, Task};
#[cfg(feature = "tantivy-engine")]
pub use index_store::{IndexLocation, Indexer, IndexerConfig};
#[cfg(feature = "tantivy-engine")]
pub use schema::{FieldHandles, INDEX_VERSION, INDEX_VERSION_KEY};
#[cfg(feature = "tantivy-engine")]
pub use search::{search_events, search_events_with_relevancies};
