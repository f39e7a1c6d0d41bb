//! The boundary to the host event store and the symbol ontology.
//!
//! Both collaborators are opaque externally-owned systems; they are
//! modeled as traits so the core can be driven by fakes in tests.

use crate::event::Event;
use crate::query::{EventTemplate, ResultType, TimeRange};

/// Storage-state filter passed through to `HostAdapter::find_events`,
/// opaque to this crate beyond "any state".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageState {
    Any,
    Available,
    Unavailable,
}

/// The host's event store: insertion, fetch-by-id, and template matching.
pub trait HostAdapter: Send + Sync {
    /// Returns events in the order of `ids`; a missing id becomes `None`.
    fn get_events(&self, ids: &[u32]) -> Vec<Option<Event>>;

    /// Applies the host's full template-matching and result-coalescing
    /// semantics.
    fn find_events(
        &self,
        time_range: TimeRange,
        templates: &[EventTemplate],
        storage_state: StorageState,
        offset: usize,
        result_type: ResultType,
    ) -> Vec<Event>;

    /// Inserts an event and returns its assigned id. Used by the rebuild
    /// catch-up path and by tests seeding fixtures.
    fn insert_event(&self, event: Event) -> u32;

    /// All events currently known to the host, in ascending timestamp
    /// order, for paginated rebuild. `offset`/`limit`
    /// page through this ordering.
    fn events_page(&self, offset: usize, limit: usize) -> Vec<Event>;

    /// Total number of events the host currently holds.
    fn event_count(&self) -> usize;
}

/// The symbol ontology: parent/child lookups on type URIs.
pub trait SymbolOntology: Send + Sync {
    /// Transitive descendants of `type_uri`, inclusive of leaves, in a
    /// deterministic order (callers rely on stable `OR` clause ordering).
    fn children(&self, type_uri: &str) -> Vec<String>;
}

/// Looks up desktop-file-backed application metadata for actor indexing.
pub trait DesktopFileLookup: Send + Sync {
    /// Resolves a desktop-file id (e.g. `firefox.desktop`) to an `AppInfo`,
    /// or `None` if no matching desktop file exists.
    fn lookup(&self, desktop_file_id: &str) -> Option<AppInfo>;
}

/// Cached application metadata resolved from a desktop-file id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub display_name: String,
    pub executable: String,
}

/// Strips the `application://` prefix from `uri`, if present, returning the
/// bare desktop-file id.
#[must_use]
pub fn desktop_file_id(uri: &str) -> Option<&str> {
    uri.strip_prefix("application://")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_file_id_strips_prefix() {
        assert_eq!(desktop_file_id("application://firefox.desktop"), Some("firefox.desktop"));
    }

    #[test]
    fn desktop_file_id_non_matching_scheme() {
        assert_eq!(desktop_file_id("http://example.com"), None);
    }

    #[test]
    fn fake_host_get_events_missing_becomes_none() {
        use fakes::FakeHost;
        let host = FakeHost::with_events(vec![]);
        let result = host.get_events(&[1, 2]);
        assert_eq!(result, vec![None, None]);
    }

    #[test]
    fn fake_host_events_page_sorted_by_timestamp() {
        use fakes::FakeHost;
        let host = FakeHost::with_events(vec![
            Event { id: 2, timestamp: 200, interpretation: String::new(), manifestation: String::new(), actor: String::new(), subjects: vec![] },
            Event { id: 1, timestamp: 100, interpretation: String::new(), manifestation: String::new(), actor: String::new(), subjects: vec![] },
        ]);
        let page = host.events_page(0, 10);
        assert_eq!(page[0].id, 1);
        assert_eq!(page[1].id, 2);
    }
}
