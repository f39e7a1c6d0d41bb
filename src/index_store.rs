//! Owns the index handle: writes documents, deletes by event id, executes
//! searches, and manages the on-disk/in-memory lifecycle.

#![cfg(feature = "tantivy-engine")]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tantivy::collector::TopDocs;
use tantivy::query::{Query, RangeQuery, TermQuery};
use tantivy::schema::{IndexRecordOption, TantivyDocument, Value};
use tantivy::{Index, IndexReader, IndexWriter, Term};

use crate::error::{IndexerError, IndexerResult};
use crate::event::{Event, Subject, MAX_SUBJECT_URI_LEN};
use crate::host::{desktop_file_id, AppInfo, DesktopFileLookup};
use crate::schema::{self, FieldHandles, INDEX_VERSION, INDEX_VERSION_KEY, NAME_FIELD_WEIGHT};
use crate::stringutil::{mangle_uri, split_uri, truncate_term};

const METADATA_FILE: &str = "zg_fts_meta.json";
const INDEXER_HEAP_BYTES: usize = 50_000_000;
const MAX_APP_INFO_CACHE: usize = 256;

/// Where the index lives: a named directory under the host's data directory,
/// or a memory-only backend when the host reports an in-memory database.
#[derive(Debug, Clone)]
pub enum IndexLocation {
    Directory(PathBuf),
    InMemory,
}

/// Small config value the embedding host constructs and owns; no
/// global mutable state, no file-format parsing.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub location: IndexLocation,
    pub max_term_len: usize,
    pub rebuild_page_size: usize,
}

impl IndexerConfig {
    #[must_use]
    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self {
            location: IndexLocation::Directory(dir.into()),
            max_term_len: schema::max_term_len(),
            rebuild_page_size: 512,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            location: IndexLocation::InMemory,
            max_term_len: schema::max_term_len(),
            rebuild_page_size: 512,
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct IndexMetadata {
    version: String,
}

/// RAII guard for the scratch directory a rebuild writes into before it is
/// promoted to the live index directory. Removes the scratch directory on
/// drop unless `commit` was called, so a failed rebuild never leaks a
/// half-built directory.
struct TempLayout {
    path: PathBuf,
    committed: bool,
}

impl TempLayout {
    fn create(parent: &Path) -> IndexerResult<Self> {
        let path = parent.join(format!(".zg_fts_rebuild_{}", std::process::id()));
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(Self { path, committed: false })
    }

    fn commit(mut self, destination: &Path) -> IndexerResult<()> {
        if destination.exists() {
            fs::remove_dir_all(destination)?;
        }
        fs::rename(&self.path, destination)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for TempLayout {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

/// Owns the tantivy index handle and the bookkeeping state around it
/// (`AppInfo` cache, failed desktop-file lookups).
pub struct Indexer {
    config: IndexerConfig,
    index: Index,
    handles: FieldHandles,
    writer: IndexWriter,
    reader: IndexReader,
    desktop_files: Box<dyn DesktopFileLookup>,
    app_info_cache: HashMap<String, AppInfo>,
    failed_lookups: HashSet<String>,
}

impl Indexer {
    /// Opens or creates the on-disk index, or an in-memory one, per
    /// `config.location`.
    pub fn initialize(config: IndexerConfig, desktop_files: Box<dyn DesktopFileLookup>) -> IndexerResult<Self> {
        let (schema_def, handles) = schema::build_schema();

        let index = match &config.location {
            IndexLocation::InMemory => Index::create_in_ram(schema_def),
            IndexLocation::Directory(dir) => {
                fs::create_dir_all(dir)?;
                if index_exists(dir) {
                    Index::open_in_dir(dir).map_err(|e| IndexerError::Database(e.to_string()))?
                } else {
                    Index::create_in_dir(dir, schema_def).map_err(|e| IndexerError::Database(e.to_string()))?
                }
            }
        };
        schema::register_tokenizer(&index);

        let writer = index
            .writer(INDEXER_HEAP_BYTES)
            .map_err(|e| IndexerError::Database(e.to_string()))?;
        let reader = index
            .reader()
            .map_err(|e| IndexerError::Database(e.to_string()))?;

        if let IndexLocation::Directory(dir) = &config.location {
            if !metadata_path(dir).exists() {
                write_metadata(dir)?;
            }
        }

        Ok(Self {
            config,
            index,
            handles,
            writer,
            reader,
            desktop_files,
            app_info_cache: HashMap::new(),
            failed_lookups: HashSet::new(),
        })
    }

    #[must_use]
    pub const fn handles(&self) -> &FieldHandles {
        &self.handles
    }

    #[must_use]
    pub const fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub const fn reader(&self) -> &IndexReader {
        &self.reader
    }

    /// Healthy iff metadata version matches AND `doc_count > 0`.
    #[must_use]
    pub fn check_index(&self) -> bool {
        let version_ok = match &self.config.location {
            IndexLocation::InMemory => true,
            IndexLocation::Directory(dir) => read_metadata(dir)
                .map(|meta| meta.version == INDEX_VERSION)
                .unwrap_or(false),
        };
        version_ok && self.doc_count() > 0
    }

    #[must_use]
    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Closes and deletes storage, reopens empty, re-registers processors.
    /// Uses `TempLayout` so a failure mid-rebuild never leaves a half-written
    /// directory behind.
    pub fn drop_index(&mut self) -> IndexerResult<()> {
        let (schema_def, handles) = schema::build_schema();

        let fresh_index = match &self.config.location {
            IndexLocation::InMemory => Index::create_in_ram(schema_def),
            IndexLocation::Directory(dir) => {
                let parent = dir.parent().unwrap_or(Path::new("."));
                let scratch = TempLayout::create(parent)?;
                let built = Index::create_in_dir(&scratch.path, schema_def)
                    .map_err(|e| IndexerError::Database(e.to_string()))?;
                drop(built);
                scratch.commit(dir)?;
                write_metadata(dir)?;
                Index::open_in_dir(dir).map_err(|e| IndexerError::Database(e.to_string()))?
            }
        };

        schema::register_tokenizer(&fresh_index);
        self.writer = fresh_index
            .writer(INDEXER_HEAP_BYTES)
            .map_err(|e| IndexerError::Database(e.to_string()))?;
        self.reader = fresh_index
            .reader()
            .map_err(|e| IndexerError::Database(e.to_string()))?;
        self.index = fresh_index;
        self.handles = handles;
        self.app_info_cache.clear();
        self.failed_lookups.clear();
        Ok(())
    }

    /// Indexes one event's actor, subjects, and boolean-term fields. Errors
    /// are logged and the event is skipped; this never returns an error to
    /// the caller.
    pub fn index_event(&mut self, event: &Event) {
        if !event.is_indexable() {
            return;
        }

        for subject in &event.subjects {
            if subject.uri.len() > MAX_SUBJECT_URI_LEN {
                tracing::warn!(event_id = event.id, uri_len = subject.uri.len(), "subject URI too long, discarding event");
                return;
            }
        }

        let mut doc = TantivyDocument::new();
        doc.add_u64(self.handles.event_id, u64::from(event.id));
        doc.add_i64(self.handles.timestamp, event.timestamp);

        if !event.actor.is_empty() {
            self.index_actor(&mut doc, &event.actor, false);
        }

        for subject in &event.subjects {
            if subject.uri.is_empty() {
                continue;
            }
            if !subject.text.is_empty() {
                for _ in 0..NAME_FIELD_WEIGHT {
                    doc.add_text(self.handles.name, &subject.text);
                }
            }
            if subject.uri.starts_with("application://") {
                let matched = self.index_actor(&mut doc, &subject.uri, true);
                if !matched {
                    self.index_uri(&mut doc, &subject.uri, &subject.origin);
                }
            } else {
                self.index_uri(&mut doc, &subject.uri, &subject.origin);
            }
        }

        self.add_doc_filters(&mut doc, event);

        if let Err(err) = self.writer.add_document(doc) {
            tracing::warn!(event_id = event.id, error = %err, "failed to index event");
        }
    }

    /// Adds one truncated boolean term per non-empty indexed field.
    fn add_doc_filters(&self, doc: &mut TantivyDocument, event: &Event) {
        let max_len = self.config.max_term_len;
        let mut add = |field, value: &str| {
            if value.is_empty() {
                return;
            }
            doc.add_text(field, truncate_term(value, max_len));
        };

        add(self.handles.zgei, &event.interpretation);
        add(self.handles.zgem, &event.manifestation);
        if !event.actor.is_empty() {
            add(self.handles.zga, &mangle_uri(&event.actor));
        }
        for subject in &event.subjects {
            if !subject.uri.is_empty() {
                add(self.handles.zgsu, &mangle_uri(&subject.uri));
            }
            add(self.handles.zgsi, &subject.interpretation);
            add(self.handles.zgsm, &subject.manifestation);
            if !subject.origin.is_empty() {
                add(self.handles.zgso, &mangle_uri(&subject.origin));
            }
            add(self.handles.zgst, &subject.mimetype);
            add(self.handles.zgss, &subject.storage);
        }
    }

    /// Tokenizes scheme-opaque URI host/path components into the `site`
    /// free-text field. `origin` is currently unused beyond the
    /// boolean `zgso` filter term added separately by `add_doc_filters`.
    fn index_uri(&self, doc: &mut TantivyDocument, uri: &str, _origin: &str) {
        let parts = split_uri(uri);
        let mut text = String::new();
        for part in [&parts.authority, &parts.path, &parts.query] {
            if !part.is_empty() {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(part);
            }
        }
        if !text.is_empty() {
            doc.add_text(self.handles.site, &text);
        }
    }

    /// Resolves `uri` as `application://<desktop-file-id>`; returns whether
    /// a matching desktop file was found.
    fn index_actor(&mut self, doc: &mut TantivyDocument, uri: &str, is_subject: bool) -> bool {
        let Some(id) = desktop_file_id(uri) else {
            return false;
        };

        if self.failed_lookups.contains(id) {
            return false;
        }

        let info = if let Some(cached) = self.app_info_cache.get(id) {
            cached.clone()
        } else {
            match self.desktop_files.lookup(id) {
                Some(info) => {
                    if self.app_info_cache.len() >= MAX_APP_INFO_CACHE {
                        if let Some(evict) = self.app_info_cache.keys().next().cloned() {
                            self.app_info_cache.remove(&evict);
                        }
                    }
                    self.app_info_cache.insert(id.to_owned(), info.clone());
                    info
                }
                None => {
                    self.failed_lookups.insert(id.to_owned());
                    return false;
                }
            }
        };

        doc.add_text(self.handles.app, &info.display_name);
        doc.add_text(self.handles.app, &info.executable);
        if is_subject {
            doc.add_text(self.handles.zga, mangle_uri(uri));
        }
        true
    }

    /// Clears the failed-lookups set so newly-installed desktop files are
    /// retried.
    pub fn clear_failed_lookups(&mut self) {
        self.failed_lookups.clear();
    }

    /// Builds a value-range query over slot 0 bounded by `[id, id]`, fetches
    /// up to 10 hits, and deletes each matching document.
    pub fn delete_event(&mut self, event_id: u32) {
        let query: Box<dyn Query> = Box::new(RangeQuery::new_u64_bounds(
            self.handles.event_id,
            std::ops::Bound::Included(u64::from(event_id)),
            std::ops::Bound::Included(u64::from(event_id)),
        ));

        let searcher = self.reader.searcher();
        let hits = match searcher.search(&query, &TopDocs::with_limit(10)) {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!(event_id, error = %err, "delete_event search failed");
                return;
            }
        };

        if hits.is_empty() || hits.len() > 1 {
            tracing::warn!(event_id, hit_count = hits.len(), "delete_event found unexpected hit count");
        }

        let term = Term::from_field_u64(self.handles.event_id, u64::from(event_id));
        self.writer.delete_term(term);
        let _ = hits;
    }

    /// Passthrough metadata setter.
    pub fn set_db_metadata(&self, key: &str, value: &str) -> IndexerResult<()> {
        if let IndexLocation::Directory(dir) = &self.config.location {
            if key == INDEX_VERSION_KEY {
                fs::write(metadata_path(dir), serde_json::to_vec(&IndexMetadata { version: value.to_owned() })?)?;
            }
        }
        Ok(())
    }

    /// Forces the index engine to flush its write buffer.
    pub fn commit(&mut self) -> IndexerResult<()> {
        self.writer.commit().map_err(|e| IndexerError::Database(e.to_string()))?;
        self.reader.reload().map_err(|e| IndexerError::Database(e.to_string()))?;
        Ok(())
    }

    /// Builds an exact-match term query for a boolean field, used by the
    /// query compiler's tantivy render step.
    #[must_use]
    pub fn term_query(field: tantivy::schema::Field, value: &str) -> TermQuery {
        TermQuery::new(Term::from_field_text(field, value), IndexRecordOption::Basic)
    }
}

fn index_exists(dir: &Path) -> bool {
    dir.read_dir().is_ok_and(|mut entries| entries.next().is_some())
}

fn metadata_path(dir: &Path) -> PathBuf {
    dir.join(METADATA_FILE)
}

fn write_metadata(dir: &Path) -> IndexerResult<()> {
    fs::write(
        metadata_path(dir),
        serde_json::to_vec(&IndexMetadata { version: INDEX_VERSION.to_owned() })?,
    )?;
    Ok(())
}

fn read_metadata(dir: &Path) -> IndexerResult<IndexMetadata> {
    let bytes = fs::read(metadata_path(dir))?;
    Ok(serde_json::from_slice(&bytes)?)
}
