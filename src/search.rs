//! Search execution: compiles the query, executes against the index, and
//! rehydrates hits through the host.

#![cfg(feature = "tantivy-engine")]

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser};
use tantivy::schema::Value;
use tantivy::{Order, TantivyDocument};

use crate::error::{IndexerError, IndexerResult};
use crate::event::Event;
use crate::host::{HostAdapter, StorageState, SymbolOntology};
use crate::index_store::Indexer;
use crate::query::{EventTemplate, ResultType, TimeRange};
use crate::query_compiler::tantivy_render::compile_filter_clauses;

/// Executes `Indexer::search`. Returns the rehydrated events in
/// hit order plus the index engine's estimated match count.
pub fn search_events(
    indexer: &Indexer,
    host: &dyn HostAdapter,
    ontology: &dyn SymbolOntology,
    text: &str,
    time_range: TimeRange,
    templates: &[EventTemplate],
    offset: usize,
    count: usize,
    result_type: ResultType,
) -> IndexerResult<(Vec<Event>, u64)> {
    let (scored_ids, estimated_matches) =
        run_query(indexer, ontology, text, time_range, templates, offset, count, result_type)?;
    let ids: Vec<u32> = scored_ids.iter().map(|(id, _)| *id).collect();

    let events = if matches!(result_type, ResultType::MostRecentEvents) {
        host.get_events(&ids).into_iter().flatten().collect()
    } else {
        let skeleton_templates: Vec<EventTemplate> = ids
            .iter()
            .map(|id| EventTemplate { interpretation: id.to_string(), ..EventTemplate::default() })
            .collect();
        host.find_events(time_range, &skeleton_templates, StorageState::Any, 0, result_type)
    };

    Ok((events, estimated_matches))
}

/// Identical to `search_events` but additionally returns the per-result
/// relevancy score from the index engine.
pub fn search_events_with_relevancies(
    indexer: &Indexer,
    host: &dyn HostAdapter,
    ontology: &dyn SymbolOntology,
    text: &str,
    time_range: TimeRange,
    templates: &[EventTemplate],
    offset: usize,
    count: usize,
    result_type: ResultType,
) -> IndexerResult<(Vec<(Event, f32)>, u64)> {
    let (scored_ids, estimated_matches) =
        run_query(indexer, ontology, text, time_range, templates, offset, count, result_type)?;

    let ids: Vec<u32> = scored_ids.iter().map(|(id, _)| *id).collect();
    let events = host.get_events(&ids);

    let paired = events
        .into_iter()
        .zip(scored_ids.iter().map(|(_, score)| *score))
        .filter_map(|(event, score)| event.map(|e| (e, score)))
        .collect();

    Ok((paired, estimated_matches))
}

/// Compiles and executes the query, returning `(event_id, relevancy_score)`
/// pairs in result order, overfetching by 3x so host-side
/// coalescing can still produce `count` unique results.
fn run_query(
    indexer: &Indexer,
    ontology: &dyn SymbolOntology,
    text: &str,
    time_range: TimeRange,
    templates: &[EventTemplate],
    offset: usize,
    count: usize,
    result_type: ResultType,
) -> IndexerResult<(Vec<(u32, f32)>, u64)> {
    let handles = indexer.handles();
    let mut clauses = compile_filter_clauses(templates, time_range, handles, ontology);

    if !text.trim().is_empty() {
        let mut parser = QueryParser::for_index(indexer.index(), vec![handles.name, handles.site, handles.app]);
        parser.set_conjunction_by_default();
        let text_query = parser.parse_query(text).map_err(|e| IndexerError::QueryParse(e.to_string()))?;
        clauses.push((Occur::Must, text_query));
    }

    let query: Box<dyn Query> = if clauses.is_empty() {
        Box::new(tantivy::query::AllQuery)
    } else if clauses.len() == 1 && clauses[0].0 == Occur::Must {
        let (_, q) = clauses.into_iter().next().unwrap();
        q
    } else {
        Box::new(BooleanQuery::new(clauses))
    };

    let maxhits = count.saturating_mul(3).max(1);
    let searcher = indexer.reader().searcher();

    let hits: Vec<(u32, f32)> = if matches!(result_type, ResultType::MostRecentEvents) {
        let top = searcher
            .search(&query, &TopDocs::with_limit(offset + maxhits).order_by_fast_field::<i64>("timestamp", Order::Desc))
            .map_err(|e| IndexerError::Internal(e.to_string()))?;
        top.into_iter()
            .skip(offset)
            .filter_map(|(_ts, addr)| {
                let doc: TantivyDocument = searcher.doc(addr).ok()?;
                let id = doc.get_first(handles.event_id)?.as_u64()? as u32;
                Some((id, 0.0))
            })
            .collect()
    } else {
        let top = searcher
            .search(&query, &TopDocs::with_limit(offset + maxhits))
            .map_err(|e| IndexerError::Internal(e.to_string()))?;
        top.into_iter()
            .skip(offset)
            .filter_map(|(score, addr)| {
                let doc: TantivyDocument = searcher.doc(addr).ok()?;
                let id = doc.get_first(handles.event_id)?.as_u64()? as u32;
                Some((id, score))
            })
            .collect()
    };

    let estimated_matches = searcher.search(&query, &tantivy::collector::Count).unwrap_or(0) as u64;
    Ok((hits, estimated_matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Subject;
    use crate::host::fakes::{FakeDesktopFiles, FakeHost, FakeOntology};
    use crate::index_store::IndexerConfig;

    fn build_fixture() -> (Indexer, FakeHost) {
        let mut indexer =
            Indexer::initialize(IndexerConfig::in_memory(), Box::new(FakeDesktopFiles::default())).unwrap();

        let e1 = Event {
            id: 1,
            timestamp: 1_000,
            interpretation: "nfo:RasterImage".to_owned(),
            manifestation: String::new(),
            actor: "application://firefox.desktop".to_owned(),
            subjects: vec![Subject {
                uri: "http://example.com/image.jpg".to_owned(),
                text: "text".to_owned(),
                interpretation: "nfo:RasterImage".to_owned(),
                ..Subject::default()
            }],
        };
        let e2 = Event {
            id: 2,
            timestamp: 2_000,
            interpretation: String::new(),
            manifestation: String::new(),
            actor: String::new(),
            subjects: vec![Subject {
                uri: "http://example.com/I%20Love%20Wikis".to_owned(),
                text: "Example.com Wiki Page. Kanji is awesome 漢字".to_owned(),
                ..Subject::default()
            }],
        };
        // Greek IDN - stands for http://παράδειγμα.δοκιμή
        let e3 = Event {
            id: 3,
            timestamp: 3_000,
            interpretation: String::new(),
            manifestation: String::new(),
            actor: String::new(),
            subjects: vec![Subject {
                uri: "http://xn--hxajbheg2az3al.xn--jxalpdlp/".to_owned(),
                text: "IDNwiki".to_owned(),
                ..Subject::default()
            }],
        };

        for event in [&e1, &e2, &e3] {
            indexer.index_event(event);
        }
        indexer.commit().unwrap();

        let host = FakeHost::with_events(vec![e1, e2, e3]);
        (indexer, host)
    }

    #[test]
    fn simple_query_matches_one_event() {
        let (indexer, host) = build_fixture();
        let ontology = FakeOntology::default();
        let (events, matches) = search_events(
            &indexer,
            &host,
            &ontology,
            "text",
            TimeRange::anytime(),
            &[],
            0,
            10,
            ResultType::MostRecentEvents,
        )
        .unwrap();
        assert_eq!(matches, 1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 1);
    }

    #[test]
    fn url_unescape_finds_percent_decoded_term() {
        let (indexer, host) = build_fixture();
        let ontology = FakeOntology::default();
        let (events, _) = search_events(
            &indexer,
            &host,
            &ontology,
            "love",
            TimeRange::anytime(),
            &[],
            0,
            10,
            ResultType::MostRecentEvents,
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 2);
    }

    #[test]
    fn filter_with_no_matching_events_yields_zero_matches() {
        let (indexer, host) = build_fixture();
        let ontology = FakeOntology::default();
        let templates = [EventTemplate { interpretation: "nfo:Document".to_owned(), ..EventTemplate::default() }];
        let (events, matches) = search_events(
            &indexer,
            &host,
            &ontology,
            "text",
            TimeRange::anytime(),
            &templates,
            0,
            10,
            ResultType::Other(1),
        )
        .unwrap();
        assert_eq!(matches, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn cjk_wildcard_matches_tokenized_run() {
        let (indexer, host) = build_fixture();
        let ontology = FakeOntology::default();
        let (_, matches) = search_events(
            &indexer,
            &host,
            &ontology,
            "漢*",
            TimeRange::anytime(),
            &[],
            0,
            10,
            ResultType::MostRecentEvents,
        )
        .unwrap();
        assert_eq!(matches, 1);
    }

    #[test]
    fn expanded_type_filter_matches_raster_image() {
        let (indexer, host) = build_fixture();
        let mut ontology = FakeOntology::default();
        ontology
            .children
            .insert("nfo:Image".to_owned(), vec!["nfo:RasterImage".to_owned()]);
        let templates = [EventTemplate { interpretation: "nfo:Image".to_owned(), ..EventTemplate::default() }];
        let (events, matches) = search_events(
            &indexer,
            &host,
            &ontology,
            "text",
            TimeRange::anytime(),
            &templates,
            0,
            10,
            ResultType::MostRecentEvents,
        )
        .unwrap();
        assert_eq!(matches, 1);
        assert_eq!(events[0].id, 1);
    }

    #[test]
    fn negated_type_filter_excludes_matching_event() {
        let (indexer, host) = build_fixture();
        let mut ontology = FakeOntology::default();
        ontology
            .children
            .insert("nfo:Image".to_owned(), vec!["nfo:RasterImage".to_owned()]);
        let templates = [EventTemplate { interpretation: "!nfo:Image".to_owned(), ..EventTemplate::default() }];
        let (_, matches) = search_events(
            &indexer,
            &host,
            &ontology,
            "text",
            TimeRange::anytime(),
            &templates,
            0,
            10,
            ResultType::MostRecentEvents,
        )
        .unwrap();
        assert_eq!(matches, 0);
    }

    #[test]
    fn noexpand_filter_excludes_parent_type_match() {
        let (indexer, host) = build_fixture();
        let mut ontology = FakeOntology::default();
        ontology
            .children
            .insert("nfo:Image".to_owned(), vec!["nfo:RasterImage".to_owned()]);
        let templates = [EventTemplate { interpretation: "+nfo:Image".to_owned(), ..EventTemplate::default() }];
        let (events, matches) = search_events(
            &indexer,
            &host,
            &ontology,
            "text",
            TimeRange::anytime(),
            &templates,
            0,
            10,
            ResultType::MostRecentEvents,
        )
        .unwrap();
        assert_eq!(matches, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn noexpand_filter_matches_exact_type() {
        let (indexer, host) = build_fixture();
        let mut ontology = FakeOntology::default();
        ontology
            .children
            .insert("nfo:Image".to_owned(), vec!["nfo:RasterImage".to_owned()]);
        let templates = [EventTemplate { interpretation: "+nfo:RasterImage".to_owned(), ..EventTemplate::default() }];
        let (events, matches) = search_events(
            &indexer,
            &host,
            &ontology,
            "text",
            TimeRange::anytime(),
            &templates,
            0,
            10,
            ResultType::MostRecentEvents,
        )
        .unwrap();
        assert!(matches > 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 1);
        assert_eq!(events[0].subjects[0].text, "text");
    }

    #[test]
    fn idn_host_search_matches_decoded_domain() {
        let (indexer, host) = build_fixture();
        let ontology = FakeOntology::default();
        let (events, matches) = search_events(
            &indexer,
            &host,
            &ontology,
            "παράδειγμα",
            TimeRange::anytime(),
            &[],
            0,
            10,
            ResultType::MostRecentEvents,
        )
        .unwrap();
        assert!(matches > 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 3);
        assert_eq!(events[0].subjects[0].text, "IDNwiki");
    }
}
