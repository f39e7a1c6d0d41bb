//! Translates event templates, a time range, and raw search text into an
//! index-query expression string.
//!
//! Expansion and negation are modeled as a small AST (`ClauseAst`) built up
//! from the templates and rendered to a string exactly once, rather than by
//! concatenating `OR`/`AND` characters as the clauses are discovered — this
//! keeps expansion order deterministic and makes negation compose cleanly.

use crate::host::SymbolOntology;
use crate::query::{parse_type_uri_modifiers, EventTemplate, SubjectTemplate, TimeRange};
use crate::stringutil::mangle_uri;

/// A node in the compiled query expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClauseAst {
    /// A single boolean term, e.g. `zgei:nfo_image`.
    Term { prefix: &'static str, value: String },
    /// `(c1) OR (c2) OR …`, in the order the clauses were supplied.
    Or(Vec<ClauseAst>),
    /// `(c1) AND (c2) AND …`.
    And(Vec<ClauseAst>),
    /// `NOT ( c )`.
    Not(Box<ClauseAst>),
    /// A numeric value-slot range, e.g. `0..9999ms`.
    Range { suffix: &'static str, start: i64, end: i64 },
}

fn render(clause: &ClauseAst) -> String {
    match clause {
        ClauseAst::Term { prefix, value } => format!("{prefix}{value}"),
        ClauseAst::Or(parts) => {
            let rendered: Vec<String> = parts.iter().map(render).collect();
            rendered.join(" OR ")
        }
        ClauseAst::And(parts) => {
            let rendered: Vec<String> = parts.iter().map(|p| format!("({})", render(p))).collect();
            rendered.join(" AND ")
        }
        ClauseAst::Not(inner) => format!("NOT ( {} )", render(inner)),
        ClauseAst::Range { suffix, start, end } => format!("{start}..{end}{suffix}"),
    }
}

/// Expands a type URI field (interpretation/manifestation): parses
/// `!`/`+` modifiers, expands against the ontology unless noexpand, and
/// wraps in `NOT` if negated. Returns `None` if `raw` is empty (dropped
/// field).
fn expand_type(prefix: &'static str, raw: &str, ontology: &dyn SymbolOntology) -> Option<ClauseAst> {
    if raw.is_empty() {
        return None;
    }
    let (bare_uri, modifiers) = parse_type_uri_modifiers(raw);
    if bare_uri.is_empty() {
        return None;
    }

    let mut symbols = vec![bare_uri.to_owned()];
    if !modifiers.noexpand {
        symbols.extend(ontology.children(bare_uri));
    }

    let terms: Vec<ClauseAst> = symbols
        .into_iter()
        .map(|value| ClauseAst::Term { prefix, value })
        .collect();
    let combined = if terms.len() == 1 {
        terms.into_iter().next().unwrap()
    } else {
        ClauseAst::Or(terms)
    };

    Some(if modifiers.negate {
        ClauseAst::Not(Box::new(combined))
    } else {
        combined
    })
}

fn term_clause(prefix: &'static str, value: &str) -> Option<ClauseAst> {
    if value.is_empty() {
        return None;
    }
    Some(ClauseAst::Term { prefix, value: value.to_owned() })
}

fn mangled_term_clause(prefix: &'static str, uri: &str) -> Option<ClauseAst> {
    if uri.is_empty() {
        return None;
    }
    Some(ClauseAst::Term { prefix, value: mangle_uri(uri) })
}

fn compile_subject(subject: &SubjectTemplate, ontology: &dyn SymbolOntology) -> Vec<ClauseAst> {
    [
        mangled_term_clause("zgsu:", &subject.uri),
        expand_type("zgsi:", &subject.interpretation, ontology),
        expand_type("zgsm:", &subject.manifestation, ontology),
        mangled_term_clause("zgso:", &subject.origin),
        term_clause("zgst:", &subject.mimetype),
        term_clause("zgss:", &subject.storage),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Compiles one template into its sub-expression, or `None` if it produces
/// zero clauses (silently dropped).
fn compile_template(template: &EventTemplate, ontology: &dyn SymbolOntology) -> Option<ClauseAst> {
    let mut clauses: Vec<ClauseAst> = [
        expand_type("zgei:", &template.interpretation, ontology),
        expand_type("zgem:", &template.manifestation, ontology),
        mangled_term_clause("zga:", &template.actor),
    ]
    .into_iter()
    .flatten()
    .collect();

    for subject in &template.subjects {
        clauses.extend(compile_subject(subject, ontology));
    }

    if clauses.is_empty() {
        None
    } else if clauses.len() == 1 {
        clauses.into_iter().next()
    } else {
        Some(ClauseAst::And(clauses))
    }
}

fn compile_templates(templates: &[EventTemplate], ontology: &dyn SymbolOntology) -> Option<ClauseAst> {
    let mut compiled: Vec<ClauseAst> = templates
        .iter()
        .filter_map(|t| compile_template(t, ontology))
        .collect();

    match compiled.len() {
        0 => None,
        1 => compiled.pop(),
        _ => Some(ClauseAst::Or(compiled)),
    }
}

fn time_range_clause(time_range: TimeRange) -> Option<ClauseAst> {
    if !time_range.is_bounded() {
        return None;
    }
    Some(ClauseAst::Range { suffix: "ms", start: time_range.start, end: time_range.end })
}

/// Compiles `search_text`, `time_range`, and `templates` into the final
/// query expression string.
#[must_use]
pub fn compile(
    search_text: &str,
    time_range: TimeRange,
    templates: &[EventTemplate],
    ontology: &dyn SymbolOntology,
) -> String {
    let mut expr = search_text.to_owned();

    if let Some(filter) = compile_templates(templates, ontology) {
        expr = format!("({expr}) AND ({})", render(&filter));
    }
    if let Some(time_clause) = time_range_clause(time_range) {
        expr = format!("({expr}) AND ({})", render(&time_clause));
    }

    expr
}

/// Direct tantivy `Query` construction for the same filter/time-range
/// semantics `compile` renders to a string, used by the search path so it
/// never has to re-parse a custom mini-language. The clause AST is shared;
/// only the render target differs — `Occur`/`Box<dyn Query>` clauses are
/// built directly rather than string round-tripping.
#[cfg(feature = "tantivy-engine")]
pub mod tantivy_render {
    use std::ops::Bound;

    use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, RangeQuery};
    use tantivy::schema::{Field, IndexRecordOption};
    use tantivy::Term;

    use super::{compile_templates, time_range_clause, ClauseAst};
    use crate::host::SymbolOntology;
    use crate::query::{EventTemplate, TimeRange};
    use crate::schema::FieldHandles;

    fn field_for_prefix(prefix: &str, handles: &FieldHandles) -> Field {
        match prefix {
            "zgei:" => handles.zgei,
            "zgem:" => handles.zgem,
            "zga:" => handles.zga,
            "zgsu:" => handles.zgsu,
            "zgsi:" => handles.zgsi,
            "zgsm:" => handles.zgsm,
            "zgso:" => handles.zgso,
            "zgst:" => handles.zgst,
            "zgss:" => handles.zgss,
            other => unreachable!("unexpected boolean term prefix {other}"),
        }
    }

    fn as_query(clause: &ClauseAst, handles: &FieldHandles) -> Box<dyn Query> {
        match clause {
            ClauseAst::Term { prefix, value } => {
                let field = field_for_prefix(prefix, handles);
                let term = Term::from_field_text(field, value);
                Box::new(tantivy::query::TermQuery::new(term, IndexRecordOption::Basic))
            }
            ClauseAst::Or(parts) => {
                let subs: Vec<(Occur, Box<dyn Query>)> =
                    parts.iter().map(|p| (Occur::Should, as_query(p, handles))).collect();
                Box::new(BooleanQuery::new(subs))
            }
            ClauseAst::And(parts) => {
                let subs: Vec<(Occur, Box<dyn Query>)> =
                    parts.iter().map(|p| clause_to_occur_query(p, handles)).collect();
                Box::new(BooleanQuery::new(subs))
            }
            ClauseAst::Not(inner) => {
                let inner_q = as_query(inner, handles);
                Box::new(BooleanQuery::new(vec![
                    (Occur::MustNot, inner_q),
                    (Occur::Must, Box::new(AllQuery)),
                ]))
            }
            ClauseAst::Range { start, end, .. } => Box::new(RangeQuery::new_i64_bounds(
                handles.timestamp,
                Bound::Included(*start),
                Bound::Included(*end),
            )),
        }
    }

    fn clause_to_occur_query(clause: &ClauseAst, handles: &FieldHandles) -> (Occur, Box<dyn Query>) {
        if let ClauseAst::Not(inner) = clause {
            (Occur::MustNot, as_query(inner, handles))
        } else {
            (Occur::Must, as_query(clause, handles))
        }
    }

    /// Builds the filter + time-range clauses as tantivy `(Occur, Query)`
    /// pairs, ready to be combined with the free-text query at the call
    /// site. Empty when there are no templates and no bounded time range.
    #[must_use]
    pub fn compile_filter_clauses(
        templates: &[EventTemplate],
        time_range: TimeRange,
        handles: &FieldHandles,
        ontology: &dyn SymbolOntology,
    ) -> Vec<(Occur, Box<dyn Query>)> {
        let mut clauses = Vec::new();
        if let Some(filter) = compile_templates(templates, ontology) {
            clauses.push(clause_to_occur_query(&filter, handles));
        }
        if let Some(range) = time_range_clause(time_range) {
            clauses.push(clause_to_occur_query(&range, handles));
        }
        clauses
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::host::fakes::FakeOntology;
        use crate::schema::build_schema;
        use tantivy::collector::Count;
        use tantivy::{doc, Index};

        #[test]
        fn compile_filter_clauses_matches_expanded_type() {
            let (schema_def, handles) = build_schema();
            let index = Index::create_in_ram(schema_def);
            let mut writer = index.writer(15_000_000).unwrap();
            writer
                .add_document(doc!(handles.event_id => 1u64, handles.timestamp => 10i64, handles.zgei => "nfo:RasterImage"))
                .unwrap();
            writer.commit().unwrap();

            let mut ontology = FakeOntology::default();
            ontology
                .children
                .insert("nfo:Image".to_owned(), vec!["nfo:RasterImage".to_owned()]);

            let templates = [crate::query::EventTemplate {
                interpretation: "nfo:Image".to_owned(),
                ..crate::query::EventTemplate::default()
            }];
            let clauses = compile_filter_clauses(&templates, TimeRange::anytime(), &handles, &ontology);
            assert_eq!(clauses.len(), 1);

            let query = BooleanQuery::new(clauses);
            let reader = index.reader().unwrap();
            let searcher = reader.searcher();
            let count = searcher.search(&query, &Count).unwrap();
            assert_eq!(count, 1);
        }

        #[test]
        fn compile_filter_clauses_empty_when_no_templates() {
            let (_, handles) = build_schema();
            let ontology = FakeOntology::default();
            let clauses = compile_filter_clauses(&[], TimeRange::anytime(), &handles, &ontology);
            assert!(clauses.is_empty());
        }
    }
}
