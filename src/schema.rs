//! Tantivy schema and tokenizer registration.

#![cfg(feature = "tantivy-engine")]

use tantivy::schema::{Field, Schema, SchemaBuilder, FAST, INDEXED, STORED, STRING};
use tantivy::schema::{TextFieldIndexing, TextOptions, IndexRecordOption};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer};
use tantivy::Index;

use crate::stringutil::DEFAULT_MAX_TERM_LEN;

/// Name under which the custom tokenizer chain is registered on the index.
pub const TOKENIZER_NAME: &str = "zg_default";

/// Current index schema version, compared against `fts_index_version`
/// metadata at startup.
pub const INDEX_VERSION: &str = "1";

/// Metadata key under which `INDEX_VERSION` is stored.
pub const INDEX_VERSION_KEY: &str = "fts_index_version";

/// Relative weight applied to a subject's text when indexed into the `name`
/// field: the text is added this many times so its term frequency — and
/// therefore its BM25 contribution — outweighs an equivalent single-weight
/// match elsewhere in the same field.
pub const NAME_FIELD_WEIGHT: usize = 5;

/// Field handles resolved once at schema-build time and threaded through
/// the indexer and search path.
#[derive(Debug, Clone, Copy)]
pub struct FieldHandles {
    pub event_id: Field,
    pub timestamp: Field,
    pub name: Field,
    pub site: Field,
    pub app: Field,
    pub zgei: Field,
    pub zgem: Field,
    pub zga: Field,
    pub zgsu: Field,
    pub zgsi: Field,
    pub zgsm: Field,
    pub zgso: Field,
    pub zgst: Field,
    pub zgss: Field,
    pub category: Field,
}

/// Builds the schema: two value slots, three free-text
/// fields, and ten boolean-term fields.
#[must_use]
pub fn build_schema() -> (Schema, FieldHandles) {
    let mut builder = SchemaBuilder::new();

    let event_id = builder.add_u64_field("event_id", INDEXED | STORED | FAST);
    let timestamp = builder.add_i64_field("timestamp", INDEXED | STORED | FAST);

    let text_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_indexing);

    let name = builder.add_text_field("name", text_options.clone());
    let site = builder.add_text_field("site", text_options.clone());
    let app = builder.add_text_field("app", text_options);

    let zgei = builder.add_text_field("zgei", STRING);
    let zgem = builder.add_text_field("zgem", STRING);
    let zga = builder.add_text_field("zga", STRING);
    let zgsu = builder.add_text_field("zgsu", STRING);
    let zgsi = builder.add_text_field("zgsi", STRING);
    let zgsm = builder.add_text_field("zgsm", STRING);
    let zgso = builder.add_text_field("zgso", STRING);
    let zgst = builder.add_text_field("zgst", STRING);
    let zgss = builder.add_text_field("zgss", STRING);
    let category = builder.add_text_field("category", STRING);

    let schema = builder.build();
    let handles = FieldHandles {
        event_id,
        timestamp,
        name,
        site,
        app,
        zgei,
        zgem,
        zga,
        zgsu,
        zgsi,
        zgsm,
        zgso,
        zgst,
        zgss,
        category,
    };
    (schema, handles)
}

/// Registers the free-text tokenizer chain on `index`: split on whitespace
/// and punctuation, lowercase, drop tokens over 255 bytes. CJK ideograph
/// runs survive as single tokens — no custom segmentation is needed.
pub fn register_tokenizer(index: &Index) {
    let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(255))
        .filter(LowerCaser)
        .build();
    index.tokenizers().register(TOKENIZER_NAME, analyzer);
}

/// Returns the underlying engine's maximum term length, falling back to
/// `DEFAULT_MAX_TERM_LEN`.
#[must_use]
pub const fn max_term_len() -> usize {
    // Tantivy does not expose this as a queryable constant; 245 is the
    // documented safe floor under its 255-byte hard limit.
    DEFAULT_MAX_TERM_LEN
}
