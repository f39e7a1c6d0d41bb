//! URI mangling, term truncation, and URI decomposition shared by the
//! indexing and query paths.

use percent_encoding::percent_decode_str;

/// Safe floor for the underlying index engine's maximum term length when the
/// engine's own limit cannot be queried directly.
pub const DEFAULT_MAX_TERM_LEN: usize = 245;

/// Percent-decodes `uri`, then replaces every non-alphanumeric byte with `_`.
///
/// Used wherever a URI must appear as a single boolean term, so the query
/// parser never sees word-boundary characters inside it. Idempotent: running
/// it twice produces the same string as running it once, because after the
/// first pass there are no percent-escapes or non-alphanumeric characters
/// left to change.
#[must_use]
pub fn mangle_uri(uri: &str) -> String {
    let decoded = percent_decode_str(uri).decode_utf8_lossy();
    decoded
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Truncates `term` to at most `max_len` bytes, respecting UTF-8 character
/// boundaries (never splits a multi-byte codepoint).
#[must_use]
pub fn truncate_term(term: &str, max_len: usize) -> &str {
    if term.len() <= max_len {
        return term;
    }
    let mut end = max_len;
    while end > 0 && !term.is_char_boundary(end) {
        end -= 1;
    }
    &term[..end]
}

/// The decomposed parts of a URI, with host and path percent/IDN-decoded so
/// they can be fed to the tokenizer as plain searchable text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriParts {
    pub scheme: String,
    pub authority: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

/// Splits `uri` into scheme/authority/path/query/fragment, percent-decoding
/// each component and decoding any IDNA/punycode host back to Unicode.
///
/// Falls back to an empty `UriParts` with only `path` populated (the raw
/// input) when the URI cannot be parsed as an absolute URL — this keeps
/// opaque URIs like `application://firefox.desktop` usable by callers that
/// only care about the path-like remainder.
#[must_use]
pub fn split_uri(uri: &str) -> UriParts {
    match url::Url::parse(uri) {
        Ok(parsed) => {
            let authority = parsed
                .host_str()
                .map(|h| idna::domain_to_unicode(h).0)
                .unwrap_or_default();
            UriParts {
                scheme: parsed.scheme().to_owned(),
                authority,
                path: percent_decode_str(parsed.path()).decode_utf8_lossy().into_owned(),
                query: parsed
                    .query()
                    .map(|q| percent_decode_str(q).decode_utf8_lossy().into_owned())
                    .unwrap_or_default(),
                fragment: parsed
                    .fragment()
                    .map(|f| percent_decode_str(f).decode_utf8_lossy().into_owned())
                    .unwrap_or_default(),
            }
        }
        Err(_) => UriParts {
            path: percent_decode_str(uri).decode_utf8_lossy().into_owned(),
            ..UriParts::default()
        },
    }
}
