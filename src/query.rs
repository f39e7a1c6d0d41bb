//! Search input types: time ranges, result types, and event templates.

use serde::{Deserialize, Serialize};

/// Opaque to the core except one magic value: result types other than
/// `MostRecentEvents` are passed through to the host's coalescing semantics
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultType {
    /// Numeric code 100. Sorts by timestamp descending and fetches events
    /// directly by id.
    MostRecentEvents,
    /// Any other host-defined result type code, opaque to this crate.
    Other(u32),
}

/// The numeric code the host uses for `MOST_RECENT_EVENTS`.
pub const MOST_RECENT_EVENTS_CODE: u32 = 100;

impl ResultType {
    /// Builds a `ResultType` from the host's numeric code.
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        if code == MOST_RECENT_EVENTS_CODE {
            Self::MostRecentEvents
        } else {
            Self::Other(code)
        }
    }

    /// Returns the numeric code this result type was constructed from.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::MostRecentEvents => MOST_RECENT_EVENTS_CODE,
            Self::Other(code) => code,
        }
    }
}

/// Time range filter over event timestamps (ms since epoch). `start <= 0` or
/// `end >= i64::MAX` means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    /// A time range with no bound on either side.
    #[must_use]
    pub const fn anytime() -> Self {
        Self { start: 0, end: i64::MAX }
    }

    /// Whether this range constrains anything (i.e. isn't `anytime`).
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.start > 0 || self.end < i64::MAX
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::anytime()
    }
}

/// Modifiers parsed from the leading characters of a template type URI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeUriModifiers {
    pub negate: bool,
    pub noexpand: bool,
}

/// Strips leading `!`/`+` modifiers from `raw`, in either order, each at most
/// once, returning the stripped URI and the flags that were found.
#[must_use]
pub fn parse_type_uri_modifiers(raw: &str) -> (&str, TypeUriModifiers) {
    let mut rest = raw;
    let mut modifiers = TypeUriModifiers::default();
    loop {
        if let Some(stripped) = rest.strip_prefix('!') {
            if modifiers.negate {
                break;
            }
            modifiers.negate = true;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('+') {
            if modifiers.noexpand {
                break;
            }
            modifiers.noexpand = true;
            rest = stripped;
        } else {
            break;
        }
    }
    (rest, modifiers)
}

/// An event-shaped filter where empty fields are wildcards and non-empty
/// fields must match (subject to expansion / noexpand / negation for type
/// URI fields).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTemplate {
    pub interpretation: String,
    pub manifestation: String,
    pub actor: String,
    pub subjects: Vec<SubjectTemplate>,
}

impl EventTemplate {
    /// An all-wildcard template that matches everything and compiles to no
    /// clause at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether every field is empty (produces zero clauses when compiled).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interpretation.is_empty()
            && self.manifestation.is_empty()
            && self.actor.is_empty()
            && self.subjects.iter().all(SubjectTemplate::is_empty)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectTemplate {
    pub uri: String,
    pub interpretation: String,
    pub manifestation: String,
    pub origin: String,
    pub mimetype: String,
    pub storage: String,
}

impl SubjectTemplate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uri.is_empty()
            && self.interpretation.is_empty()
            && self.manifestation.is_empty()
            && self.origin.is_empty()
            && self.mimetype.is_empty()
            && self.storage.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_from_code_most_recent() {
        assert_eq!(ResultType::from_code(100), ResultType::MostRecentEvents);
    }

    #[test]
    fn result_type_from_code_other() {
        assert_eq!(ResultType::from_code(7), ResultType::Other(7));
    }

    #[test]
    fn result_type_code_roundtrip() {
        for code in [0, 1, 42, 100, 9999] {
            assert_eq!(ResultType::from_code(code).code(), code);
        }
    }

    #[test]
    fn time_range_anytime_is_unbounded() {
        assert!(!TimeRange::anytime().is_bounded());
    }

    #[test]
    fn time_range_bounded_start() {
        let range = TimeRange { start: 10, end: i64::MAX };
        assert!(range.is_bounded());
    }

    #[test]
    fn time_range_bounded_end() {
        let range = TimeRange { start: 0, end: 100 };
        assert!(range.is_bounded());
    }

    #[test]
    fn time_range_default_is_anytime() {
        assert_eq!(TimeRange::default(), TimeRange::anytime());
    }

    #[test]
    fn parse_modifiers_none() {
        let (uri, modifiers) = parse_type_uri_modifiers("nfo:Image");
        assert_eq!(uri, "nfo:Image");
        assert!(!modifiers.negate);
        assert!(!modifiers.noexpand);
    }

    #[test]
    fn parse_modifiers_negate() {
        let (uri, modifiers) = parse_type_uri_modifiers("!nfo:Image");
        assert_eq!(uri, "nfo:Image");
        assert!(modifiers.negate);
        assert!(!modifiers.noexpand);
    }

    #[test]
    fn parse_modifiers_noexpand() {
        let (uri, modifiers) = parse_type_uri_modifiers("+nfo:Image");
        assert_eq!(uri, "nfo:Image");
        assert!(!modifiers.negate);
        assert!(modifiers.noexpand);
    }

    #[test]
    fn parse_modifiers_both_orders() {
        let (uri1, m1) = parse_type_uri_modifiers("!+nfo:Image");
        let (uri2, m2) = parse_type_uri_modifiers("+!nfo:Image");
        assert_eq!(uri1, "nfo:Image");
        assert_eq!(uri2, "nfo:Image");
        assert_eq!(m1, m2);
        assert!(m1.negate && m1.noexpand);
    }

    #[test]
    fn parse_modifiers_each_at_most_once() {
        let (uri, modifiers) = parse_type_uri_modifiers("!!nfo:Image");
        // second '!' is not a modifier, it's part of the remaining URI
        assert_eq!(uri, "!nfo:Image");
        assert!(modifiers.negate);
    }

    #[test]
    fn event_template_empty_is_empty() {
        assert!(EventTemplate::empty().is_empty());
    }

    #[test]
    fn event_template_with_interpretation_not_empty() {
        let template = EventTemplate {
            interpretation: "nfo:Document".to_owned(),
            ..EventTemplate::default()
        };
        assert!(!template.is_empty());
    }

    #[test]
    fn subject_template_empty() {
        assert!(SubjectTemplate::default().is_empty());
    }

    #[test]
    fn event_template_serde_roundtrip() {
        let template = EventTemplate {
            interpretation: "nfo:Image".to_owned(),
            ..EventTemplate::default()
        };
        let json = serde_json::to_string(&template).unwrap();
        let back: EventTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.interpretation, "nfo:Image");
    }
}
