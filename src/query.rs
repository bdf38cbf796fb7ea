use std::ops::{
    Bound,
    Range,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    document::FieldValue,
    error::{
        Error,
        Result,
    },
};

/// A condition over field values, compiled by the engine at match time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Every document.
    All,
    /// Field contains exactly this term.
    Term { field: String, value: FieldValue },
    /// Field contains a term matching a pattern where `*` is any run of
    /// characters and `?` is one character.
    Wildcard { field: String, pattern: String },
    /// Field contains at least one of these terms.
    AnyOf { field: String, values: Vec<String> },
    /// Field value lies within the bounds.
    Range {
        field: String,
        lower: Bound<FieldValue>,
        upper: Bound<FieldValue>,
    },
    /// Free text handed to the engine's query parser, with `field` as the
    /// default field.
    QueryString { field: String, text: String },
}

impl Predicate {
    /// Interpret user input against a default field.
    ///
    /// A single token carrying `*` or `?` becomes a wildcard match; every
    /// other input goes to the engine's query parser unchanged.
    pub fn parse(text: &str, field: &str) -> Self {
        let trimmed = text.trim();
        let is_pattern = !trimmed.is_empty()
            && !trimmed.contains(char::is_whitespace)
            && !trimmed.contains([':', '"', '(', ')', '[', ']', '{', '}'])
            && trimmed.contains(['*', '?']);

        if is_pattern {
            Predicate::Wildcard {
                field: field.to_string(),
                pattern: trimmed.to_string(),
            }
        } else {
            Predicate::QueryString {
                field: field.to_string(),
                text: trimmed.to_string(),
            }
        }
    }

    pub fn term(field: &str, value: impl Into<FieldValue>) -> Self {
        Predicate::Term {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn any_of<S: AsRef<str>>(field: &str, values: &[S]) -> Self {
        Predicate::AnyOf {
            field: field.to_string(),
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
        }
    }

    pub fn range(
        field: &str,
        lower: Bound<FieldValue>,
        upper: Bound<FieldValue>,
    ) -> Self {
        Predicate::Range {
            field: field.to_string(),
            lower,
            upper,
        }
    }
}

/// How a clause of a query string takes part in the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    Should,
    Must,
    MustNot,
}

/// One whitespace-separated clause of a flat query string, such as
/// `title:doc*`, `+draft` or `-status:old?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause<'a> {
    pub occur: Occurrence,
    pub field: Option<&'a str>,
    pub term: &'a str,
}

impl Clause<'_> {
    pub fn is_wildcard(&self) -> bool {
        self.term.contains(['*', '?'])
    }
}

/// Split a query string that carries wildcards into flat clauses.
///
/// Returns `Ok(None)` when there is no `*` or `?`, in which case the text
/// can go to the engine's parser as is. Wildcards are only understood in
/// plain or field-qualified terms, optionally prefixed with `+` or `-`.
/// Inside phrases, groups, ranges or boolean operators they are rejected.
pub fn wildcard_clauses(text: &str) -> Result<Option<Vec<Clause<'_>>>> {
    if !text.contains(['*', '?']) {
        return Ok(None);
    }

    let structured = text
        .contains(['"', '(', ')', '[', ']', '{', '}', '\\', '^', '~'])
        || text.split_whitespace().any(|token| {
            matches!(token, "AND" | "OR" | "NOT" | "&&" | "||" | "!")
        });
    if structured {
        return Err(Error::QuerySyntax(format!(
            "wildcards are only supported in plain terms: {text}"
        )));
    }

    text.split_whitespace()
        .map(|token| {
            let (occur, rest) = if let Some(rest) = token.strip_prefix('+') {
                (Occurrence::Must, rest)
            } else if let Some(rest) = token.strip_prefix('-') {
                (Occurrence::MustNot, rest)
            } else {
                (Occurrence::Should, token)
            };
            let (field, term) = match rest.split_once(':') {
                Some((field, term)) => (Some(field), term),
                None => (None, rest),
            };

            if term.is_empty()
                || term.contains(':')
                || field.is_some_and(str::is_empty)
            {
                return Err(Error::QuerySyntax(format!(
                    "malformed clause '{token}'"
                )));
            }
            Ok(Clause { occur, field, term })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Order results by a sortable field instead of by relevance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub predicate: Predicate,
    pub sort: Option<SortSpec>,
}

impl Query {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            sort: None,
        }
    }

    pub fn sorted_by(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }
}

impl From<Predicate> for Query {
    fn from(predicate: Predicate) -> Self {
        Query::new(predicate)
    }
}

/// A 1-based page of `page_size` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Result<Self> {
        if page == 0 {
            return Err(Error::InvalidPage);
        }
        Ok(Self { page, page_size })
    }

    /// The first page with no size limit.
    pub fn everything() -> Self {
        Self {
            page: 1,
            page_size: usize::MAX,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// How many ranked hits must be retrieved to cover this page.
    pub fn retrieval_limit(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }

    /// Positions of this page within `total` ranked hits. Always lies
    /// inside `0..total`, and is empty when the page is past the end.
    pub fn bounds(&self, total: usize) -> Range<usize> {
        let end = total.min(self.retrieval_limit());
        let start = (self.page - 1).saturating_mul(self.page_size).min(end);
        start..end
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parse_detects_wildcards() {
        assert_eq!(
            Predicate::parse("Document*", "title"),
            Predicate::Wildcard {
                field: "title".into(),
                pattern: "Document*".into(),
            }
        );
        assert_eq!(
            Predicate::parse("  te?t ", "title"),
            Predicate::Wildcard {
                field: "title".into(),
                pattern: "te?t".into(),
            }
        );
    }

    #[test]
    fn parse_passes_other_input_through() {
        assert_eq!(
            Predicate::parse("updateTest01", "title"),
            Predicate::QueryString {
                field: "title".into(),
                text: "updateTest01".into(),
            }
        );
        assert!(matches!(
            Predicate::parse("status:doc*", "title"),
            Predicate::QueryString { .. }
        ));
        assert!(matches!(
            Predicate::parse("foo* bar", "title"),
            Predicate::QueryString { .. }
        ));
    }

    #[test]
    fn clauses_only_when_wildcards_present() {
        assert_eq!(wildcard_clauses("title:doc OR foo").unwrap(), None);
    }

    #[test]
    fn clauses_split_fields_and_occurrence() {
        let clauses = wildcard_clauses("title:Doc1* +draft -status:old?")
            .unwrap()
            .unwrap();
        assert_eq!(clauses, [
            Clause {
                occur: Occurrence::Should,
                field: Some("title"),
                term: "Doc1*",
            },
            Clause {
                occur: Occurrence::Must,
                field: None,
                term: "draft",
            },
            Clause {
                occur: Occurrence::MustNot,
                field: Some("status"),
                term: "old?",
            },
        ]);
        assert!(clauses[0].is_wildcard());
        assert!(!clauses[1].is_wildcard());
    }

    #[test]
    fn wildcards_in_structured_queries_are_rejected() {
        for text in [
            "\"doc*\"",
            "(a* OR b)",
            "a* AND b",
            "title:[a* TO b]",
            "doc*^2",
        ] {
            assert!(
                matches!(wildcard_clauses(text), Err(Error::QuerySyntax(_))),
                "{text}"
            );
        }
        assert!(matches!(
            wildcard_clauses(":doc*"),
            Err(Error::QuerySyntax(_))
        ));
        assert!(matches!(
            wildcard_clauses("title:*:x"),
            Err(Error::QuerySyntax(_))
        ));
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(matches!(PageRequest::new(0, 10), Err(Error::InvalidPage)));
    }

    #[test]
    fn empty_page_size() {
        let page = PageRequest::new(1, 0).unwrap();
        assert_eq!(page.retrieval_limit(), 0);
        assert_eq!(page.bounds(50), 0..0);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = PageRequest::new(5, 10).unwrap();
        assert_eq!(page.bounds(30), 30..30);
    }

    #[test]
    fn everything_does_not_overflow() {
        let page = PageRequest::everything();
        assert_eq!(page.retrieval_limit(), usize::MAX);
        assert_eq!(page.bounds(1000), 0..1000);

        let deep = PageRequest::new(usize::MAX, usize::MAX).unwrap();
        assert!(deep.bounds(1000).is_empty());
    }

    proptest! {
        #[test]
        fn page_length_matches_formula(
            page in 1usize..50,
            page_size in 0usize..50,
            total in 0usize..2000,
        ) {
            let req = PageRequest::new(page, page_size).unwrap();
            let skipped = (page - 1) * page_size;
            let expected = if skipped >= total {
                0
            } else {
                page_size.min(total - skipped)
            };
            let bounds = req.bounds(total);
            prop_assert_eq!(bounds.len(), expected);
            prop_assert!(bounds.end <= total);
        }
    }
}
