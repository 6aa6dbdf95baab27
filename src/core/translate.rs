//! Filter translation
//!
//! Turns a [`Filter`] into a [`TranslatedQuery`]: a "what to match" clause,
//! pagination and an ordered sort. The result is still backend-agnostic;
//! each storage backend renders it into its own wire shape, so the
//! composition rules below hold for all of them.
//!
//! # Composition
//!
//! | search | query | clause                  |
//! |--------|-------|-------------------------|
//! | no     | no    | `All`                   |
//! | no     | yes   | `Structured`            |
//! | yes    | no    | `Text`                  |
//! | yes    | yes   | `Combined` (both apply) |

use crate::core::filter::Filter;
use crate::core::sort::{SortSpec, parse_sort};
use serde_json::Value;

/// Free-text match across one or more fields
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    pub query: String,
    /// `None` leaves the field choice to the backend
    pub fields: Option<Vec<String>>,
}

/// The "what to match" part of a query
#[derive(Debug, Clone, PartialEq)]
pub enum MatchClause {
    All,
    Structured(Value),
    Text(TextMatch),
    /// Records must satisfy the structured filter and the text match
    Combined { structured: Value, text: TextMatch },
}

impl MatchClause {
    /// The structured filter carried by this clause, if any
    pub fn structured(&self) -> Option<&Value> {
        match self {
            MatchClause::Structured(q) | MatchClause::Combined { structured: q, .. } => Some(q),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Result-size cap
    pub size: Option<u64>,
    /// Result-skip count
    pub from: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub clause: MatchClause,
    pub page: Pagination,
    /// `None` keeps the backend's default ordering
    pub sort: Option<SortSpec>,
}

/// Translate a filter for `find`
pub fn translate(filter: &Filter) -> TranslatedQuery {
    TranslatedQuery {
        clause: match_clause(filter),
        page: pagination(filter),
        sort: sort(filter),
    }
}

/// Translate a filter for `count`: only the structured query applies
pub fn translate_count(filter: &Filter) -> MatchClause {
    match filter.structured_query() {
        Some(q) => MatchClause::Structured(q.clone()),
        None => MatchClause::All,
    }
}

fn match_clause(filter: &Filter) -> MatchClause {
    let text = filter.search_text().map(|query| TextMatch {
        query: query.to_string(),
        fields: filter
            .search_fields
            .as_ref()
            .filter(|fields| !fields.is_empty())
            .cloned(),
    });

    match (filter.structured_query().cloned(), text) {
        (None, None) => MatchClause::All,
        (Some(structured), None) => MatchClause::Structured(structured),
        (None, Some(text)) => MatchClause::Text(text),
        (Some(structured), Some(text)) => MatchClause::Combined { structured, text },
    }
}

fn pagination(filter: &Filter) -> Pagination {
    Pagination {
        size: filter.limit,
        from: filter.offset,
    }
}

fn sort(filter: &Filter) -> Option<SortSpec> {
    filter
        .sort
        .as_ref()
        .map(parse_sort)
        .filter(|spec| !spec.is_empty())
}
