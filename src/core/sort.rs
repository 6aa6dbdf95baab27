//! Sort specification parsing
//!
//! A sort is given either as one string (`"name"`, `"name -age"`) or as an
//! ordered list of tokens (`["name", "-age"]`). A leading `-` selects a
//! descending order on the rest of the token.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Direction of a single sort entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    /// Keyword used by search-engine DSLs
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    /// Numeric form used by document databases
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Sort specification as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortInput {
    /// One field or several space-delimited fields
    Text(String),
    /// Ordered list of field tokens
    Fields(Vec<String>),
}

impl From<&str> for SortInput {
    fn from(s: &str) -> Self {
        SortInput::Text(s.to_string())
    }
}

impl From<String> for SortInput {
    fn from(s: String) -> Self {
        SortInput::Text(s)
    }
}

impl From<Vec<&str>> for SortInput {
    fn from(fields: Vec<&str>) -> Self {
        SortInput::Fields(fields.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for SortInput {
    fn from(fields: Vec<String>) -> Self {
        SortInput::Fields(fields)
    }
}

/// Ordered mapping of field name to direction
///
/// Insertion order is preserved. Re-inserting a field keeps its original
/// position and replaces its direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec(IndexMap<String, SortDirection>);

impl SortSpec {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, field: impl Into<String>, direction: SortDirection) {
        self.0.insert(field.into(), direction);
    }

    pub fn get(&self, field: &str) -> Option<SortDirection> {
        self.0.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.0.iter().map(|(field, dir)| (field.as_str(), *dir))
    }
}

/// Derive a single entry from a token
///
/// Returns `None` for tokens that name no field: blank tokens and a bare `-`.
pub fn sort_entry(token: &str) -> Option<(String, SortDirection)> {
    let token = token.trim();
    let (field, direction) = match token.strip_prefix('-') {
        Some(rest) => (rest, SortDirection::Descending),
        None => (token, SortDirection::Ascending),
    };
    if field.is_empty() {
        return None;
    }
    Some((field.to_string(), direction))
}

/// Parse any accepted sort form into an ordered mapping
///
/// Invalid input never fails: offending tokens are logged and skipped, and
/// an input with nothing usable produces an empty spec.
pub fn parse_sort(input: &SortInput) -> SortSpec {
    match input {
        SortInput::Text(text) => sorts_from_str(text),
        SortInput::Fields(tokens) => sorts_from_tokens(tokens.iter().map(String::as_str)),
    }
}

fn sorts_from_str(text: &str) -> SortSpec {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        tracing::warn!(sort = %text, "invalid sort entry, no sort applied");
        return SortSpec::new();
    }
    sorts_from_tokens(tokens)
}

fn sorts_from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> SortSpec {
    let mut spec = SortSpec::new();
    for token in tokens {
        match sort_entry(token) {
            Some((field, direction)) => spec.insert(field, direction),
            None => tracing::warn!(token = %token, "invalid sort entry ignored"),
        }
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_mixed(spec: &SortSpec) {
        assert_eq!(spec.len(), 3);
        assert_eq!(spec.get("field1"), Some(SortDirection::Ascending));
        assert_eq!(spec.get("field2"), Some(SortDirection::Descending));
        assert_eq!(spec.get("field3"), Some(SortDirection::Ascending));
    }

    #[test]
    fn test_sort_entry() {
        assert_eq!(
            sort_entry("name"),
            Some(("name".to_string(), SortDirection::Ascending))
        );
        assert_eq!(
            sort_entry("-age"),
            Some(("age".to_string(), SortDirection::Descending))
        );
        // only the first dash is a direction marker
        assert_eq!(
            sort_entry("--x"),
            Some(("-x".to_string(), SortDirection::Descending))
        );
    }

    #[test]
    fn test_bare_dash_and_blank_are_rejected() {
        assert_eq!(sort_entry("-"), None);
        assert_eq!(sort_entry(""), None);
        assert_eq!(sort_entry("   "), None);
    }

    #[test]
    fn test_single_string() {
        let spec = parse_sort(&"name".into());
        assert_eq!(spec.len(), 1);
        assert_eq!(spec.get("name"), Some(SortDirection::Ascending));
    }

    #[test]
    fn test_all_forms_and_permutations_agree() {
        let permutations = [
            ["field1", "-field2", "field3"],
            ["field1", "field3", "-field2"],
            ["-field2", "field1", "field3"],
            ["-field2", "field3", "field1"],
            ["field3", "field1", "-field2"],
            ["field3", "-field2", "field1"],
        ];
        for tokens in permutations {
            assert_mixed(&parse_sort(&SortInput::Text(tokens.join(" "))));
            assert_mixed(&parse_sort(&tokens.to_vec().into()));
        }
    }

    #[test]
    fn test_preserves_order() {
        let spec = parse_sort(&"b -a c".into());
        let fields: Vec<&str> = spec.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_later_duplicate_overwrites_direction() {
        let spec = parse_sort(&vec!["name", "age", "-name"].into());
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.get("name"), Some(SortDirection::Descending));
        let fields: Vec<&str> = spec.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["name", "age"]);
    }

    #[test]
    fn test_extra_whitespace_is_ignored() {
        let spec = parse_sort(&"  name    -age  ".into());
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.get("age"), Some(SortDirection::Descending));
    }

    #[test]
    fn test_empty_input_yields_empty_spec() {
        assert!(parse_sort(&"".into()).is_empty());
        assert!(parse_sort(&"    ".into()).is_empty());
        assert!(parse_sort(&SortInput::Fields(vec![])).is_empty());
        assert!(parse_sort(&vec!["-", ""].into()).is_empty());
    }

    #[test]
    fn test_deserialize_both_forms() {
        let text: SortInput = serde_json::from_str(r#""name -age""#).unwrap();
        assert_eq!(text, SortInput::Text("name -age".to_string()));
        let list: SortInput = serde_json::from_str(r#"["name", "-age"]"#).unwrap();
        assert_eq!(
            list,
            SortInput::Fields(vec!["name".to_string(), "-age".to_string()])
        );
    }
}
