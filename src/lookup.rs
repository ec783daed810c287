//! Point lookups and autocomplete suggestions over the live dataset.
//!
//! Keys are compared after trimming and upper-casing both sides, so
//! `" abc123 "`, `"ABC123"` and `"abc123"` all find a stored `"Abc123"`.

use crate::config::Config;
use crate::dataset::Dataset;
use crate::dataset::Row;
use serde::Deserialize;
use serde::Serialize;

/// Default logical name of the key column
pub const DEFAULT_KEY_COLUMN: &str = "MILL COIL NO";

/// Default maximum number of suggestions
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// How a partial query is matched against key values.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// The key contains the partial anywhere
    #[default]
    Contains,
    /// The key starts with the partial
    Prefix,
}

impl MatchPolicy {
    fn matches(&self, value: &str, partial: &str) -> bool {
        match self {
            MatchPolicy::Contains => value.contains(partial),
            MatchPolicy::Prefix => value.starts_with(partial),
        }
    }
}

/// Trims and upper-cases a key or query
pub fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Finds the column whose trimmed, upper-cased name equals the upper-cased logical name.
///
/// Only the first row's columns are inspected; an empty dataset has no key column.
pub fn resolve_key_column<'a>(dataset: &'a Dataset, logical_name: &str) -> Option<&'a str> {
    let wanted = logical_name.to_uppercase();
    dataset
        .rows()
        .first()?
        .columns()
        .find(|column| normalize(column) == wanted)
}

/// Returns the first row whose normalized key equals the normalized query.
pub fn lookup_exact<'a>(dataset: &'a Dataset, column: &str, query: &str) -> Option<&'a Row> {
    let query = normalize(query);
    if query.is_empty() {
        return None;
    }
    dataset.rows().iter().find(|row| key_of(row, column) == query)
}

/// Returns up to `limit` normalized key values, in dataset order, that match the partial.
///
/// Values are not deduplicated. An empty partial yields nothing.
pub fn suggest(dataset: &Dataset, column: &str, partial: &str, limit: usize, policy: MatchPolicy) -> Vec<String> {
    let partial = normalize(partial);
    if partial.is_empty() {
        return Vec::new();
    }
    dataset
        .rows()
        .iter()
        .map(|row| key_of(row, column))
        .filter(|value| policy.matches(value, &partial))
        .take(limit)
        .collect()
}

/// Normalized key value of a row; a missing cell reads as empty
fn key_of(row: &Row, column: &str) -> String {
    row.get(column)
        .map(|value| normalize(&value.to_string()))
        .unwrap_or_default()
}

/// Lookup settings bundled for repeated queries against whichever dataset is live.
#[derive(Clone, Debug, PartialEq)]
pub struct LookupEngine {
    key_column: String,
    policy: MatchPolicy,
    limit: usize,
}

impl Default for LookupEngine {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_owned(),
            policy: MatchPolicy::default(),
            limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

impl LookupEngine {
    pub fn new(key_column: impl Into<String>, policy: MatchPolicy, limit: usize) -> Self {
        Self {
            key_column: key_column.into(),
            policy,
            limit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.key_column.as_str(), config.match_policy, config.suggestion_limit)
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Exact lookup through the resolved key column
    pub fn lookup<'a>(&self, dataset: &'a Dataset, query: &str) -> Option<&'a Row> {
        let column = resolve_key_column(dataset, &self.key_column)?;
        lookup_exact(dataset, column, query)
    }

    /// Suggestions with the configured policy; `limit` overrides the configured one
    pub fn suggest(&self, dataset: &Dataset, partial: &str, limit: Option<usize>) -> Vec<String> {
        match resolve_key_column(dataset, &self.key_column) {
            Some(column) => suggest(dataset, column, partial, limit.unwrap_or(self.limit), self.policy),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CellValue;
    use crate::dataset::SourceKind;

    fn coils(values: &[&str]) -> Dataset {
        let rows = values
            .iter()
            .map(|value| Row::from([(" Mill Coil No ", CellValue::from(*value)), ("GRADE", CellValue::from("S355"))]))
            .collect();
        Dataset::new(rows, "coil-data.xlsx", SourceKind::Remote)
    }

    #[test]
    fn resolve_key_column_ignores_case_and_padding() {
        let dataset = coils(&["C100"]);
        assert_eq!(resolve_key_column(&dataset, "MILL COIL NO"), Some(" Mill Coil No "));
        assert_eq!(resolve_key_column(&dataset, "mill coil no"), Some(" Mill Coil No "));
        assert_eq!(resolve_key_column(&dataset, "HEAT NO"), None);
        assert_eq!(resolve_key_column(&Dataset::empty(SourceKind::Remote), "MILL COIL NO"), None);
    }

    #[test]
    fn lookup_is_case_and_whitespace_insensitive() {
        let dataset = coils(&["C100", "Abc123", "C200"]);
        let column = resolve_key_column(&dataset, DEFAULT_KEY_COLUMN).unwrap();
        for query in [" abc123 ", "ABC123", "abc123"] {
            let row = lookup_exact(&dataset, column, query).unwrap();
            assert_eq!(row.get(column), Some(&CellValue::from("Abc123")));
        }
        assert!(lookup_exact(&dataset, column, "").is_none());
        assert!(lookup_exact(&dataset, column, "   ").is_none());
    }

    #[test]
    fn lookup_first_match_wins() {
        let rows = vec![
            Row::from([("MILL COIL NO", CellValue::from("c100")), ("SEQ", CellValue::Number(1.0))]),
            Row::from([("MILL COIL NO", CellValue::from("C100 ")), ("SEQ", CellValue::Number(2.0))]),
        ];
        let dataset = Dataset::new(rows, "dupes.xlsx", SourceKind::LocalUpload);
        let row = lookup_exact(&dataset, "MILL COIL NO", "C100").unwrap();
        assert_eq!(row.get("SEQ"), Some(&CellValue::Number(1.0)));
    }

    #[test]
    fn lookup_numeric_keys() {
        let rows = vec![Row::from([("MILL COIL NO", CellValue::Number(12345.0))])];
        let dataset = Dataset::new(rows, "numbers.xlsx", SourceKind::Remote);
        assert!(lookup_exact(&dataset, "MILL COIL NO", "12345").is_some());
        assert_eq!(suggest(&dataset, "MILL COIL NO", "234", 10, MatchPolicy::Contains), vec!["12345"]);
    }

    #[test]
    fn coil_scenario() {
        let dataset = coils(&["C100", "C101", "C200"]);
        let engine = LookupEngine::default();

        let row = engine.lookup(&dataset, "c101").unwrap();
        assert_eq!(row.get(" Mill Coil No "), Some(&CellValue::from("C101")));
        assert_eq!(engine.suggest(&dataset, "C1", None), vec!["C100", "C101"]);
        assert!(engine.lookup(&dataset, "Z999").is_none());
    }

    #[test]
    fn suggestions_respect_limit_and_policy() {
        let values: Vec<String> = (0..25).map(|i| format!("C{:03}", i)).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let dataset = coils(&refs);
        let column = resolve_key_column(&dataset, DEFAULT_KEY_COLUMN).unwrap();

        assert_eq!(suggest(&dataset, column, "C", 10, MatchPolicy::Contains).len(), 10);
        assert_eq!(suggest(&dataset, column, "c0", 3, MatchPolicy::Prefix), vec!["C000", "C001", "C002"]);
        assert_eq!(suggest(&dataset, column, "01", 10, MatchPolicy::Contains), vec!["C001", "C010", "C011", "C012", "C013", "C014", "C015", "C016", "C017", "C018"]);
        assert!(suggest(&dataset, column, "01", 10, MatchPolicy::Prefix).is_empty());
        assert!(suggest(&dataset, column, "", 10, MatchPolicy::Contains).is_empty());
        assert!(suggest(&dataset, column, "C", 0, MatchPolicy::Contains).is_empty());
    }

    #[test]
    fn suggestions_keep_duplicates() {
        let dataset = coils(&["C100", "c100", "C101"]);
        let engine = LookupEngine::new(DEFAULT_KEY_COLUMN, MatchPolicy::Contains, 10);
        assert_eq!(engine.suggest(&dataset, "100", None), vec!["C100", "C100"]);
        assert_eq!(engine.suggest(&dataset, "C", Some(1)), vec!["C100"]);
    }

    #[test]
    fn empty_dataset_finds_nothing() {
        let dataset = Dataset::empty(SourceKind::Cache);
        let engine = LookupEngine::default();
        assert!(engine.lookup(&dataset, "C100").is_none());
        assert!(engine.suggest(&dataset, "C", None).is_empty());
    }

    #[test]
    fn policy_from_config_text() {
        #[derive(Deserialize)]
        struct Holder {
            policy: MatchPolicy,
        }
        let holder: Holder = toml::from_str(r#"policy = "prefix""#).unwrap();
        assert_eq!(holder.policy, MatchPolicy::Prefix);
    }
}
