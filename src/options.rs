use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

use crate::date::{self, DateLike};
use crate::error::{PosError, Result};

/// Param is the option/data mapping passed with requests.
///
/// Backed by `serde_json::Map`, so key order on the wire is deterministic.
pub type Param = Map<String, Value>;

/// Recognized top-level option keys.
///
/// Keys may carry a bracket-index suffix on the wire (`filter[price]`);
/// only the part before the bracket is checked.
pub const SUPPORTED_OPTIONS: &[&str] = &[
    "filter", "display", "sort", "date", "limit", "page", "action", "id",
];

/// Check an options mapping against the supported grammar.
///
/// Every unrecognized key is reported, deduplicated, not just the first
/// one found. Runs before any network I/O and has no side effects.
pub fn validate_query_options(options: &Param) -> Result<()> {
    let unsupported: BTreeSet<&str> = options
        .keys()
        .map(|key| key.split('[').next().unwrap_or(key.as_str()))
        .filter(|base| !SUPPORTED_OPTIONS.contains(base))
        .collect();

    if !unsupported.is_empty() {
        let listed = unsupported.into_iter().collect::<Vec<_>>().join(", ");
        return Err(PosError::UnsupportedParameter(listed));
    }
    Ok(())
}

/// Pagination defaults injected for data-less GET/HEAD requests.
pub(crate) fn default_options() -> Param {
    let mut map = Param::new();
    map.insert("limit".to_string(), json!(10));
    map.insert("page".to_string(), json!(1));
    map
}

/// Normalize the `start`/`end` members of a `date` option in place.
///
/// The verb layer calls this on its own copy of the options, so the
/// caller's mapping is never mutated.
pub(crate) fn normalize_date_option(options: &mut Param) -> Result<()> {
    let range = match options.get_mut("date") {
        None => return Ok(()),
        Some(Value::Object(range)) => range,
        Some(_) => {
            return Err(PosError::InvalidArgument(
                "date option must be a mapping with start/end values".to_string(),
            ))
        }
    };

    for key in ["start", "end"] {
        if let Some(value) = range.get(key) {
            let normalized = date::normalize_value(value)?;
            range.insert(key.to_string(), Value::String(normalized));
        }
    }
    Ok(())
}

/// Sort direction for a [`Options::sort`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Typed builder over the option mapping.
///
/// Equivalent to assembling a [`Param`] by hand; both forms feed the same
/// validation and dispatch path.
///
/// ```
/// use posrs::{Options, SortOrder};
///
/// let options = Options::new()
///     .filter("price", "lt", 40000)
///     .display(["name", "price", "updated_at"])
///     .sort("price", SortOrder::Asc)
///     .date_range("2021-10-20", "2021-11-20")
///     .limit(2)
///     .action("list");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Options {
    map: Param,
}

impl Options {
    /// Create an empty option set
    pub fn new() -> Self {
        Options::default()
    }

    /// Constrain a field: `filter("price", "lt", 40000)`
    pub fn filter(mut self, field: &str, operator: &str, value: impl Into<Value>) -> Self {
        let entry = self
            .map
            .entry("filter")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(filters) = entry {
            filters.insert(
                field.to_string(),
                json!({ "operator": operator, "value": value.into() }),
            );
        }
        self
    }

    /// Select the fields returned for each item, in order
    pub fn display<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<Value> = fields
            .into_iter()
            .map(|field| Value::String(field.into()))
            .collect();
        self.map.insert("display".to_string(), Value::Array(fields));
        self
    }

    /// Order results by a field
    pub fn sort(mut self, field: &str, order: SortOrder) -> Self {
        let entry = self
            .map
            .entry("sort")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(sorts) = entry {
            sorts.insert(field.to_string(), Value::String(order.as_str().to_string()));
        }
        self
    }

    /// Restrict to records between two date-like bounds.
    ///
    /// Bounds are normalized to the canonical timestamp form immediately,
    /// so unparseable strings resolve to "now" here rather than at
    /// dispatch time.
    pub fn date_range(mut self, start: impl Into<DateLike>, end: impl Into<DateLike>) -> Self {
        self.map.insert(
            "date".to_string(),
            json!({
                "start": date::normalize(&start.into()),
                "end": date::normalize(&end.into()),
            }),
        );
        self
    }

    /// Cap the number of returned items
    pub fn limit(mut self, limit: u32) -> Self {
        self.map.insert("limit".to_string(), json!(limit));
        self
    }

    /// Select a result page
    pub fn page(mut self, page: u32) -> Self {
        self.map.insert("page".to_string(), json!(page));
        self
    }

    /// Name the server-side action for the call
    pub fn action(mut self, action: &str) -> Self {
        self.map
            .insert("action".to_string(), Value::String(action.to_string()));
        self
    }

    /// Address a single record
    pub fn id(mut self, id: i64) -> Self {
        self.map.insert("id".to_string(), json!(id));
        self
    }

    /// Address several records at once
    pub fn ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let ids: Vec<Value> = ids.into_iter().map(|id| json!(id)).collect();
        self.map.insert("id".to_string(), Value::Array(ids));
        self
    }

    /// Consume the builder into the underlying mapping
    pub fn into_param(self) -> Param {
        self.map
    }
}

impl From<Options> for Param {
    fn from(options: Options) -> Param {
        options.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_keys_pass() {
        let mut options = Param::new();
        options.insert("filter".to_string(), json!({}));
        options.insert("display".to_string(), json!(["name"]));
        options.insert("sort".to_string(), json!({"price": "asc"}));
        options.insert("limit".to_string(), json!(10));
        assert!(validate_query_options(&options).is_ok());
    }

    #[test]
    fn test_bracketed_keys_are_checked_by_prefix() {
        let mut options = Param::new();
        options.insert("filter[price]".to_string(), json!("lt:40000"));
        options.insert("sort[name]".to_string(), json!("asc"));
        assert!(validate_query_options(&options).is_ok());
    }

    #[test]
    fn test_every_unknown_key_is_reported_once() {
        let mut options = Param::new();
        options.insert("zorder".to_string(), json!(1));
        options.insert("flags".to_string(), json!(2));
        options.insert("flags[a]".to_string(), json!(3));
        options.insert("limit".to_string(), json!(10));

        match validate_query_options(&options) {
            Err(PosError::UnsupportedParameter(listed)) => {
                assert_eq!(listed, "flags, zorder");
            }
            other => panic!("expected UnsupportedParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_matches_hand_built_mapping() {
        let built: Param = Options::new()
            .filter("price", "lt", 40000)
            .display(["name", "price", "updated_at"])
            .sort("price", SortOrder::Asc)
            .limit(2)
            .action("list")
            .into();

        let mut expected = Param::new();
        expected.insert(
            "filter".to_string(),
            json!({"price": {"operator": "lt", "value": 40000}}),
        );
        expected.insert("display".to_string(), json!(["name", "price", "updated_at"]));
        expected.insert("sort".to_string(), json!({"price": "asc"}));
        expected.insert("limit".to_string(), json!(2));
        expected.insert("action".to_string(), json!("list"));

        assert_eq!(built, expected);
        assert!(validate_query_options(&built).is_ok());
    }

    #[test]
    fn test_date_range_is_normalized_at_build_time() {
        let built: Param = Options::new()
            .date_range("2021-10-20", "2021-11-20")
            .into();
        assert_eq!(
            built.get("date"),
            Some(&json!({"start": "2021-10-20 00:00:00", "end": "2021-11-20 00:00:00"}))
        );
    }

    #[test]
    fn test_normalize_date_option_rejects_non_mapping() {
        let mut options = Param::new();
        options.insert("date".to_string(), json!("2021-10-20"));
        assert!(matches!(
            normalize_date_option(&mut options),
            Err(PosError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_normalize_date_option_rewrites_bounds() {
        let mut options = Param::new();
        options.insert(
            "date".to_string(),
            json!({"start": "2021-10-20", "end": "2021-11-20 10:30:00"}),
        );
        normalize_date_option(&mut options).unwrap();
        assert_eq!(
            options.get("date"),
            Some(&json!({"start": "2021-10-20 00:00:00", "end": "2021-11-20 10:30:00"}))
        );
    }

    #[test]
    fn test_default_options() {
        let defaults = default_options();
        assert_eq!(defaults.get("limit"), Some(&json!(10)));
        assert_eq!(defaults.get("page"), Some(&json!(1)));
    }
}
