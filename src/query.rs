//! Query parameters with typed values.
//!
//! [`QueryParams`] keeps insertion order, so the encoded query string is
//! deterministic for a given set of parameters.

use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Encoded as `true` / `false`.
    Bool(bool),
    /// Encoded as an RFC 3339 UTC timestamp with milliseconds, e.g.
    /// `2024-01-02T03:04:05.000Z`.
    Date(DateTime<Utc>),
    /// An integer number.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A plain string.
    String(String),
    /// No value. The key is dropped before encoding.
    Absent,
}

impl QueryValue {
    /// Returns the encoded form of this value, or `None` if it is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetcher::QueryValue;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    /// assert_eq!(
    ///     QueryValue::from(date).encode().as_deref(),
    ///     Some("2024-01-02T03:04:05.000Z")
    /// );
    /// assert_eq!(QueryValue::Absent.encode(), None);
    /// ```
    pub fn encode(&self) -> Option<String> {
        match self {
            QueryValue::Bool(b) => Some(b.to_string()),
            QueryValue::Date(d) => Some(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            QueryValue::Integer(n) => Some(n.to_string()),
            QueryValue::Float(n) => Some(n.to_string()),
            QueryValue::String(s) => Some(s.clone()),
            QueryValue::Absent => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            QueryValue::Bool(b) => serde_json::Value::Bool(*b),
            QueryValue::Integer(n) => serde_json::Value::from(*n),
            QueryValue::Float(n) => serde_json::Value::from(*n),
            QueryValue::Absent => serde_json::Value::Null,
            QueryValue::Date(_) | QueryValue::String(_) => {
                serde_json::Value::String(self.encode().unwrap_or_default())
            }
        }
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for QueryValue {
    fn from(v: DateTime<Utc>) -> Self {
        QueryValue::Date(v)
    }
}

impl From<i32> for QueryValue {
    fn from(v: i32) -> Self {
        QueryValue::Integer(v.into())
    }
}

impl From<u32> for QueryValue {
    fn from(v: u32) -> Self {
        QueryValue::Integer(v.into())
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Integer(v)
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Float(v)
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::String(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::String(v)
    }
}

impl<T> From<Option<T>> for QueryValue
where
    T: Into<QueryValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(QueryValue::Absent)
    }
}

/// An ordered set of query parameters.
///
/// # Examples
///
/// ```
/// use fetcher::QueryParams;
///
/// let params = QueryParams::new()
///     .with("page", 2)
///     .with("draft", false)
///     .with("cursor", None::<String>)
///     .with("q", "a b");
///
/// assert_eq!(params.encode().as_deref(), Some("page=2&draft=false&q=a+b"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, QueryValue)>,
}

impl QueryParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, returning the updated set.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Iterates over parameters that have a value, in insertion order.
    pub fn present(&self) -> impl Iterator<Item = (&str, String)> {
        self.pairs
            .iter()
            .filter_map(|(k, v)| v.encode().map(|v| (k.as_str(), v)))
    }

    /// Returns `true` if no parameter has a value.
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Encodes the present parameters as a query string, without the
    /// leading `?`. Returns `None` when nothing is left to encode.
    pub fn encode(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.present() {
            serializer.append_pair(key, &value);
        }
        Some(serializer.finish())
    }

    /// Appends the present parameters to `url`.
    pub fn append_to(&self, url: &mut Url) {
        if self.is_empty() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        for (key, value) in self.present() {
            pairs.append_pair(key, &value);
        }
    }

    /// JSON view used in request log entries. Absent values are omitted.
    pub(crate) fn to_log_value(&self) -> serde_json::Value {
        let map = self
            .pairs
            .iter()
            .filter(|(_, v)| *v != QueryValue::Absent)
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_absent_values_are_dropped() {
        let params = QueryParams::new()
            .with("a", 1)
            .with("b", QueryValue::Absent)
            .with("c", None::<i64>)
            .with("d", Some("x"));

        assert_eq!(params.encode().as_deref(), Some("a=1&d=x"));
    }

    #[test]
    fn test_all_absent_encodes_nothing() {
        let params = QueryParams::new().with("a", QueryValue::Absent);
        assert!(params.is_empty());
        assert_eq!(params.encode(), None);

        let mut url = Url::parse("http://localhost/path").unwrap();
        params.append_to(&mut url);
        assert_eq!(url.as_str(), "http://localhost/path");
    }

    #[test]
    fn test_date_is_formatted_as_utc_timestamp() {
        let date = Utc.with_ymd_and_hms(2023, 11, 5, 14, 30, 0).unwrap();
        let params = QueryParams::new().with("since", date);

        assert_eq!(
            params.encode().as_deref(),
            Some("since=2023-11-05T14%3A30%3A00.000Z")
        );
    }

    #[test]
    fn test_numbers_and_bools() {
        let params = QueryParams::new()
            .with("n", -7i64)
            .with("f", 1.5)
            .with("whole", 2.0)
            .with("flag", true);

        assert_eq!(
            params.encode().as_deref(),
            Some("n=-7&f=1.5&whole=2&flag=true")
        );
    }

    #[test]
    fn test_append_keeps_existing_query() {
        let mut url = Url::parse("http://localhost/search?x=1").unwrap();
        QueryParams::new().with("y", "two words").append_to(&mut url);
        assert_eq!(url.as_str(), "http://localhost/search?x=1&y=two+words");
    }

    #[test]
    fn test_log_value_omits_absent() {
        let params: QueryParams = vec![("a", QueryValue::from(1)), ("b", QueryValue::Absent)]
            .into_iter()
            .collect();
        assert_eq!(params.to_log_value(), serde_json::json!({ "a": 1 }));
    }
}
