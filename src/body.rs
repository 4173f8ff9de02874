//! Request bodies and their wire encoding.
//!
//! A [`Body`] is classified once, when the request is built: raw kinds go
//! out untouched, JSON values are serialized, and form-encoded requests
//! flatten their payload into `key=value` pairs.

use crate::{Error, Result};
use bytes::Bytes;
use futures::TryStream;
use reqwest::multipart::Form;
use serde::Serialize;
use serde_json::Value;

/// A request body.
///
/// # Examples
///
/// ```
/// use fetcher::Body;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Note { title: String }
///
/// let text = Body::from("plain text");
/// let bytes = Body::from(vec![0x47, 0x49, 0x46]);
/// let json = Body::json(&Note { title: "hi".into() }).unwrap();
/// # let _ = (text, bytes, json);
/// ```
pub enum Body {
    /// A plain string, sent as-is.
    Text(String),
    /// Binary data, sent as-is.
    Bytes(Bytes),
    /// Already-structured URL parameters, sent form-encoded.
    Params(Vec<(String, String)>),
    /// A multipart form. Its boundary determines the Content-Type.
    Multipart(Form),
    /// A streaming body, sent as-is with chunked transfer encoding.
    Stream(reqwest::Body),
    /// A structured value, serialized as JSON (or flattened into a form
    /// when the request is form-encoded).
    Json(Value),
}

impl Body {
    /// Builds a JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if `value` cannot be represented
    /// as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Body::Json)
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Builds a URL parameter body from key/value pairs.
    pub fn params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Body::Params(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builds a streaming body from a stream of byte chunks.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use fetcher::Body;
    ///
    /// let chunks = futures::stream::iter(vec![
    ///     Ok::<_, std::io::Error>(Bytes::from_static(b"hello ")),
    ///     Ok(Bytes::from_static(b"stream")),
    /// ]);
    /// let body = Body::stream(chunks);
    /// assert!(matches!(body, Body::Stream(_)));
    /// ```
    pub fn stream<S>(stream: S) -> Self
    where
        S: TryStream + Send + Sync + 'static,
        S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        Bytes: From<S::Ok>,
    {
        Body::Stream(reqwest::Body::wrap_stream(stream))
    }

    /// Describes the payload for the request log, before any encoding.
    pub(crate) fn describe(&self) -> Value {
        match self {
            Body::Text(s) => Value::String(s.clone()),
            Body::Bytes(b) => serde_json::json!({ "bytes": b.len() }),
            Body::Params(pairs) => Value::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            Body::Multipart(form) => serde_json::json!({ "multipart": form.boundary() }),
            Body::Stream(_) => Value::String("<stream>".to_string()),
            Body::Json(v) => v.clone(),
        }
    }

    /// Encodes the body for the wire, given the request's Content-Type.
    pub(crate) fn encode(self, content_type: &str) -> Result<Encoded> {
        if is_form_urlencoded(content_type) {
            return match self {
                Body::Json(Value::Object(map)) => {
                    let pairs = map
                        .into_iter()
                        .map(|(k, v)| form_value(v).map(|v| (k, v)))
                        .collect::<Result<Vec<_>>>()?;
                    encode_pairs(&pairs)
                }
                Body::Json(other) => Err(Error::Serialization(format!(
                    "form-encoded body must be an object, got {}",
                    other
                ))),
                other => other.encode_plain(),
            };
        }
        self.encode_plain()
    }

    fn encode_plain(self) -> Result<Encoded> {
        match self {
            Body::Text(s) => Ok(Encoded::Body(s.into())),
            Body::Bytes(b) => Ok(Encoded::Body(b.into())),
            Body::Params(pairs) => encode_pairs(&pairs),
            Body::Multipart(form) => Ok(Encoded::Multipart(form)),
            Body::Stream(body) => Ok(Encoded::Body(body)),
            Body::Json(value) => serde_json::to_vec(&value)
                .map(|json| Encoded::Body(json.into()))
                .map_err(|e| Error::Serialization(e.to_string())),
        }
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Body::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Body::Params(p) => f.debug_tuple("Params").field(p).finish(),
            Body::Multipart(form) => f.debug_tuple("Multipart").field(&form.boundary()).finish(),
            Body::Stream(_) => f.write_str("Stream"),
            Body::Json(v) => f.debug_tuple("Json").field(v).finish(),
        }
    }
}

/// A body ready to hand to `reqwest`.
pub(crate) enum Encoded {
    Body(reqwest::Body),
    Multipart(Form),
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Bytes(b.into())
    }
}

impl From<&'static [u8]> for Body {
    fn from(b: &'static [u8]) -> Self {
        Body::Bytes(Bytes::from_static(b))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

impl From<Form> for Body {
    fn from(form: Form) -> Self {
        Body::Multipart(form)
    }
}

impl From<reqwest::Body> for Body {
    fn from(body: reqwest::Body) -> Self {
        Body::Stream(body)
    }
}

impl From<tokio::fs::File> for Body {
    fn from(file: tokio::fs::File) -> Self {
        Body::Stream(file.into())
    }
}

impl From<Value> for Body {
    fn from(v: Value) -> Self {
        Body::Json(v)
    }
}

pub(crate) fn is_form_urlencoded(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("application/x-www-form-urlencoded")
}

fn encode_pairs(pairs: &[(String, String)]) -> Result<Encoded> {
    serde_urlencoded::to_string(pairs)
        .map(|form| Encoded::Body(form.into()))
        .map_err(|e| Error::Serialization(e.to_string()))
}

fn form_value(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        nested => Err(Error::Serialization(format!(
            "form-encoded fields must be scalars, got {}",
            nested
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FORM: &str = "application/x-www-form-urlencoded";

    fn bytes_of(encoded: Encoded) -> Vec<u8> {
        match encoded {
            Encoded::Body(body) => body.as_bytes().expect("buffered body").to_vec(),
            Encoded::Multipart(_) => panic!("expected a buffered body"),
        }
    }

    #[test]
    fn test_json_body_is_serialized() {
        let body = Body::json(&json!({ "x": 1, "y": [true] })).unwrap();
        let wire = bytes_of(body.encode("application/json").unwrap());
        assert_eq!(wire, br#"{"x":1,"y":[true]}"#);
    }

    #[test]
    fn test_text_and_bytes_pass_through() {
        let wire = bytes_of(Body::from("hello world!").encode("text/plain").unwrap());
        assert_eq!(wire, b"hello world!");

        let gif: &'static [u8] = b"GIF89a\x01\x00";
        let wire = bytes_of(Body::from(gif).encode("image/gif").unwrap());
        assert_eq!(wire, gif);
    }

    #[test]
    fn test_text_passes_through_even_when_json_content_type() {
        let wire = bytes_of(Body::from("{\"raw\":true}").encode("application/json").unwrap());
        assert_eq!(wire, b"{\"raw\":true}");
    }

    #[test]
    fn test_form_flattens_object() {
        let body = Body::from(json!({ "name": "a b", "n": 3, "ok": false, "none": null }));
        let wire = bytes_of(body.encode(FORM).unwrap());
        let text = String::from_utf8(wire).unwrap();

        for pair in ["name=a+b", "n=3", "ok=false", "none=null"] {
            assert!(text.split('&').any(|p| p == pair), "missing {pair} in {text}");
        }
    }

    #[test]
    fn test_form_rejects_nested_values() {
        let body = Body::from(json!({ "inner": { "x": 1 } }));
        assert!(matches!(body.encode(FORM), Err(Error::Serialization(_))));

        let body = Body::from(json!([1, 2]));
        assert!(matches!(body.encode(FORM), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_params_are_url_encoded() {
        let body = Body::params([("q", "rust & tokio"), ("page", "1")]);
        let wire = bytes_of(body.encode("application/json").unwrap());
        assert_eq!(wire, b"q=rust+%26+tokio&page=1");
    }

    #[test]
    fn test_describe_reports_payload_before_encoding() {
        assert_eq!(Body::from("hi").describe(), json!("hi"));
        assert_eq!(Body::from(vec![1u8, 2, 3]).describe(), json!({ "bytes": 3 }));
        assert_eq!(
            Body::params([("a", "1")]).describe(),
            json!({ "a": "1" })
        );
        assert_eq!(Body::from(json!({ "k": [1] })).describe(), json!({ "k": [1] }));
    }

    #[test]
    fn test_form_content_type_detection() {
        assert!(is_form_urlencoded("application/x-www-form-urlencoded; charset=UTF-8"));
        assert!(is_form_urlencoded("Application/X-WWW-Form-Urlencoded"));
        assert!(!is_form_urlencoded("application/json"));
    }
}
