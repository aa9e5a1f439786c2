//! HTTP requests described as plain data
//!
//! The executor turns a descriptor into a [`TransportRequest`]; an
//! [`HttpTransport`](crate::environment::HttpTransport) performs it. Keeping
//! the request as data lets tests inspect exactly what would be sent.

use crate::descriptor::{HttpMethod, UploadFile};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One part of a `multipart/form-data` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormPart {
    /// Field name
    pub name: String,
    /// Field content
    pub value: FormValue,
}

/// Content of a multipart field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormValue {
    /// Plain text field
    Text(String),
    /// File field
    File(UploadFile),
}

/// Request body
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// JSON document
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs
    UrlEncoded(Vec<(String, String)>),
    /// `multipart/form-data` parts
    Multipart(Vec<FormPart>),
}

/// How the response body should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseType {
    /// Parse JSON, falling back to text
    #[default]
    Json,
    /// Keep the raw bytes
    Blob,
}

/// A fully-resolved HTTP request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportRequest {
    /// HTTP verb
    pub method: HttpMethod,
    /// Absolute or relative URL, used as-is
    pub url: String,
    /// Request headers in insertion order
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: RequestBody,
    /// How to read the response body
    pub response_type: ResponseType,
}

impl TransportRequest {
    /// First value of header `name` (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Flatten a JSON object into string pairs for form encodings
///
/// Strings are used verbatim, `null` entries are dropped, and every other
/// value is rendered as compact JSON. A non-object value yields no pairs.
#[must_use]
pub fn form_pairs(value: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = value else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key.clone(), s.clone())),
            other => Some((key.clone(), other.to_string())),
        })
        .collect()
}
