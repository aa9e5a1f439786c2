//! Response and error envelopes
//!
//! The transport never raises: a call ends either in an [`ApiResponse`] or an
//! [`ApiErrorResponse`], both carrying status and headers.

use crate::descriptor::ApiCallItem;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Response headers, names lower-cased, repeated values joined with `", "`
pub type Headers = BTreeMap<String, String>;

/// Status used for failures that never reached the server
pub const NETWORK_FAILURE_STATUS: u16 = 0;

/// Decoded response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseBody {
    /// Parsed JSON
    Json(Value),
    /// Non-JSON text
    Text(String),
    /// Opaque blob, for `binary_response` calls
    Binary(Bytes),
    /// No content
    Empty,
}

impl ResponseBody {
    /// Whether the body counts as data for caching purposes
    ///
    /// A JSON `null` is treated as no data.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::Json(Value::Null))
    }

    /// The JSON value, if this is a JSON body
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Successful response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: ResponseBody,
}

impl ApiResponse {
    /// A `200 OK` JSON response with no headers
    #[must_use]
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: ResponseBody::Json(body),
        }
    }
}

/// Failed response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// HTTP status code, or [`NETWORK_FAILURE_STATUS`] when no response arrived
    pub status: u16,
    /// Response headers (empty for network failures)
    pub headers: Headers,
    /// Error body returned by the server
    pub error: ResponseBody,
    /// Human-readable summary of the failure
    pub message: String,
    /// URL that was requested
    pub url: String,
}

impl ApiErrorResponse {
    /// Error envelope for a request that never produced a response
    #[must_use]
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: NETWORK_FAILURE_STATUS,
            headers: Headers::new(),
            error: ResponseBody::Empty,
            message: message.into(),
            url: url.into(),
        }
    }

    /// Error envelope for a non-2xx response
    #[must_use]
    pub fn http(status: u16, url: impl Into<String>, headers: Headers, error: ResponseBody) -> Self {
        let url = url.into();
        Self {
            status,
            headers,
            error,
            message: format!("Http failure response for {url}: {status}"),
            url,
        }
    }
}

/// A failed request paired with its error envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFailure {
    /// The descriptor that failed
    pub request: ApiCallItem,
    /// What the transport reported
    pub response: ApiErrorResponse,
}

/// Outcome of routing a failure through error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorHandling {
    /// The configured error handler was invoked
    Reported,
    /// The request opted out; the call site handles the error itself
    HandledLocally,
}
