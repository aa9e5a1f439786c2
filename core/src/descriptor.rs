//! Request descriptors
//!
//! An [`ApiCallItem`] is plain data describing one API call. It is built with
//! [`ApiCallItem::new`] and the `with_*` methods; every optional field has the
//! default documented on the field.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// HTTP verb of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
}

impl HttpMethod {
    /// Upper-case wire name of the method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a supported HTTP verb
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// A file selected for a multipart upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    /// File name sent in the part's `Content-Disposition`
    pub file_name: String,
    /// MIME type of the part, if known
    pub content_type: Option<String>,
    /// Raw file content
    pub bytes: Bytes,
}

impl UploadFile {
    /// Create an upload part from a file name and its content
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Set the MIME type of the part
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Structured data, sent as JSON unless another [`BodyEncoding`] is chosen
    Json(Value),
    /// Files; with `binary_upload` set only the first one is sent
    Files(Vec<UploadFile>),
}

impl Payload {
    /// Whether the payload carries nothing to upload
    ///
    /// An empty file list or an empty JSON array counts as empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Json(Value::Array(items)) => items.is_empty(),
            Self::Json(Value::Null) => true,
            Self::Json(_) => false,
            Self::Files(files) => files.is_empty(),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<UploadFile>> for Payload {
    fn from(files: Vec<UploadFile>) -> Self {
        Self::Files(files)
    }
}

/// How a JSON payload is serialized into the request body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyEncoding {
    /// `application/json`
    #[default]
    Json,
    /// `application/x-www-form-urlencoded` from the payload's top-level pairs
    UrlEncoded,
    /// `multipart/form-data` from the payload's top-level pairs
    FormData,
}

/// Declarative description of one API call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiCallItem {
    /// Path appended to the base URL
    pub path: String,
    /// Base URL; the configured default is used when `None`
    pub api: Option<String>,
    /// Replaces `path` when computing the request identity
    pub id_override: Option<String>,
    /// Request payload; its presence implies `POST` unless `method` is set
    pub payload: Option<Payload>,
    /// Explicit HTTP verb
    pub method: Option<HttpMethod>,
    /// Inject `Authorization: Bearer <token>` before sending (default `false`)
    pub needs_auth: bool,
    /// Reuse fresh cached data instead of calling the network (default `false`)
    pub use_cache: bool,
    /// Maximum age of cached data; `None` never expires by time
    pub cache_timeout: Option<Duration>,
    /// Multipart field name for uploading the payload's first element
    pub binary_upload: Option<String>,
    /// Treat the response body as an opaque blob (default `false`)
    pub binary_response: bool,
    /// Body serialization for JSON payloads (default [`BodyEncoding::Json`])
    pub body_encoding: BodyEncoding,
    /// Headers appended verbatim; entries without a value are skipped
    pub extra_headers: BTreeMap<String, Option<String>>,
    /// Keep failures away from the global error handler (default `false`)
    pub local_error_handling: bool,
}

impl ApiCallItem {
    /// Describe a call to `path` with every other field at its default
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.api = Some(api.into());
        self
    }

    /// Override the identity used to index the state store
    #[must_use]
    pub fn with_id_override(mut self, id: impl Into<String>) -> Self {
        self.id_override = Some(id.into());
        self
    }

    /// Attach a payload
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Set the HTTP verb explicitly
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Require a bearer token
    #[must_use]
    pub const fn with_auth(mut self) -> Self {
        self.needs_auth = true;
        self
    }

    /// Enable the response cache, optionally bounded by a timeout
    ///
    /// `None` and a zero timeout both keep cached data forever.
    #[must_use]
    pub const fn with_cache(mut self, timeout: Option<Duration>) -> Self {
        self.use_cache = true;
        self.cache_timeout = timeout;
        self
    }

    /// Upload the payload's first element under `field`
    #[must_use]
    pub fn with_binary_upload(mut self, field: impl Into<String>) -> Self {
        self.binary_upload = Some(field.into());
        self
    }

    /// Receive the body as an opaque blob
    #[must_use]
    pub const fn with_binary_response(mut self) -> Self {
        self.binary_response = true;
        self
    }

    /// Choose how a JSON payload is encoded
    #[must_use]
    pub const fn with_body_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.body_encoding = encoding;
        self
    }

    /// Append a header; a `None` value is recorded but never sent
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.extra_headers.insert(name.into(), value);
        self
    }

    /// Handle failures at the call site instead of the global handler
    #[must_use]
    pub const fn with_local_error_handling(mut self) -> Self {
        self.local_error_handling = true;
        self
    }

    /// The verb that will be sent: explicit `method`, else `POST` with a
    /// payload, else `GET`
    #[must_use]
    pub const fn effective_method(&self) -> HttpMethod {
        match (self.method, &self.payload) {
            (Some(method), _) => method,
            (None, Some(_)) => HttpMethod::Post,
            (None, None) => HttpMethod::Get,
        }
    }

    /// Whether the payload is present and non-empty
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.payload.as_ref().is_some_and(|p| !p.is_empty())
    }
}
