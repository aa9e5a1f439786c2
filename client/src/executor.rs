//! Turns descriptors into HTTP calls

use api_caller_core::descriptor::{ApiCallItem, BodyEncoding, Payload};
use api_caller_core::envelope::{ApiErrorResponse, ApiResponse};
use api_caller_core::environment::{HttpTransport, TokenSource};
use api_caller_core::transport::{
    FormPart, FormValue, RequestBody, ResponseType, TransportRequest, form_pairs,
};
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Field name used for file payloads sent without `binary_upload`
pub const DEFAULT_FILE_FIELD: &str = "file";

/// Executes requests described by [`ApiCallItem`]s
///
/// Holds no request state: every call resolves its own token and produces
/// exactly one outcome.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    token_source: Arc<dyn TokenSource>,
    default_api_url: String,
}

impl RequestExecutor {
    /// Create an executor
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        token_source: Arc<dyn TokenSource>,
        default_api_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            token_source,
            default_api_url: default_api_url.into(),
        }
    }

    /// Base URL used for descriptors without `api`
    #[must_use]
    pub fn default_api_url(&self) -> &str {
        &self.default_api_url
    }

    /// Build the request for `item`, without authorization
    ///
    /// The method is `item.method` if given, otherwise POST when a payload is
    /// present and GET when not. The URL is the base URL followed by `path`,
    /// with no normalization.
    #[must_use]
    pub fn build_request(&self, item: &ApiCallItem) -> TransportRequest {
        let api = item.api.as_deref().unwrap_or(&self.default_api_url);

        let headers = item
            .extra_headers
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.clone(), v.clone())))
            .collect();

        TransportRequest {
            method: item.effective_method(),
            url: format!("{api}{}", item.path),
            headers,
            body: build_body(item),
            response_type: if item.binary_response {
                ResponseType::Blob
            } else {
                ResponseType::Json
            },
        }
    }

    /// Perform the call described by `item`
    ///
    /// When `needs_auth` is set, exactly one token is taken from the token
    /// source and sent as `Authorization: Bearer <token>`. The returned future
    /// never panics; every failure is an [`ApiErrorResponse`].
    pub fn make_request(&self, item: &ApiCallItem) -> BoxFuture<'static, Result<ApiResponse, ApiErrorResponse>> {
        let mut request = self.build_request(item);
        let token = item.needs_auth.then(|| self.token_source.token());
        let transport = Arc::clone(&self.transport);

        let span = tracing::debug_span!(
            "api_request",
            method = %request.method,
            url = %request.url,
        );

        Box::pin(
            async move {
                if let Some(token) = token {
                    let token = token.await;
                    request
                        .headers
                        .push(("Authorization".to_string(), format!("Bearer {token}")));
                }

                let method = request.method.as_str();
                metrics::counter!("api_caller.requests.total", "method" => method).increment(1);
                tracing::debug!("Sending request");

                let outcome = transport.send(request).await;
                match &outcome {
                    Ok(response) => {
                        tracing::debug!(status = response.status, "Request succeeded");
                        metrics::counter!("api_caller.responses", "outcome" => "success").increment(1);
                    },
                    Err(error) => {
                        tracing::debug!(status = error.status, message = %error.message, "Request failed");
                        metrics::counter!("api_caller.responses", "outcome" => "failure").increment(1);
                    },
                }
                outcome
            }
            .instrument(span),
        )
    }
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("default_api_url", &self.default_api_url)
            .finish_non_exhaustive()
    }
}

fn build_body(item: &ApiCallItem) -> RequestBody {
    if let Some(field) = &item.binary_upload {
        match item.payload.as_ref().and_then(first_upload) {
            Some(value) => {
                return RequestBody::Multipart(vec![FormPart {
                    name: field.clone(),
                    value,
                }]);
            },
            None => {
                tracing::warn!(
                    field = %field,
                    "No file selected for upload but binaryUpload field name is set"
                );
                return RequestBody::Empty;
            },
        }
    }

    match &item.payload {
        None => RequestBody::Empty,
        Some(Payload::Files(files)) => RequestBody::Multipart(
            files
                .iter()
                .map(|file| FormPart {
                    name: DEFAULT_FILE_FIELD.to_string(),
                    value: FormValue::File(file.clone()),
                })
                .collect(),
        ),
        Some(Payload::Json(value)) => match item.body_encoding {
            BodyEncoding::Json => RequestBody::Json(value.clone()),
            BodyEncoding::UrlEncoded => RequestBody::UrlEncoded(form_pairs(value)),
            BodyEncoding::FormData => RequestBody::Multipart(
                form_pairs(value)
                    .into_iter()
                    .map(|(name, text)| FormPart {
                        name,
                        value: FormValue::Text(text),
                    })
                    .collect(),
            ),
        },
    }
}

/// First element of an upload payload, if there is one
///
/// A JSON array contributes its first element; any other non-null JSON value
/// is uploaded whole.
fn first_upload(payload: &Payload) -> Option<FormValue> {
    match payload {
        Payload::Files(files) => files.first().cloned().map(FormValue::File),
        Payload::Json(Value::Null) => None,
        Payload::Json(Value::Array(items)) => items.first().map(text_value),
        Payload::Json(other) => Some(text_value(other)),
    }
}

fn text_value(value: &Value) -> FormValue {
    match value {
        Value::String(s) => FormValue::Text(s.clone()),
        other => FormValue::Text(other.to_string()),
    }
}
