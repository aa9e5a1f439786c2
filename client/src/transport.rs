//! `reqwest`-backed HTTP transport

use api_caller_core::descriptor::HttpMethod;
use api_caller_core::envelope::{ApiErrorResponse, ApiResponse, Headers, ResponseBody};
use api_caller_core::environment::HttpTransport;
use api_caller_core::transport::{FormValue, RequestBody, ResponseType, TransportRequest};
use bytes::Bytes;
use futures::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};

use crate::config::ApiCallerConfig;
use crate::error::ApiCallerError;

/// Default [`HttpTransport`], backed by a shared `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Transport with a default client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport using an existing client
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Transport built from service configuration
    ///
    /// # Errors
    ///
    /// Returns [`ApiCallerError::ClientBuild`] if the user agent is not a valid
    /// header value or the TLS backend cannot be initialised.
    pub fn from_config(config: &ApiCallerConfig) -> Result<Self, ApiCallerError> {
        let mut builder = Client::builder();
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn execute(client: Client, request: TransportRequest) -> Result<ApiResponse, ApiErrorResponse> {
        let url = request.url.clone();
        let mut builder = client.request(to_reqwest_method(request.method), &url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::UrlEncoded(pairs) => builder.form(&pairs),
            RequestBody::Multipart(parts) => {
                let mut form = Form::new();
                for part in parts {
                    form = match part.value {
                        FormValue::Text(text) => form.text(part.name, text),
                        FormValue::File(file) => {
                            let mut file_part =
                                Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
                            if let Some(content_type) = &file.content_type {
                                file_part = file_part
                                    .mime_str(content_type)
                                    .map_err(|e| ApiErrorResponse::network(&url, e.to_string()))?;
                            }
                            form.part(part.name, file_part)
                        },
                    };
                }
                builder.multipart(form)
            },
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ApiErrorResponse::network(&url, e.to_string()))?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiErrorResponse::network(&url, e.to_string()))?;
        let body = decode_body(bytes, request.response_type);

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                headers,
                body,
            })
        } else {
            Err(ApiErrorResponse::http(status.as_u16(), url, headers, body))
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, Result<ApiResponse, ApiErrorResponse>> {
        Box::pin(Self::execute(self.client.clone(), request))
    }
}

const fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

/// Lower-cased header names; repeated headers are joined with `", "`
fn collect_headers(map: &reqwest::header::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    headers
}

fn decode_body(bytes: Bytes, response_type: ResponseType) -> ResponseBody {
    match response_type {
        ResponseType::Blob => ResponseBody::Binary(bytes),
        ResponseType::Json if bytes.is_empty() => ResponseBody::Empty,
        ResponseType::Json => serde_json::from_slice(&bytes).map_or_else(
            |_| ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned()),
            ResponseBody::Json,
        ),
    }
}
