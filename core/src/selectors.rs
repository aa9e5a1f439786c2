//! Request identity, cache freshness and read-only projections of the store

use crate::descriptor::ApiCallItem;
use crate::envelope::{ApiErrorResponse, Headers, ResponseBody};
use crate::state::{ApiState, ApiSubState};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Identity of a descriptor: `api` (or `""`) followed by `id_override` (or `path`)
///
/// No normalization is applied. Fields other than the three above never
/// contribute, so calls differing only in payload share a record.
#[must_use]
pub fn state_id(item: &ApiCallItem) -> String {
    let api = item.api.as_deref().unwrap_or("");
    let path = item.id_override.as_deref().unwrap_or(&item.path);
    format!("{api}{path}")
}

/// Whether `state` holds data that may be reused instead of calling the network
///
/// With a non-zero `timeout`, data older than `timeout` (measured from
/// `returned`) is stale. Otherwise data is fresh for as long as it is present.
#[must_use]
pub fn is_cached(state: &ApiState, timeout: Option<Duration>, now: DateTime<Utc>) -> bool {
    let timeout = timeout.filter(|t| !t.is_zero());
    if let (Some(returned), Some(timeout)) = (state.returned, timeout) {
        // A returned time in the future counts as zero age.
        let age = (now - returned).to_std().unwrap_or(Duration::ZERO);
        if age > timeout {
            return false;
        }
    }
    state.data.as_ref().is_some_and(ResponseBody::is_present)
}

/// Projection helpers over the state store, one per derived view
pub struct ApiSelectors;

impl ApiSelectors {
    /// `loading` flag of `id`
    #[must_use]
    pub fn is_loading(state: &ApiSubState, id: &str) -> bool {
        state.get(id).loading
    }

    /// `success` flag of `id`
    #[must_use]
    pub fn is_succeeded(state: &ApiSubState, id: &str) -> bool {
        state.get(id).success
    }

    /// `error` flag of `id`
    #[must_use]
    pub fn is_failed(state: &ApiSubState, id: &str) -> bool {
        state.get(id).error
    }

    /// `success || error` of `id`
    #[must_use]
    pub fn is_finished(state: &ApiSubState, id: &str) -> bool {
        state.get(id).finished()
    }

    /// Last successful body of `id`
    #[must_use]
    pub fn get_response(state: &ApiSubState, id: &str) -> Option<ResponseBody> {
        state.get(id).data.clone()
    }

    /// Last error envelope of `id`
    #[must_use]
    pub fn get_error_data(state: &ApiSubState, id: &str) -> Option<ApiErrorResponse> {
        state.get(id).error_data.clone()
    }

    /// Last response headers of `id`
    #[must_use]
    pub fn get_headers(state: &ApiSubState, id: &str) -> Headers {
        state.get(id).headers.clone()
    }

    /// Freshness of `id` under `timeout`
    #[must_use]
    pub fn is_cached(
        state: &ApiSubState,
        id: &str,
        timeout: Option<Duration>,
        now: DateTime<Utc>,
    ) -> bool {
        is_cached(&state.get(id), timeout, now)
    }
}
