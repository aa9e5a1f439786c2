//! Per-request lifecycle records and the state store that holds them

use crate::envelope::{ApiErrorResponse, Headers, ResponseBody};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Lifecycle record of one request identity
///
/// The default record has every flag off and every value unset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiState {
    /// A request is in flight
    pub loading: bool,
    /// The last completion was a success (or a cache hit)
    pub success: bool,
    /// The last completion was a failure
    pub error: bool,
    /// Body of the last successful response
    pub data: Option<ResponseBody>,
    /// Envelope of the last failure
    pub error_data: Option<ApiErrorResponse>,
    /// Headers of the last response
    pub headers: Headers,
    /// When the last request was dispatched
    pub fired: Option<DateTime<Utc>>,
    /// When the last request completed
    pub returned: Option<DateTime<Utc>>,
}

impl ApiState {
    /// `success || error`
    #[must_use]
    pub const fn finished(&self) -> bool {
        self.success || self.error
    }
}

static INITIAL_API_STATE: LazyLock<Arc<ApiState>> = LazyLock::new(|| Arc::new(ApiState::default()));

/// The state store: request identity -> lifecycle record
///
/// Records are held behind `Arc` and only ever replaced as a whole, so a
/// snapshot of the store never exposes a half-updated record and cloning the
/// map is cheap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiSubState {
    entries: HashMap<String, Arc<ApiState>>,
}

impl ApiSubState {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `id`, or the shared default record when unknown
    #[must_use]
    pub fn get(&self, id: &str) -> Arc<ApiState> {
        self.entries
            .get(id)
            .map_or_else(|| Arc::clone(&INITIAL_API_STATE), Arc::clone)
    }

    /// Replace the record for `id` with `update` applied to a copy of the
    /// current (or default) record
    pub fn update<F>(&mut self, id: &str, update: F)
    where
        F: FnOnce(&mut ApiState),
    {
        let mut next = ApiState::clone(&self.get(id));
        update(&mut next);
        self.entries.insert(id.to_string(), Arc::new(next));
    }

    /// Reset `id` to the default record
    pub fn reset(&mut self, id: &str) {
        self.entries
            .insert(id.to_string(), Arc::clone(&INITIAL_API_STATE));
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether a record has ever been stored for `id`
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(identity, record)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<ApiState>)> {
        self.entries.iter().map(|(id, state)| (id.as_str(), state))
    }
}
