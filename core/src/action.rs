//! Lifecycle actions

use crate::descriptor::ApiCallItem;
use crate::envelope::{ApiErrorResponse, ApiResponse};

/// All inputs to the API reducer
#[derive(Debug, Clone, PartialEq)]
pub enum ApiAction {
    /// Dispatch a request (or serve it from the cache)
    Get(ApiCallItem),
    /// The transport returned a success envelope
    GetSuccess {
        /// Originating descriptor
        request: ApiCallItem,
        /// Response envelope
        response: ApiResponse,
    },
    /// The transport returned an error envelope
    GetFail {
        /// Originating descriptor
        request: ApiCallItem,
        /// Error envelope
        response: ApiErrorResponse,
    },
    /// Fresh cached data was reused
    GetFromCache(ApiCallItem),
    /// Reset one identity to the default record
    ClearState(ApiCallItem),
    /// Empty the whole store
    ClearAllState,
}

impl ApiAction {
    /// Stable type tag of the action
    #[must_use]
    pub const fn action_type(&self) -> &'static str {
        match self {
            Self::Get(_) => "[API] Get",
            Self::GetSuccess { .. } => "[API] Get Success",
            Self::GetFail { .. } => "[API] Get Fail",
            Self::GetFromCache(_) => "[API] Get From Cache",
            Self::ClearState(_) => "[API] Clear State",
            Self::ClearAllState => "[API] Clear Full State",
        }
    }

    /// Descriptor the action refers to, if any
    #[must_use]
    pub const fn request(&self) -> Option<&ApiCallItem> {
        match self {
            Self::Get(request)
            | Self::GetFromCache(request)
            | Self::ClearState(request)
            | Self::GetSuccess { request, .. }
            | Self::GetFail { request, .. } => Some(request),
            Self::ClearAllState => None,
        }
    }

    /// Whether this action ends a request's lifecycle
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::GetSuccess { .. } | Self::GetFail { .. } | Self::GetFromCache(_)
        )
    }
}
