//! # api-caller core
//!
//! Core traits and types for issuing HTTP requests through a centralized,
//! observable state store.
//!
//! Every API call is described by an [`ApiCallItem`](descriptor::ApiCallItem).
//! The descriptor maps to a string identity, and that identity indexes a
//! per-request lifecycle record ([`ApiState`](state::ApiState)) inside the
//! [`ApiSubState`](state::ApiSubState) map. The reducer that drives the
//! lifecycle lives in the `api-caller` crate; this crate holds the pieces that
//! are pure data and pure functions.
//!
//! ## Core Concepts
//!
//! - **State**: `ApiSubState`, identity -> `Arc<ApiState>`
//! - **Action**: [`ApiAction`](action::ApiAction), the six lifecycle transitions
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```
//! use api_caller_core::descriptor::ApiCallItem;
//! use api_caller_core::selectors::state_id;
//!
//! let item = ApiCallItem::new("/users").with_api("https://example.com");
//! assert_eq!(state_id(&item), "https://example.com/users");
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod action;
pub mod descriptor;
pub mod envelope;
pub mod environment;
pub mod selectors;
pub mod state;
pub mod transport;

/// The reducer abstraction
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// Applies actions to state and describes the follow-up work
    ///
    /// `reduce` mutates the state in place and never performs I/O itself;
    /// anything asynchronous is returned as an [`Effect`] for the store to run.
    ///
    /// ```ignore
    /// impl Reducer for ApiReducer {
    ///     type State = ApiSubState;
    ///     type Action = ApiAction;
    ///     type Environment = ApiEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut ApiSubState,
    ///         action: ApiAction,
    ///         env: &ApiEnvironment,
    ///     ) -> SmallVec<[Effect<ApiAction>; 4]> {
    ///         match action {
    ///             ApiAction::ClearAllState => {
    ///                 state.clear();
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// State owned by the store
        type State;

        /// Inputs, including the ones effects feed back
        type Action;

        /// Injected collaborators (clock, executor, ...)
        type Environment;

        /// Apply `action` to `state`
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Descriptions of asynchronous work returned by reducers
pub mod effect {
    use futures::future::BoxFuture;
    use std::future::Future;

    /// Work for the store to run after a reduction
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Async computation; a `Some` output is reduced as the next action
        Future(BoxFuture<'static, Option<Action>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => write!(f, "Effect::None"),
                Self::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async computation whose output is fed back to the store
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Self::Future(Box::pin(fut))
        }

        /// Whether running this effect can produce an action
        #[must_use]
        pub const fn is_future(&self) -> bool {
            matches!(self, Self::Future(_))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;

    #[test]
    fn effect_debug_hides_future() {
        let effect: Effect<u8> = Effect::future(async { Some(1) });
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
        assert!(effect.is_future());
        assert!(!Effect::<u8>::None.is_future());
    }
}
