//! Given-When-Then harness for reducers

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use api_caller_core::{effect::Effect, reducer::Reducer};

enum Check<S, A> {
    State(Box<dyn FnOnce(&S)>),
    Effects(Box<dyn FnOnce(&[Effect<A>])>),
}

/// Runs one action through a reducer and checks the outcome
///
/// Checks run in the order they were added, after the reduction.
///
/// ```ignore
/// use api_caller_testing::{ReducerTest, assertions};
///
/// ReducerTest::new(ApiReducer)
///     .with_env(test_environment())
///     .given_state(ApiSubState::new())
///     .when_action(ApiAction::Get(ApiCallItem::new("/users")))
///     .then_state(|state| assert!(state.get("/users").loading))
///     .then_effects(assertions::assert_has_future_effect)
///     .run();
/// ```
pub struct ReducerTest<R: Reducer> {
    reducer: R,
    env: Option<R::Environment>,
    state: Option<R::State>,
    action: Option<R::Action>,
    checks: Vec<Check<R::State, R::Action>>,
}

impl<R: Reducer> ReducerTest<R> {
    /// Harness for `reducer`
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            env: None,
            state: None,
            action: None,
            checks: Vec::new(),
        }
    }

    /// Environment passed to the reducer
    #[must_use]
    pub fn with_env(mut self, env: R::Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// Given: the state before the action
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.state = Some(state);
        self
    }

    /// When: the action under test
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Then: a check on the state after the action
    #[must_use]
    pub fn then_state<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.checks.push(Check::State(Box::new(check)));
        self
    }

    /// Then: a check on the returned effects
    #[must_use]
    pub fn then_effects<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&[Effect<R::Action>]) + 'static,
    {
        self.checks.push(Check::Effects(Box::new(check)));
        self
    }

    /// Reduce and run every check
    ///
    /// # Panics
    ///
    /// Panics if the environment, state or action is missing, or if a
    /// check fails.
    pub fn run(self) {
        drop(self.run_with_effects());
    }

    /// [`run`](Self::run), then hand back the effects
    ///
    /// Async tests resolve them with
    /// [`collect_actions`](crate::helpers::collect_actions).
    ///
    /// # Panics
    ///
    /// Same as [`run`](Self::run).
    #[allow(clippy::panic)] // Misconfigured test
    pub fn run_with_effects(self) -> Vec<Effect<R::Action>> {
        let (Some(env), Some(mut state), Some(action)) = (self.env, self.state, self.action) else {
            panic!("ReducerTest needs with_env(), given_state() and when_action()");
        };

        let effects = self.reducer.reduce(&mut state, action, &env);

        for check in self.checks {
            match check {
                Check::State(check) => check(&state),
                Check::Effects(check) => check(effects.as_slice()),
            }
        }

        effects.into_vec()
    }
}

/// Checks for effect lists
pub mod assertions {
    use api_caller_core::effect::Effect;

    /// Nothing asynchronous was returned
    ///
    /// # Panics
    ///
    /// Panics if any effect is a `Future`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A>(effects: &[Effect<A>]) {
        assert!(
            !effects.iter().any(Effect::is_future),
            "Expected no effects, found {effects:?}"
        );
    }

    /// At least one `Future` effect was returned
    ///
    /// # Panics
    ///
    /// Panics if none was.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(Effect::is_future),
            "Expected a Future effect, found {effects:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::collect_actions;
    use api_caller_core::{SmallVec, smallvec};

    /// Remembers the last reply to a ping
    struct PingReducer;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Send,
        Reply(String),
    }

    impl Reducer for PingReducer {
        type State = Option<String>;
        type Action = Ping;
        type Environment = &'static str;

        fn reduce(
            &self,
            last: &mut Option<String>,
            action: Ping,
            reply: &&'static str,
        ) -> SmallVec<[Effect<Ping>; 4]> {
            match action {
                Ping::Send => {
                    let reply = (*reply).to_string();
                    smallvec![Effect::future(async move { Some(Ping::Reply(reply)) })]
                },
                Ping::Reply(text) => {
                    *last = Some(text);
                    smallvec![Effect::None]
                },
            }
        }
    }

    #[test]
    fn checks_see_reduced_state_and_effects() {
        ReducerTest::new(PingReducer)
            .with_env("pong")
            .given_state(None)
            .when_action(Ping::Reply("hi".into()))
            .then_state(|last| assert_eq!(last.as_deref(), Some("hi")))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[tokio::test]
    async fn returned_effects_can_be_resolved() {
        let effects = ReducerTest::new(PingReducer)
            .with_env("pong")
            .given_state(None)
            .when_action(Ping::Send)
            .then_state(|last| assert!(last.is_none()))
            .then_effects(assertions::assert_has_future_effect)
            .run_with_effects();

        assert_eq!(collect_actions(effects).await, vec![Ping::Reply("pong".into())]);
    }

    #[test]
    #[should_panic(expected = "given_state")]
    fn missing_state_is_reported() {
        ReducerTest::new(PingReducer)
            .with_env("pong")
            .when_action(Ping::Send)
            .run();
    }
}
