//! # api-caller testing
//!
//! Testing utilities and helpers for api-caller.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - A scripted, recording HTTP transport ([`MockTransport`])
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Effect assertions and helpers that resolve effects into actions
//!
//! ## Example
//!
//! ```ignore
//! use api_caller_testing::{ManualClock, MockTransport};
//!
//! #[tokio::test]
//! async fn test_cached_call() {
//!     let clock = ManualClock::new(test_clock().now());
//!     let transport = MockTransport::new();
//!     let caller = ApiCaller::builder()
//!         .transport(transport.clone())
//!         .clock(clock.clone())
//!         .build()?;
//!
//!     caller.call_api_and_wait(item.clone(), timeout).await?;
//!     clock.advance(Duration::from_millis(500));
//!     caller.call_api_and_wait(item, timeout).await?;
//!
//!     assert_eq!(transport.request_count(), 1);
//! }
//! ```

use api_caller_core::environment::Clock;
use chrono::{DateTime, Utc};

mod reducer_test;
mod transport_mocks;

pub use reducer_test::{ReducerTest, assertions};
pub use transport_mocks::MockTransport;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use api_caller_testing::mocks::FixedClock;
    /// use api_caller_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Clones share the same time, so a test can hand one clone to the
    /// environment and advance another.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Start the clock at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward
        ///
        /// # Panics
        ///
        /// Panics if `by` does not fit in a `chrono::TimeDelta`.
        #[allow(clippy::expect_used)] // Test clock: absurd durations are a test bug
        pub fn advance(&self, by: Duration) {
            let delta = chrono::TimeDelta::from_std(by).expect("duration fits in TimeDelta");
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += delta;
        }

        /// Jump to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities
pub mod helpers {
    use api_caller_core::effect::Effect;
    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};
    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::fmt::MakeWriter;

    /// Run effects in place and collect the actions they produce
    ///
    /// Futures are awaited one after another. Nothing is fed back into a
    /// reducer.
    pub async fn collect_actions<A>(effects: impl IntoIterator<Item = Effect<A>>) -> Vec<A> {
        let mut actions = Vec::new();
        for effect in effects {
            if let Effect::Future(future) = effect {
                actions.extend(future.await);
            }
        }
        actions
    }

    /// Install a `tracing` subscriber that writes through the test harness
    ///
    /// Safe to call from every test; only the first call installs.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "api_caller=debug,api_caller_runtime=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }

    /// Records every event logged on the current thread while alive
    ///
    /// Takes precedence over [`init_test_tracing`]'s global subscriber. Async
    /// tests need the default current-thread runtime so spawned tasks log
    /// here too.
    ///
    /// ```
    /// use api_caller_testing::helpers::LogCapture;
    ///
    /// let logs = LogCapture::start();
    /// tracing::warn!("token provider not found");
    /// assert!(logs.contains("token provider not found"));
    /// ```
    pub struct LogCapture {
        buffer: SharedBuffer,
        _guard: DefaultGuard,
    }

    impl LogCapture {
        /// Start capturing at every level
        #[must_use]
        pub fn start() -> Self {
            let buffer = SharedBuffer::default();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(buffer.clone())
                .with_max_level(tracing::Level::TRACE)
                .with_ansi(false)
                .finish();
            let guard = tracing::subscriber::set_default(subscriber);
            Self {
                buffer,
                _guard: guard,
            }
        }

        /// Everything logged so far, one formatted event per line
        #[must_use]
        pub fn contents(&self) -> String {
            let bytes = self.buffer.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&bytes).into_owned()
        }

        /// Whether any logged line contains `text`
        #[must_use]
        pub fn contains(&self, text: &str) -> bool {
            self.contents().contains(text)
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for SharedBuffer {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
