//! Prometheus recorder installation
//!
//! Lives in its own test binary because the recorder is process-global.

#![allow(clippy::unwrap_used)] // Test code

use api_caller::metrics::MetricsRecorder;

#[test]
fn recorder_renders_emitted_metrics() {
    let recorder = MetricsRecorder::install().unwrap();
    metrics::counter!("api_caller.cache.hits").increment(2);

    assert_eq!(format!("{recorder:?}"), "MetricsRecorder { installed: true }");

    let text = recorder.render().unwrap();
    assert!(text.contains("api_caller_cache_hits 2"), "{text}");

    // A second install keeps the first recorder.
    let second = MetricsRecorder::install().unwrap();
    assert!(second.render().is_none());
    assert_eq!(format!("{second:?}"), "MetricsRecorder { installed: false }");
}
