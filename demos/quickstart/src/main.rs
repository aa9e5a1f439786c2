//! Quickstart binary
//!
//! Calls a public JSON API twice through the store: the first call goes to the
//! network, the second is answered from cache.
//!
//! ```bash
//! API_CALLER_DEFAULT_URL=https://jsonplaceholder.typicode.com cargo run -p quickstart
//! ```

use api_caller::metrics::MetricsRecorder;
use api_caller::{ApiCallItem, ApiCaller, ApiCallerConfig, ApiConnector, ResponseBody};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const WAIT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickstart=info,api_caller=debug,api_caller_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let recorder = MetricsRecorder::install()?;
    let mut config = ApiCallerConfig::from_env()?.with_user_agent("api-caller-quickstart");
    if config.default_api_url == "/" {
        config = config.with_default_api_url("https://jsonplaceholder.typicode.com");
    }

    let caller = ApiCaller::builder()
        .config(config)
        .connector(ApiConnector::new().with_error_handler(|failure| {
            tracing::error!(
                status = failure.response.status,
                url = %failure.response.url,
                "Request failed"
            );
        }))
        .build()?;

    println!("=== Quickstart: api-caller ===\n");

    let todo = ApiCallItem::new("/todos/1").with_cache(Some(Duration::from_secs(60)));

    let mut results = caller.call_api(todo.clone()).await?;
    println!(">>> Calling {}", results.id);
    println!("loading: {}", results.loading.current());
    results.finished.wait_for(|done| *done).await;
    print_outcome(&caller, &todo);

    println!("\n>>> Calling again (cache timeout 60s)");
    let state = caller.call_api_and_wait(todo.clone(), WAIT).await?;
    println!("success: {}, returned at: {:?}", state.success, state.returned);

    println!("\n>>> Resetting");
    caller.reset_api(todo.clone()).await?;
    println!("record after reset: {:?}", caller.state(&todo));

    caller.shutdown().await?;

    if let Some(text) = recorder.render() {
        println!("\n=== Metrics ===\n{text}");
    }

    Ok(())
}

fn print_outcome(caller: &ApiCaller, item: &ApiCallItem) {
    let state = caller.state(item);
    match (&state.data, &state.error_data) {
        (Some(ResponseBody::Json(body)), _) if state.success => println!("data: {body}"),
        (_, Some(error)) if state.error => println!("failed: {}", error.message),
        _ => println!("state: {state:?}"),
    }
}
