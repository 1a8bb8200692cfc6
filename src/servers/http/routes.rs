//! Route table and middleware stack for the HTTP tracker.
use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{BoxError, Router};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Default time a request is given to complete before the server answers
/// with `408 Request Timeout`.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the router. Needs to be served with
/// `into_make_service_with_connect_info::<SocketAddr>()` so the `announce`
/// and `scrape` handlers can read the caller's address.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/announce", get(handlers::announce))
        .route("/scrape", get(handlers::scrape))
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|_: BoxError| async { StatusCode::REQUEST_TIMEOUT }))
                .layer(tower::timeout::TimeoutLayer::new(REQUEST_TIMEOUT)),
        )
}

#[cfg(test)]
mod tests {
    use swarmkeeper_test_helpers::configuration::ephemeral;

    use super::*;
    use crate::core::databases::driver;

    #[test]
    fn builds_without_panicking() {
        let config = ephemeral();
        let db = driver::build(config.db_driver, &config.db_path).unwrap().into();
        let state = Arc::new(AppState { db, config });
        let _router = router(state);
    }
}
