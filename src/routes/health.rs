//! Unauthenticated health-check endpoint.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::AppState;

/// `GET /api/health`: liveness status.
///
/// Returns status, uptime, version and the number of registered users. The
/// user count doubles as a database round-trip, so a wedged store shows up
/// as a 500 here.
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let uptime = state.start_time.elapsed().as_secs();
    let users = state.store.user_count().await?;

    Ok(Json(json!({
        "status": "ok",
        "uptime_secs": uptime,
        "version": env!("CARGO_PKG_VERSION"),
        "users": users,
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testing::TestApp;

    #[tokio::test]
    async fn test_health() {
        let mut app = TestApp::new().await;
        app.signup("testuser", "testuser").await;
        let res = app.get("/api/health").await;
        assert_eq!(res.status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&res.body).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["users"], 1);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
