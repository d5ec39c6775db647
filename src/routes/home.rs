//! Homepage and the catch-all 404.

use axum::extract::State;
use axum::response::Response;
use minijinja::context;

use super::{not_found, render};
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::models::MESSAGE_PAGE_SIZE;
use crate::session::Session;
use crate::state::AppState;

/// `GET /`: the timeline when logged in, the landing page otherwise.
pub async fn homepage(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return render(&state, session, None, "home-anon.html", context! {});
    };
    let messages = state.store.timeline(me.id, MESSAGE_PAGE_SIZE).await?;
    let liked_ids = state.store.liked_message_ids(me.id).await?;
    let stats = state.store.user_stats(me.id).await?;
    render(
        &state,
        session,
        Some(&me),
        "home.html",
        context! { messages, liked_ids, stats },
    )
}

/// Router fallback.
pub async fn page_not_found(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
) -> Result<Response, AppError> {
    not_found(&state, session, current.as_ref())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testing::TestApp;

    #[tokio::test]
    async fn test_anonymous_homepage() {
        let mut app = TestApp::new().await;
        let res = app.get("/").await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body.contains("<h4>New to Warbler?</h4>"));
        assert!(res.body.contains(r#"<a href="/signup" class="btn btn-primary">Sign up</a>"#));
    }

    #[tokio::test]
    async fn test_timeline_shows_own_and_followed() {
        let mut app = TestApp::new().await;
        let me = app.signup("testuser", "testuser").await;
        let friend = app.signup("friend", "password").await;
        let stranger = app.signup("stranger", "password").await;
        app.state.store.follow(me.id, friend.id).await.unwrap();
        for (user, text) in [(&me, "my warble"), (&friend, "friend warble"), (&stranger, "stranger warble")] {
            app.state.store.create_message(user.id, text).await.unwrap();
        }
        app.login_as(&me);

        let res = app.get("/").await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body.contains("<p>my warble</p>"));
        assert!(res.body.contains("<p>friend warble</p>"));
        assert!(!res.body.contains("stranger warble"));
        assert!(!res.body.contains("New to Warbler?"));
    }

    #[tokio::test]
    async fn test_stale_session_is_anonymous() {
        let mut app = TestApp::new().await;
        let me = app.signup("testuser", "testuser").await;
        app.login_as(&me);
        app.state.store.delete_user(me.id).await.unwrap();
        let res = app.get("/").await;
        assert!(res.body.contains("New to Warbler?"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let mut app = TestApp::new().await;
        let res = app.get("/no/such/page").await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }
}
