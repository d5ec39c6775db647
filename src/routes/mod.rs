//! HTTP route handlers.
//!
//! Page handlers share one shape: resolve the [`crate::auth::CurrentUser`],
//! return a guard response if the action isn't allowed, make one store call,
//! then render a template or redirect. Flashes ride along in the returned
//! [`Session`].

pub mod auth;
pub mod health;
pub mod home;
pub mod messages;
pub mod users;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use minijinja::{context, Value};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::models::User;
use crate::session::Session;
use crate::state::AppState;

/// `302 Found` to `to`, saving the session.
pub fn redirect(session: Session, to: &str) -> Response {
    (StatusCode::FOUND, session, [(header::LOCATION, to.to_string())]).into_response()
}

/// Render `template` with the page-wide context (`g_user`, `flashes`,
/// `csrf_token`) merged under `ctx`. Rendering drains pending flashes.
pub fn render(
    state: &AppState,
    mut session: Session,
    current: Option<&User>,
    template: &str,
    ctx: Value,
) -> Result<Response, AppError> {
    let page = context! {
        g_user => current,
        flashes => session.take_flashes(),
        csrf_token => session.csrf_token(),
        ..ctx
    };
    let html = state.templates.render(template, page)?;
    Ok((session, Html(html)).into_response())
}

/// The 404 page, with status.
pub fn not_found(
    state: &AppState,
    session: Session,
    current: Option<&User>,
) -> Result<Response, AppError> {
    let mut response = render(state, session, current, "404.html", context! {})?;
    *response.status_mut() = StatusCode::NOT_FOUND;
    Ok(response)
}

/// Numeric `{id}` path segment. A segment that isn't an `i64` renders the
/// 404 page, the same as an id with no row behind it.
pub struct Id(pub i64);

impl FromRequestParts<AppState> for Id {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        if let Ok(id) = raw.parse() {
            return Ok(Self(id));
        }
        let session = Session::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        let CurrentUser(current) = CurrentUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Err(not_found(state, session, current.as_ref()).unwrap_or_else(IntoResponse::into_response))
    }
}
