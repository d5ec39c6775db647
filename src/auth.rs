//! Who is making the request, and what to do when nobody is.
//!
//! [`CurrentUser`] resolves the session's user ID against the store on every
//! request. A session pointing at a deleted account resolves to `None`, the
//! same as an anonymous visitor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;

use crate::error::AppError;
use crate::models::User;
use crate::routes::redirect;
use crate::session::{FlashCategory, Session};
use crate::state::AppState;

/// The logged-in user for this request, if any.
pub struct CurrentUser(pub Option<User>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        let user = match session.user_id() {
            Some(id) => state.store.user(id).await?,
            None => None,
        };
        Ok(Self(user))
    }
}

/// Guard response for routes that need a login: flash and go home.
pub fn access_unauthorized(mut session: Session) -> Response {
    session.flash(FlashCategory::Danger, "Access unauthorized.");
    redirect(session, "/")
}

/// Constant-time byte comparison, used for CSRF tokens.
///
/// Always iterates over the full length of `expected` regardless of
/// `provided` length, so response times don't leak the token length.
pub fn constant_time_eq(expected: &[u8], provided: &[u8]) -> bool {
    let mut diff = u8::from(expected.len() != provided.len());
    for (i, e) in expected.iter().enumerate() {
        let p = provided.get(i).copied().unwrap_or(0xff);
        diff |= e ^ p;
    }
    diff == 0
}
