//! Cookie-backed user session.
//!
//! The whole session lives in one signed cookie (`warbler_session`) as JSON:
//! the logged-in user's ID, the CSRF token for forms, and queued flash
//! messages. The signature (HMAC via [`SignedCookieJar`]) means a client can
//! read but not forge it.
//!
//! [`Session`] is both an extractor and an [`IntoResponseParts`], so a handler
//! takes it as an argument, mutates it, and returns it alongside the body to
//! persist the changes.

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponseParts, ResponseParts};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use serde::{Deserialize, Serialize};

use crate::auth::constant_time_eq;
use crate::models::User;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "warbler_session";

/// Bootstrap alert class a flash is rendered with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Danger,
    Info,
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

/// Serialized cookie payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curr_user: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flashes: Vec<Flash>,
}

/// The request's session. Return it in the response tuple to save changes.
pub struct Session {
    jar: SignedCookieJar,
    data: SessionData,
}

impl Session {
    /// ID stored by the last [`Session::login`], if any.
    pub fn user_id(&self) -> Option<i64> {
        self.data.curr_user
    }

    pub fn login(&mut self, user: &User) {
        self.data.curr_user = Some(user.id);
    }

    /// Drop the logged-in user but keep the CSRF token and flashes.
    pub fn forget_user(&mut self) {
        self.data.curr_user = None;
    }

    /// Forget everything: user, CSRF token and pending flashes.
    pub fn logout(&mut self) {
        self.data = SessionData::default();
    }

    pub fn flash(&mut self, category: FlashCategory, message: impl Into<String>) {
        self.data.flashes.push(Flash {
            category,
            message: message.into(),
        });
    }

    /// Drain queued flashes for rendering.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.data.flashes)
    }

    /// The CSRF token to embed in forms, minted on first use.
    pub fn csrf_token(&mut self) -> String {
        self.data
            .csrf_token
            .get_or_insert_with(|| uuid::Uuid::new_v4().simple().to_string())
            .clone()
    }

    /// Compare a submitted token against the session's.
    pub fn csrf_matches(&self, submitted: &str) -> bool {
        self.data
            .csrf_token
            .as_deref()
            .is_some_and(|expected| constant_time_eq(expected.as_bytes(), submitted.as_bytes()))
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::<Key>::from_request_parts(parts, state).await?;
        // Unsigned, tampered or stale payloads all degrade to an empty session.
        let data = jar
            .get(SESSION_COOKIE)
            .and_then(|c| serde_json::from_str(c.value()).ok())
            .unwrap_or_default();
        Ok(Self { jar, data })
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let jar = if self.data == SessionData::default() {
            self.jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
        } else {
            let payload = serde_json::to_string(&self.data).unwrap_or_default();
            self.jar.add(
                Cookie::build((SESSION_COOKIE, payload))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax),
            )
        };
        jar.into_response_parts(res)
    }
}
