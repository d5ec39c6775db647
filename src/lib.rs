#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::unused_async)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::redundant_closure_for_method_calls)]

//! warbler library: the router and every building block behind it.
//!
//! - `config`: TOML + env-var configuration
//! - `models`: SQLite store for users, messages, follows and likes
//! - `session`: signed-cookie session with flashes and CSRF token
//! - `auth`: current-user extractor and the login guard
//! - `forms`: form bodies and validation
//! - `templates`: embedded minijinja templates
//! - `routes`: page handlers and the health check

pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod templates;
pub mod util;

#[cfg(test)]
mod testing;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

// Re-export key types at crate root for convenience.
pub use config::Config;
pub use error::AppError;
pub use models::{Store, StoreError};
pub use state::AppState;

/// Build the full application router.
///
/// Pages depend on the session, so every response is marked uncacheable.
pub fn app(state: AppState) -> Router {
    let no_cache = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=0"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ));

    Router::new()
        .route("/", get(routes::home::homepage))
        .route("/signup", get(routes::auth::signup_form).post(routes::auth::signup))
        .route("/login", get(routes::auth::login_form).post(routes::auth::login))
        .route("/logout", get(routes::auth::logout))
        .route("/users", get(routes::users::list_users))
        .route(
            "/users/profile",
            get(routes::users::edit_profile_form).post(routes::users::edit_profile),
        )
        .route("/users/delete", post(routes::users::delete_user))
        .route("/users/follow/{id}", post(routes::users::add_follow))
        .route("/users/stop-following/{id}", post(routes::users::stop_following))
        .route("/users/{id}", get(routes::users::show_user))
        .route("/users/{id}/following", get(routes::users::show_following))
        .route("/users/{id}/followers", get(routes::users::show_followers))
        .route("/users/{id}/likes", get(routes::users::show_likes))
        .route(
            "/messages/new",
            get(routes::messages::new_message_form).post(routes::messages::add_message),
        )
        .route("/messages/{id}", get(routes::messages::show_message))
        .route("/messages/{id}/delete", post(routes::messages::delete_message))
        .route("/messages/{id}/like", post(routes::messages::toggle_like))
        .route("/api/health", get(routes::health::health))
        .nest_service("/static", ServeDir::new(&state.config.server.static_dir))
        .fallback(routes::home::page_not_found)
        .layer(no_cache)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
