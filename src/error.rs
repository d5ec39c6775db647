//! Handler error type.
//!
//! Expected outcomes (missing rows, failed validation, authorization) are
//! handled inline by each route with a flash, redirect or 404 page. What
//! reaches [`AppError`] is a genuine server fault: it is logged and answered
//! with a bare 500 page.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use crate::models::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("template rendering failed: {0}")]
    Template(#[from] minijinja::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {self}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<!DOCTYPE html><title>Warbler</title><h1>Something went wrong.</h1>"),
        )
            .into_response()
    }
}
