//! Posting, viewing, deleting and liking messages.

use axum::extract::State;
use axum::response::Response;
use axum::Form;
use minijinja::context;
use tracing::{info, warn};

use super::{not_found, redirect, render, Id};
use crate::auth::{access_unauthorized, CurrentUser};
use crate::error::AppError;
use crate::forms::{check_csrf, FormErrors, MessageForm};
use crate::models::{LikeToggle, User};
use crate::session::{FlashCategory, Session};
use crate::state::AppState;
use crate::util::preview;

fn new_message_page(
    state: &AppState,
    session: Session,
    me: &User,
    form: &MessageForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    render(state, session, Some(me), "messages/new.html", context! { form, errors })
}

/// `GET /messages/new`
pub async fn new_message_form(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    new_message_page(&state, session, &me, &MessageForm::default(), &FormErrors::default())
}

/// `POST /messages/new`
pub async fn add_message(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    let mut errors = form.validate();
    check_csrf(&mut errors, &session, &form.csrf_token, state.config.auth.csrf_enabled);
    if !errors.is_empty() {
        return new_message_page(&state, session, &me, &form, &errors);
    }

    let message = state.store.create_message(me.id, &form.text).await?;
    info!(
        "User {} posted message {}: {}",
        me.username,
        message.id,
        preview(&message.text, 40)
    );
    Ok(redirect(session, &format!("/users/{}", me.id)))
}

/// `GET /messages/{id}`
pub async fn show_message(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
    Id(message_id): Id,
) -> Result<Response, AppError> {
    let Some(message) = state.store.message(message_id).await? else {
        return not_found(&state, session, current.as_ref());
    };
    let liked = match &current {
        Some(me) => state.store.liked_message_ids(me.id).await?.contains(&message.id),
        None => false,
    };
    render(
        &state,
        session,
        current.as_ref(),
        "messages/show.html",
        context! { message, liked },
    )
}

/// `POST /messages/{id}/delete`. Only the author may delete.
pub async fn delete_message(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
    Id(message_id): Id,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    let Some(message) = state.store.message(message_id).await? else {
        return not_found(&state, session, Some(&me));
    };
    if message.user_id != me.id {
        warn!("User {} tried to delete message {} they don't own", me.username, message.id);
        return Ok(access_unauthorized(session));
    }
    state.store.delete_message(message.id).await?;
    info!("User {} deleted message {}", me.username, message.id);
    Ok(redirect(session, &format!("/users/{}", me.id)))
}

/// `POST /messages/{id}/like`. Toggles; liking your own message is refused.
pub async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    mut session: Session,
    Id(message_id): Id,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    let Some(message) = state.store.message(message_id).await? else {
        return not_found(&state, session, Some(&me));
    };
    if message.user_id == me.id {
        session.flash(FlashCategory::Danger, "Action not allowed.");
        return Ok(redirect(session, &format!("/users/{}", me.id)));
    }
    match state.store.toggle_like(me.id, message.id).await? {
        LikeToggle::Liked => Ok(redirect(session, &format!("/users/{}/likes", me.id))),
        LikeToggle::Unliked => Ok(redirect(session, "/")),
    }
}
