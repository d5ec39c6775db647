//! User listing, profiles, follows and account management.

use std::collections::HashSet;

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Form;
use minijinja::{context, Value};
use serde::Deserialize;
use tracing::{info, warn};

use super::{not_found, redirect, render, Id};
use crate::auth::{access_unauthorized, CurrentUser};
use crate::error::AppError;
use crate::forms::{check_csrf, FormErrors, UserEditForm};
use crate::models::{User, MESSAGE_PAGE_SIZE};
use crate::session::{FlashCategory, Session};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

async fn following_ids(state: &AppState, viewer: Option<&User>) -> Result<HashSet<i64>, AppError> {
    Ok(match viewer {
        Some(v) => state.store.following_ids(v.id).await?,
        None => HashSet::new(),
    })
}

async fn liked_ids(state: &AppState, viewer: Option<&User>) -> Result<HashSet<i64>, AppError> {
    Ok(match viewer {
        Some(v) => state.store.liked_message_ids(v.id).await?,
        None => HashSet::new(),
    })
}

/// Sidebar context shared by every page extending `users/detail.html`.
async fn profile_context(
    state: &AppState,
    user: &User,
    viewer: Option<&User>,
) -> Result<Value, AppError> {
    let stats = state.store.user_stats(user.id).await?;
    let following_ids = following_ids(state, viewer).await?;
    Ok(context! { user, stats, following_ids })
}

/// `GET /users?q=`
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    let users = state.store.search_users(query.q.as_deref()).await?;
    let following_ids = following_ids(&state, current.as_ref()).await?;
    render(
        &state,
        session,
        current.as_ref(),
        "users/index.html",
        context! { users, following_ids, search => query.q },
    )
}

/// `GET /users/{id}`
pub async fn show_user(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
    Id(user_id): Id,
) -> Result<Response, AppError> {
    let Some(user) = state.store.user(user_id).await? else {
        return not_found(&state, session, current.as_ref());
    };
    let messages = state.store.user_messages(user.id, MESSAGE_PAGE_SIZE).await?;
    let liked_ids = liked_ids(&state, current.as_ref()).await?;
    let profile = profile_context(&state, &user, current.as_ref()).await?;
    render(
        &state,
        session,
        current.as_ref(),
        "users/show.html",
        context! { messages, liked_ids, ..profile },
    )
}

/// Which edge list a profile sub-page shows.
enum Relation {
    Following,
    Followers,
}

async fn show_relation(
    state: AppState,
    current: Option<User>,
    session: Session,
    user_id: i64,
    relation: Relation,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    let Some(user) = state.store.user(user_id).await? else {
        return not_found(&state, session, Some(&me));
    };
    let (people, template) = match relation {
        Relation::Following => (state.store.following(user.id).await?, "users/following.html"),
        Relation::Followers => (state.store.followers(user.id).await?, "users/followers.html"),
    };
    let profile = profile_context(&state, &user, Some(&me)).await?;
    render(&state, session, Some(&me), template, context! { people, ..profile })
}

/// `GET /users/{id}/following`
pub async fn show_following(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
    Id(user_id): Id,
) -> Result<Response, AppError> {
    show_relation(state, current, session, user_id, Relation::Following).await
}

/// `GET /users/{id}/followers`
pub async fn show_followers(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
    Id(user_id): Id,
) -> Result<Response, AppError> {
    show_relation(state, current, session, user_id, Relation::Followers).await
}

/// `GET /users/{id}/likes`
pub async fn show_likes(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
    Id(user_id): Id,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    let Some(user) = state.store.user(user_id).await? else {
        return not_found(&state, session, Some(&me));
    };
    let messages = state.store.liked_messages(user.id).await?;
    let liked_ids = liked_ids(&state, Some(&me)).await?;
    let profile = profile_context(&state, &user, Some(&me)).await?;
    render(
        &state,
        session,
        Some(&me),
        "users/likes.html",
        context! { messages, liked_ids, ..profile },
    )
}

/// `POST /users/follow/{id}`
pub async fn add_follow(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    mut session: Session,
    Id(follow_id): Id,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    if follow_id == me.id {
        warn!("User {} tried to follow themselves", me.username);
        session.flash(FlashCategory::Danger, "Action Not Allowed.");
        return Ok(redirect(session, &format!("/users/{}", me.id)));
    }
    let Some(followed) = state.store.user(follow_id).await? else {
        return not_found(&state, session, Some(&me));
    };
    state.store.follow(me.id, followed.id).await?;
    Ok(redirect(session, &format!("/users/{}/following", me.id)))
}

/// `POST /users/stop-following/{id}`
pub async fn stop_following(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
    Id(follow_id): Id,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    state.store.unfollow(me.id, follow_id).await?;
    Ok(redirect(session, &format!("/users/{}/following", me.id)))
}

fn edit_page(
    state: &AppState,
    session: Session,
    me: &User,
    form: &UserEditForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    render(state, session, Some(me), "users/edit.html", context! { form, errors })
}

/// `GET /users/profile`
pub async fn edit_profile_form(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    edit_page(&state, session, &me, &UserEditForm::from_user(&me), &FormErrors::default())
}

/// `POST /users/profile`
///
/// The current password must accompany every edit. A wrong one bounces back
/// to the profile without touching anything.
pub async fn edit_profile(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    mut session: Session,
    Form(form): Form<UserEditForm>,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    let mut errors = form.validate();
    check_csrf(&mut errors, &session, &form.csrf_token, state.config.auth.csrf_enabled);
    if !errors.is_empty() {
        return edit_page(&state, session, &me, &form, &errors);
    }

    let profile_url = format!("/users/{}", me.id);
    if state.store.authenticate(&me.username, &form.password).await?.is_none() {
        warn!("Profile edit for {} rejected: wrong password", me.username);
        session.flash(FlashCategory::Danger, "Invalid Password");
        return Ok(redirect(session, &profile_url));
    }

    match state.store.update_profile(me.id, form.to_update()).await {
        Ok(Some(user)) => {
            info!("User {} updated their profile", user.username);
            Ok(redirect(session, &profile_url))
        }
        Ok(None) => Ok(access_unauthorized(session)),
        Err(e) if e.is_unique_violation() => {
            session.flash(FlashCategory::Danger, "Username already taken");
            edit_page(&state, session, &me, &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// `POST /users/delete`
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    mut session: Session,
) -> Result<Response, AppError> {
    let Some(me) = current else {
        return Ok(access_unauthorized(session));
    };
    session.logout();
    state.store.delete_user(me.id).await?;
    info!("Deleted user {} (id {})", me.username, me.id);
    Ok(redirect(session, "/signup"))
}
