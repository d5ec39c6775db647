//! Signup, login and logout.

use axum::extract::State;
use axum::response::Response;
use axum::Form;
use minijinja::context;
use tracing::{info, warn};

use super::{redirect, render};
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::forms::{check_csrf, FormErrors, LoginForm, UserAddForm};
use crate::models::User;
use crate::session::{FlashCategory, Session};
use crate::state::AppState;

fn signup_page(
    state: &AppState,
    session: Session,
    form: &UserAddForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    render(state, session, None, "users/signup.html", context! { form, errors })
}

fn login_page(
    state: &AppState,
    session: Session,
    current: Option<&User>,
    form: &LoginForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    render(state, session, current, "users/login.html", context! { form, errors })
}

/// `GET /signup`. Visiting the signup page logs out whoever was logged in.
pub async fn signup_form(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    session.forget_user();
    signup_page(&state, session, &UserAddForm::default(), &FormErrors::default())
}

/// `POST /signup`
pub async fn signup(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<UserAddForm>,
) -> Result<Response, AppError> {
    let mut errors = form.validate();
    check_csrf(&mut errors, &session, &form.csrf_token, state.config.auth.csrf_enabled);
    session.forget_user();
    if !errors.is_empty() {
        return signup_page(&state, session, &form, &errors);
    }

    match state.store.signup(form.clone().into_new_user()).await {
        Ok(user) => {
            info!("New user {} (id {})", user.username, user.id);
            session.login(&user);
            Ok(redirect(session, "/"))
        }
        Err(e) if e.is_unique_violation() => {
            warn!("Signup rejected for {}: {e}", form.username);
            session.flash(FlashCategory::Danger, "Username already taken");
            signup_page(&state, session, &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /login`
pub async fn login_form(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    session: Session,
) -> Result<Response, AppError> {
    login_page(
        &state,
        session,
        current.as_ref(),
        &LoginForm::default(),
        &FormErrors::default(),
    )
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let mut errors = form.validate();
    check_csrf(&mut errors, &session, &form.csrf_token, state.config.auth.csrf_enabled);
    if !errors.is_empty() {
        return login_page(&state, session, current.as_ref(), &form, &errors);
    }

    match state.store.authenticate(form.username.trim(), &form.password).await? {
        Some(user) => {
            info!("User {} logged in", user.username);
            session.login(&user);
            session.flash(FlashCategory::Success, format!("Hello, {}!", user.username));
            Ok(redirect(session, "/"))
        }
        None => {
            warn!("Failed login for {}", form.username);
            session.flash(FlashCategory::Danger, "Invalid credentials.");
            login_page(&state, session, current.as_ref(), &form, &errors)
        }
    }
}

/// `GET /logout`
pub async fn logout(CurrentUser(current): CurrentUser, mut session: Session) -> Response {
    session.logout();
    match current {
        Some(user) => {
            info!("User {} logged out", user.username);
            session.flash(FlashCategory::Success, "Logout successful!");
        }
        None => session.flash(FlashCategory::Danger, "You are not logged in."),
    }
    redirect(session, "/login")
}
