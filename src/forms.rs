//! HTML forms: typed bodies, field validation and CSRF checks.
//!
//! Each form deserializes from `application/x-www-form-urlencoded` with every
//! field defaulted, so a missing field is an empty string and surfaces as a
//! validation error rather than a 422 rejection. `validate` returns per-field
//! error lists, which the templates render under each input.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{NewUser, ProfileUpdate, MAX_MESSAGE_LEN};
use crate::session::Session;

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Invalid email address.";
const EDIT_INVALID_EMAIL: &str = "This is not a valid email. Please try again.";
const MIN_PASSWORD_LEN: usize = 6;

/// Validation errors keyed by field name. `csrf_token` collects CSRF failures.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }
}

fn required(errors: &mut FormErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        return false;
    }
    true
}

fn min_length(errors: &mut FormErrors, field: &'static str, value: &str, min: usize) {
    if value.chars().count() < min {
        errors.add(field, format!("Field must be at least {min} characters long."));
    }
}

fn max_length(errors: &mut FormErrors, field: &'static str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("Field cannot be longer than {max} characters."));
    }
}

fn email(errors: &mut FormErrors, field: &'static str, value: &str, message: &str) {
    if !is_valid_email(value.trim()) {
        errors.add(field, message);
    }
}

/// `local@domain.tld`. Domain labels may not start or end with `-`; the TLD is
/// two or more letters.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9._%+-]+@(?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
    )
    .expect("email pattern compiles")
});

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Check the submitted token against the session's when CSRF is enabled.
pub fn check_csrf(errors: &mut FormErrors, session: &Session, submitted: &str, enabled: bool) {
    if !enabled {
        return;
    }
    if submitted.is_empty() {
        errors.add("csrf_token", "The CSRF token is missing.");
    } else if !session.csrf_matches(submitted) {
        errors.add("csrf_token", "The CSRF token is invalid.");
    }
}

/// `text` for a new message.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessageForm {
    pub text: String,
    #[serde(skip_serializing)]
    pub csrf_token: String,
}

impl MessageForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        if required(&mut errors, "text", &self.text) {
            max_length(&mut errors, "text", &self.text, MAX_MESSAGE_LEN);
        }
        errors
    }
}

/// Signup form.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserAddForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub image_url: String,
    #[serde(skip_serializing)]
    pub csrf_token: String,
}

impl UserAddForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        required(&mut errors, "username", &self.username);
        if required(&mut errors, "email", &self.email) {
            email(&mut errors, "email", &self.email, INVALID_EMAIL);
        }
        min_length(&mut errors, "password", &self.password, MIN_PASSWORD_LEN);
        errors
    }

    pub fn into_new_user(self) -> NewUser {
        NewUser {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            image_url: Some(self.image_url),
        }
    }
}

/// Profile edit form. `password` confirms the edit and is never changed here.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserEditForm {
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub csrf_token: String,
}

impl UserEditForm {
    /// Prefill from the stored profile for the GET form.
    pub fn from_user(user: &crate::models::User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            image_url: user.image_url.clone(),
            header_image_url: user.header_image_url.clone(),
            bio: user.bio.clone().unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        required(&mut errors, "username", &self.username);
        if required(&mut errors, "email", &self.email) {
            email(&mut errors, "email", &self.email, EDIT_INVALID_EMAIL);
        }
        required(&mut errors, "password", &self.password);
        errors
    }

    pub fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            image_url: Some(self.image_url.clone()),
            header_image_url: Some(self.header_image_url.clone()),
            bio: Some(self.bio.clone()),
        }
    }
}

/// Login form.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub csrf_token: String,
}

impl LoginForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        required(&mut errors, "username", &self.username);
        min_length(&mut errors, "password", &self.password, MIN_PASSWORD_LEN);
        errors
    }
}
