//! Users: signup, authentication, lookup and profile edits.

use std::fmt;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{Store, StoreError, DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};

pub(super) const USER_COLUMNS: &str =
    "id, email, username, image_url, header_image_url, bio, location, password";

/// A row of the `users` table.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    /// Argon2 PHC string. Never rendered.
    #[serde(skip)]
    pub password: String,
}

impl User {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            image_url: row.get(3)?,
            header_image_url: row.get(4)?,
            bio: row.get(5)?,
            location: row.get(6)?,
            password: row.get(7)?,
        })
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}

/// Input for [`Store::signup`]. `password` is plaintext and hashed on insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Blank or missing means [`DEFAULT_IMAGE_URL`].
    pub image_url: Option<String>,
}

/// Editable profile fields. Blank image URLs reset to the defaults.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
}

/// Counters shown in the profile header.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct UserStats {
    pub messages: i64,
    pub following: i64,
    pub followers: i64,
    pub likes: i64,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Hash(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

pub(super) fn user_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        User::from_row,
    )
    .optional()
}

impl Store {
    /// Hash the password and insert a new user.
    ///
    /// Duplicate usernames/emails and empty values fail with a constraint
    /// violation (see [`StoreError::is_constraint_violation`]).
    pub async fn signup(&self, new_user: NewUser) -> Result<User, StoreError> {
        self.call(move |conn| {
            let hashed = hash_password(&new_user.password)?;
            let image_url =
                non_blank(new_user.image_url).unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string());
            let user = conn.query_row(
                &format!(
                    "INSERT INTO users (username, email, password, image_url) \
                     VALUES (?1, ?2, ?3, ?4) RETURNING {USER_COLUMNS}"
                ),
                params![new_user.username, new_user.email, hashed, image_url],
                User::from_row,
            )?;
            Ok(user)
        })
        .await
    }

    /// Find the user with `username` whose password matches.
    ///
    /// Returns `None` for an unknown username or a wrong password.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let username = username.to_string();
        let password = password.to_string();
        self.call(move |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                    [&username],
                    User::from_row,
                )
                .optional()?;
            Ok(user.filter(|u| verify_password(&password, &u.password)))
        })
        .await
    }

    pub async fn user(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.call(move |conn| Ok(user_by_id(conn, id)?)).await
    }

    /// All users, or those whose username contains `query` (case-insensitive).
    pub async fn search_users(&self, query: Option<&str>) -> Result<Vec<User>, StoreError> {
        let query = query.map(str::trim).filter(|q| !q.is_empty()).map(str::to_string);
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users \
                 WHERE ?1 IS NULL OR username LIKE '%' || ?1 || '%' \
                 ORDER BY id"
            ))?;
            let users = stmt
                .query_map([query], User::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
        .await
    }

    pub async fn user_count(&self) -> Result<i64, StoreError> {
        self.call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .await
    }

    /// Apply `update` and return the refreshed user, or `None` if `id` is gone.
    pub async fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        self.call(move |conn| {
            let image_url =
                non_blank(update.image_url).unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string());
            let header_image_url = non_blank(update.header_image_url)
                .unwrap_or_else(|| DEFAULT_HEADER_IMAGE_URL.to_string());
            let user = conn
                .query_row(
                    &format!(
                        "UPDATE users SET username = ?2, email = ?3, image_url = ?4, \
                         header_image_url = ?5, bio = ?6 WHERE id = ?1 \
                         RETURNING {USER_COLUMNS}"
                    ),
                    params![
                        id,
                        update.username,
                        update.email,
                        image_url,
                        header_image_url,
                        non_blank(update.bio),
                    ],
                    User::from_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    /// Delete the user. Messages, follows and likes go with it.
    pub async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        self.call(move |conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])? > 0))
            .await
    }

    pub async fn user_stats(&self, id: i64) -> Result<UserStats, StoreError> {
        self.call(move |conn| {
            let stats = conn.query_row(
                "SELECT \
                   (SELECT COUNT(*) FROM messages WHERE user_id = ?1), \
                   (SELECT COUNT(*) FROM follows WHERE user_following_id = ?1), \
                   (SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1), \
                   (SELECT COUNT(*) FROM likes WHERE user_id = ?1)",
                [id],
                |r| {
                    Ok(UserStats {
                        messages: r.get(0)?,
                        following: r.get(1)?,
                        followers: r.get(2)?,
                        likes: r.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[tokio::test]
    async fn test_user_model() {
        let store = fixtures::store().await;
        let user = fixtures::signup(&store, "testuser", "HASHED_PASSWORD").await;

        assert_eq!(user.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(user.header_image_url, DEFAULT_HEADER_IMAGE_URL);
        assert_ne!(user.password, "HASHED_PASSWORD");
        assert_eq!(store.user_stats(user.id).await.unwrap(), UserStats::default());
    }

    #[tokio::test]
    async fn test_user_display() {
        let store = fixtures::store().await;
        let user = store
            .signup(NewUser {
                username: "test123".into(),
                email: "email1@gmail.com".into(),
                password: "test456".into(),
                image_url: None,
            })
            .await
            .unwrap();
        assert_eq!(user.to_string(), "<User #1: test123, email1@gmail.com>");
    }

    #[tokio::test]
    async fn test_signup_keeps_custom_image() {
        let store = fixtures::store().await;
        let user = store
            .signup(NewUser {
                username: "pic".into(),
                email: "pic@example.com".into(),
                password: "secret1".into(),
                image_url: Some("https://img.example.com/a.png".into()),
            })
            .await
            .unwrap();
        assert_eq!(user.image_url, "https://img.example.com/a.png");
    }

    #[tokio::test]
    async fn test_fail_duplicate_signup() {
        let store = fixtures::store().await;
        fixtures::signup(&store, "test123", "test456").await;
        let err = store
            .signup(NewUser {
                username: "test123".into(),
                email: "other@example.com".into(),
                password: "hello123".into(),
                image_url: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_fail_empty_signup() {
        let store = fixtures::store().await;
        let err = store
            .signup(NewUser {
                username: "testing456".into(),
                email: String::new(),
                password: "hello123".into(),
                image_url: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(!err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let store = fixtures::store().await;
        let u1 = fixtures::signup(&store, "test123", "test456").await;
        fixtures::signup(&store, "test789", "test101112").await;

        let found = store.authenticate("test123", "test456").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(u1.id));

        assert!(store.authenticate("test789", "test456").await.unwrap().is_none());
        assert!(store.authenticate("test123", "incorrect").await.unwrap().is_none());
        assert!(store.authenticate("nobody", "test456").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_users() {
        let store = fixtures::store().await;
        fixtures::signup(&store, "alice", "password").await;
        fixtures::signup(&store, "malice", "password").await;
        fixtures::signup(&store, "bob", "password").await;

        assert_eq!(store.search_users(None).await.unwrap().len(), 3);
        assert_eq!(store.search_users(Some("  ")).await.unwrap().len(), 3);
        let names: Vec<String> = store
            .search_users(Some("ALI"))
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["alice", "malice"]);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let store = fixtures::store().await;
        let user = fixtures::signup(&store, "testuser", "testuser").await;
        let updated = store
            .update_profile(
                user.id,
                ProfileUpdate {
                    username: "renamed".into(),
                    email: "renamed@example.com".into(),
                    image_url: Some(String::new()),
                    header_image_url: Some("/static/images/custom.jpg".into()),
                    bio: Some("hi there".into()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(updated.header_image_url, "/static/images/custom.jpg");
        assert_eq!(updated.bio.as_deref(), Some("hi there"));
        assert_eq!(updated.password, user.password);
    }

    #[tokio::test]
    async fn test_update_profile_duplicate_username() {
        let store = fixtures::store().await;
        let user = fixtures::signup(&store, "testuser", "testuser").await;
        fixtures::signup(&store, "testuser2", "testuser2").await;
        let err = store
            .update_profile(
                user.id,
                ProfileUpdate {
                    username: "testuser2".into(),
                    email: user.email.clone(),
                    image_url: None,
                    header_image_url: None,
                    bio: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let store = fixtures::store().await;
        let u1 = fixtures::signup(&store, "u1", "password").await;
        let u2 = fixtures::signup(&store, "u2", "password").await;
        let msg = store.create_message(u1.id, "hello").await.unwrap();
        store.follow(u2.id, u1.id).await.unwrap();
        store.toggle_like(u2.id, msg.id).await.unwrap();

        assert!(store.delete_user(u1.id).await.unwrap());
        assert!(store.user(u1.id).await.unwrap().is_none());
        assert!(store.message(msg.id).await.unwrap().is_none());
        assert_eq!(store.user_stats(u2.id).await.unwrap(), UserStats::default());
        assert!(!store.delete_user(u1.id).await.unwrap());
    }
}
