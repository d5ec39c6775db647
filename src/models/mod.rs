//! SQLite-backed model layer.
//!
//! Four tables map directly onto the domain: `users`, `messages`, `follows`
//! (user → user edges) and `likes` (user → message edges). All foreign keys
//! cascade on delete, so removing a user removes everything they authored,
//! followed or liked.
//!
//! [`Store`] owns a single connection behind a mutex. Every query runs on
//! tokio's blocking pool via [`Store::call`] so handlers never block the
//! reactor (password hashing included).

mod follows;
mod likes;
mod messages;
mod users;

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, ErrorCode};

pub use likes::LikeToggle;
pub use messages::{Message, MessageView};
pub use users::{NewUser, ProfileUpdate, User, UserStats};

/// Image shown for users who didn't provide one.
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
/// Profile banner shown for users who didn't provide one.
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.png";
/// Maximum message length, in characters.
pub const MAX_MESSAGE_LEN: usize = 140;
/// Page size for timelines and profile message lists.
pub const MESSAGE_PAGE_SIZE: u32 = 100;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    email            TEXT NOT NULL UNIQUE CHECK (length(email) > 0),
    username         TEXT NOT NULL UNIQUE CHECK (length(username) > 0),
    image_url        TEXT NOT NULL DEFAULT '/static/images/default-pic.png',
    header_image_url TEXT NOT NULL DEFAULT '/static/images/warbler-hero.png',
    bio              TEXT,
    location         TEXT,
    password         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    text      TEXT NOT NULL CHECK (length(text) BETWEEN 1 AND 140),
    timestamp TEXT NOT NULL,
    user_id   INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS messages_by_user ON messages (user_id, timestamp);

CREATE TABLE IF NOT EXISTS follows (
    user_being_followed_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    user_following_id      INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    PRIMARY KEY (user_being_followed_id, user_following_id)
);

CREATE TABLE IF NOT EXISTS likes (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    message_id INTEGER NOT NULL REFERENCES messages (id) ON DELETE CASCADE,
    UNIQUE (user_id, message_id)
);
";

const DROP_SCHEMA: &str = "
DROP TABLE IF EXISTS likes;
DROP TABLE IF EXISTS follows;
DROP TABLE IF EXISTS messages;
DROP TABLE IF EXISTS users;
";

/// Errors surfaced by [`Store`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("database connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// True for UNIQUE, NOT NULL, CHECK and FOREIGN KEY failures.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation
        )
    }

    /// True only when a UNIQUE or PRIMARY KEY constraint rejected the write.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    }
}

/// Shared handle to the Warbler database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `path`. `":memory:"` opens a private
    /// in-memory database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create all tables that don't exist yet.
    pub async fn create_all(&self) -> Result<(), StoreError> {
        self.call(|conn| Ok(conn.execute_batch(SCHEMA)?)).await
    }

    /// Drop every table. Used by `init-db --reset`.
    pub async fn drop_all(&self) -> Result<(), StoreError> {
        self.call(|conn| Ok(conn.execute_batch(DROP_SCHEMA)?)).await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn call<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut guard)
        })
        .await?
    }
}
