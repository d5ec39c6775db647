//! Messages ("warbles"): posting, lookup, timelines and deletion.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{Store, StoreError};

/// Join used by every read that renders a message next to its author.
pub(super) const MESSAGE_VIEW_SELECT: &str =
    "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url \
     FROM messages m JOIN users u ON u.id = m.user_id";

/// A row of the `messages` table.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
}

/// A message joined with the author fields the templates need.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// `timestamp` formatted for display, e.g. `07 March 2024`.
    pub posted: String,
    pub user_id: i64,
    pub username: String,
    pub image_url: String,
}

impl MessageView {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let timestamp: DateTime<Utc> = row.get(2)?;
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            posted: timestamp.format("%d %B %Y").to_string(),
            timestamp,
            user_id: row.get(3)?,
            username: row.get(4)?,
            image_url: row.get(5)?,
        })
    }
}

impl Store {
    /// Post a message as `user_id`, stamped with the current UTC time.
    ///
    /// Empty or over-long text and unknown users fail with a constraint
    /// violation.
    pub async fn create_message(&self, user_id: i64, text: &str) -> Result<Message, StoreError> {
        let text = text.to_string();
        self.call(move |conn| {
            let message = conn.query_row(
                "INSERT INTO messages (text, timestamp, user_id) VALUES (?1, ?2, ?3) \
                 RETURNING id, text, timestamp, user_id",
                params![text, Utc::now(), user_id],
                |r| {
                    Ok(Message {
                        id: r.get(0)?,
                        text: r.get(1)?,
                        timestamp: r.get(2)?,
                        user_id: r.get(3)?,
                    })
                },
            )?;
            Ok(message)
        })
        .await
    }

    pub async fn message(&self, id: i64) -> Result<Option<MessageView>, StoreError> {
        self.call(move |conn| {
            let view = conn
                .query_row(
                    &format!("{MESSAGE_VIEW_SELECT} WHERE m.id = ?1"),
                    [id],
                    MessageView::from_row,
                )
                .optional()?;
            Ok(view)
        })
        .await
    }

    /// The newest `limit` messages written by `user_id`.
    pub async fn user_messages(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<MessageView>, StoreError> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_VIEW_SELECT} WHERE m.user_id = ?1 \
                 ORDER BY m.timestamp DESC, m.id DESC LIMIT ?2"
            ))?;
            let messages = stmt
                .query_map(params![user_id, limit], MessageView::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(messages)
        })
        .await
    }

    /// Home timeline: the newest `limit` messages by `user_id` and everyone
    /// they follow.
    pub async fn timeline(&self, user_id: i64, limit: u32) -> Result<Vec<MessageView>, StoreError> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_VIEW_SELECT} \
                 WHERE m.user_id = ?1 \
                    OR m.user_id IN (SELECT user_being_followed_id FROM follows \
                                     WHERE user_following_id = ?1) \
                 ORDER BY m.timestamp DESC, m.id DESC LIMIT ?2"
            ))?;
            let messages = stmt
                .query_map(params![user_id, limit], MessageView::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(messages)
        })
        .await
    }

    /// Delete a message (and its likes). Returns whether a row was removed.
    pub async fn delete_message(&self, id: i64) -> Result<bool, StoreError> {
        self.call(move |conn| Ok(conn.execute("DELETE FROM messages WHERE id = ?1", [id])? > 0))
            .await
    }
}
