//! Likes: a user marking someone else's message.

use std::collections::HashSet;

use rusqlite::params;

use super::messages::{MessageView, MESSAGE_VIEW_SELECT};
use super::{Store, StoreError};

/// Outcome of [`Store::toggle_like`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}

impl Store {
    /// Like the message if `user_id` hasn't yet, otherwise remove the like.
    pub async fn toggle_like(&self, user_id: i64, message_id: i64) -> Result<LikeToggle, StoreError> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                params![user_id, message_id],
            )?;
            let outcome = if removed > 0 {
                LikeToggle::Unliked
            } else {
                tx.execute(
                    "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                    params![user_id, message_id],
                )?;
                LikeToggle::Liked
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    /// Messages liked by `user_id`, newest first.
    pub async fn liked_messages(&self, user_id: i64) -> Result<Vec<MessageView>, StoreError> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_VIEW_SELECT} JOIN likes l ON l.message_id = m.id \
                 WHERE l.user_id = ?1 ORDER BY m.timestamp DESC, m.id DESC"
            ))?;
            let messages = stmt
                .query_map([user_id], MessageView::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(messages)
        })
        .await
    }

    /// IDs of messages liked by `user_id`, for rendering like buttons.
    pub async fn liked_message_ids(&self, user_id: i64) -> Result<HashSet<i64>, StoreError> {
        self.call(move |conn| {
            let mut stmt = conn.prepare("SELECT message_id FROM likes WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |r| r.get(0))?
                .collect::<rusqlite::Result<HashSet<i64>>>()?;
            Ok(ids)
        })
        .await
    }
}
