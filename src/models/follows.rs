//! Follow edges between users.

use std::collections::HashSet;

use rusqlite::params;

use super::users::{User, USER_COLUMNS};
use super::{Store, StoreError};

impl Store {
    /// Make `follower_id` follow `followed_id`. Following twice is a no-op.
    pub async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<(), StoreError> {
        self.call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO follows (user_being_followed_id, user_following_id) \
                 VALUES (?1, ?2)",
                params![followed_id, follower_id],
            )?;
            Ok(())
        })
        .await
    }

    /// Remove the edge. Returns whether `follower_id` was following.
    pub async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool, StoreError> {
        self.call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM follows \
                 WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                params![followed_id, follower_id],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    /// Is `user_id` following `other_id`?
    pub async fn is_following(&self, user_id: i64, other_id: i64) -> Result<bool, StoreError> {
        self.edge_exists(user_id, other_id).await
    }

    /// Is `user_id` followed by `other_id`?
    pub async fn is_followed_by(&self, user_id: i64, other_id: i64) -> Result<bool, StoreError> {
        self.edge_exists(other_id, user_id).await
    }

    async fn edge_exists(&self, follower_id: i64, followed_id: i64) -> Result<bool, StoreError> {
        self.call(move |conn| {
            let exists = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM follows \
                 WHERE user_being_followed_id = ?1 AND user_following_id = ?2)",
                params![followed_id, follower_id],
                |r| r.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    /// Users that `user_id` follows.
    pub async fn following(&self, user_id: i64) -> Result<Vec<User>, StoreError> {
        self.related_users(
            user_id,
            "user_being_followed_id",
            "user_following_id",
        )
        .await
    }

    /// Users following `user_id`.
    pub async fn followers(&self, user_id: i64) -> Result<Vec<User>, StoreError> {
        self.related_users(
            user_id,
            "user_following_id",
            "user_being_followed_id",
        )
        .await
    }

    /// IDs of everyone `user_id` follows, for rendering follow buttons.
    pub async fn following_ids(&self, user_id: i64) -> Result<HashSet<i64>, StoreError> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1",
            )?;
            let ids = stmt
                .query_map([user_id], |r| r.get(0))?
                .collect::<rusqlite::Result<HashSet<i64>>>()?;
            Ok(ids)
        })
        .await
    }

    /// Users on the `select_col` side of edges whose `match_col` is `user_id`.
    async fn related_users(
        &self,
        user_id: i64,
        select_col: &'static str,
        match_col: &'static str,
    ) -> Result<Vec<User>, StoreError> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users \
                 JOIN follows ON follows.{select_col} = users.id \
                 WHERE follows.{match_col} = ?1 ORDER BY users.id"
            ))?;
            let users = stmt
                .query_map([user_id], User::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
        .await
    }
}
