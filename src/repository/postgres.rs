use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{BlockEdge, FollowEdge, FollowPolicy, Page, Profile};
use crate::error::{GraphError, GraphResult};
use crate::repository::r#trait::{FollowWrite, SocialGraphStore};

/// PostgreSQL relationship store (source of truth).
///
/// Duplicate prevention rests on the unique constraints of the `follows`
/// and `blocks` tables; every write is idempotent (`ON CONFLICT DO
/// NOTHING`), and each mutating method runs edge write plus counter
/// updates in one transaction.
#[derive(Clone)]
pub struct PostgresGraphStore {
    pool: PgPool,
}

impl PostgresGraphStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Health check
    pub async fn health_check(&self) -> GraphResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Lock both profile rows, lowest id first, so concurrent mutations on
    /// the same pair serialize regardless of direction. Without this a
    /// follow and a block racing under READ COMMITTED touch no common row
    /// and can both commit.
    async fn lock_pair(
        conn: &mut sqlx::PgConnection,
        user_a: Uuid,
        user_b: Uuid,
    ) -> GraphResult<()> {
        sqlx::query(
            "SELECT user_id FROM profiles WHERE user_id IN ($1, $2) ORDER BY user_id FOR UPDATE",
        )
        .bind(user_a)
        .bind(user_b)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Decrement both counters for a removed follow edge, floored at zero.
    /// An attempted decrement below zero means counter and edge state have
    /// drifted; it is logged rather than silently clamped.
    async fn decrement_follow_counters(
        conn: &mut sqlx::PgConnection,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> GraphResult<()> {
        let updated = sqlx::query(
            "UPDATE profiles SET followers_count = followers_count - 1, updated_at = NOW()
             WHERE user_id = $1 AND followers_count > 0",
        )
        .bind(followed_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
        if updated == 0 {
            warn!("followers_count underflow prevented for user {}", followed_id);
        }

        let updated = sqlx::query(
            "UPDATE profiles SET following_count = following_count - 1, updated_at = NOW()
             WHERE user_id = $1 AND following_count > 0",
        )
        .bind(follower_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
        if updated == 0 {
            warn!("following_count underflow prevented for user {}", follower_id);
        }

        Ok(())
    }
}

type ProfileRow = (Uuid, i64, i64, bool, String, DateTime<Utc>, DateTime<Utc>);

fn profile_from_row(row: ProfileRow) -> Profile {
    let (user_id, followers_count, following_count, is_private, policy, created_at, updated_at) =
        row;
    Profile {
        user_id,
        followers_count,
        following_count,
        is_private,
        who_can_follow: FollowPolicy::from_column(&policy),
        created_at,
        updated_at,
    }
}

#[async_trait::async_trait]
impl SocialGraphStore for PostgresGraphStore {
    async fn ensure_profile(&self, user_id: Uuid) -> GraphResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, created_at, updated_at)
            VALUES ($1, NOW(), NOW())
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn profile(&self, user_id: Uuid) -> GraphResult<Option<Profile>> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT user_id, followers_count, following_count, is_private, who_can_follow,
                    created_at, updated_at
             FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(profile_from_row))
    }

    async fn update_privacy(
        &self,
        user_id: Uuid,
        is_private: bool,
        who_can_follow: FollowPolicy,
    ) -> GraphResult<()> {
        let updated = sqlx::query(
            "UPDATE profiles SET is_private = $2, who_can_follow = $3, updated_at = NOW()
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(is_private)
        .bind(who_can_follow.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(GraphError::NotFound(user_id));
        }
        Ok(())
    }

    async fn insert_follow(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> GraphResult<FollowWrite> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pair(&mut tx, follower_id, followed_id).await?;

        // With the pair locked, a concurrent block has either committed
        // (the conditional insert refuses the write) or has not started
        // its mutation yet (its delete will see this row).
        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO follows (follower_id, followed_id, created_at)
            SELECT $1, $2, NOW()
            WHERE NOT EXISTS (
                SELECT 1 FROM blocks
                WHERE (blocker_id = $1 AND blocked_id = $2)
                   OR (blocker_id = $2 AND blocked_id = $1)
            )
            ON CONFLICT (follower_id, followed_id) DO NOTHING
            RETURNING follower_id
            "#,
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            let following: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followed_id = $2)",
            )
            .bind(follower_id)
            .bind(followed_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;

            return Ok(if following {
                FollowWrite::AlreadyFollowing
            } else {
                FollowWrite::Blocked
            });
        }

        sqlx::query(
            "UPDATE profiles SET followers_count = followers_count + 1, updated_at = NOW()
             WHERE user_id = $1",
        )
        .bind(followed_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE profiles SET following_count = following_count + 1, updated_at = NOW()
             WHERE user_id = $1",
        )
        .bind(follower_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Created follow edge {} -> {}", follower_id, followed_id);
        Ok(FollowWrite::Inserted)
    }

    async fn remove_follow(&self, follower_id: Uuid, followed_id: Uuid) -> GraphResult<bool> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pair(&mut tx, follower_id, followed_id).await?;

        let deleted = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
            .bind(follower_id)
            .bind(followed_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.commit().await?;
            return Ok(false);
        }

        Self::decrement_follow_counters(&mut tx, follower_id, followed_id).await?;

        tx.commit().await?;
        debug!("Deleted follow edge {} -> {}", follower_id, followed_id);
        Ok(true)
    }

    async fn insert_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<Option<u32>> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pair(&mut tx, blocker_id, blocked_id).await?;

        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO blocks (blocker_id, blocked_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (blocker_id, blocked_id) DO NOTHING
            RETURNING blocker_id
            "#,
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            tx.commit().await?;
            return Ok(None);
        }

        // Remove follows in both directions within the same transaction so
        // the block and the follow edges are never observable together.
        let mut follows_removed = 0u32;
        for (follower, followed) in [(blocker_id, blocked_id), (blocked_id, blocker_id)] {
            let deleted =
                sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
                    .bind(follower)
                    .bind(followed)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
            if deleted > 0 {
                Self::decrement_follow_counters(&mut tx, follower, followed).await?;
                follows_removed += 1;
            }
        }

        tx.commit().await?;
        debug!(
            "Created block edge {} -> {} ({} follows removed)",
            blocker_id, blocked_id, follows_removed
        );
        Ok(Some(follows_removed))
    }

    async fn remove_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<bool> {
        let deleted = sqlx::query("DELETE FROM blocks WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            debug!("Deleted block edge {} -> {}", blocker_id, blocked_id);
        }
        Ok(deleted > 0)
    }

    async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> GraphResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followed_id = $2)",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn is_blocked(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM blocks WHERE blocker_id = $1 AND blocked_id = $2)",
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn follow_edge(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> GraphResult<Option<FollowEdge>> {
        let row: Option<(Uuid, Uuid, DateTime<Utc>)> = sqlx::query_as(
            "SELECT follower_id, followed_id, created_at FROM follows
             WHERE follower_id = $1 AND followed_id = $2",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(follower_id, followed_id, created_at)| FollowEdge {
            follower_id,
            followed_id,
            created_at,
        }))
    }

    async fn block_edge(
        &self,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> GraphResult<Option<BlockEdge>> {
        let row: Option<(Uuid, Uuid, DateTime<Utc>)> = sqlx::query_as(
            "SELECT blocker_id, blocked_id, created_at FROM blocks
             WHERE blocker_id = $1 AND blocked_id = $2",
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(blocker_id, blocked_id, created_at)| BlockEdge {
            blocker_id,
            blocked_id,
            created_at,
        }))
    }

    async fn followers(&self, user_id: Uuid, limit: i64, offset: i64) -> GraphResult<Page<Uuid>> {
        let effective_limit = limit.clamp(0, 10_000);
        let offset = offset.max(0);

        let total_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE followed_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT follower_id FROM follows
             WHERE followed_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(effective_limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<Uuid> = rows.into_iter().map(|(id,)| id).collect();
        let has_more = offset + effective_limit < total_count;

        Ok(Page {
            items,
            total_count,
            has_more,
        })
    }

    async fn following(&self, user_id: Uuid, limit: i64, offset: i64) -> GraphResult<Page<Uuid>> {
        let effective_limit = limit.clamp(0, 10_000);
        let offset = offset.max(0);

        let total_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT followed_id FROM follows
             WHERE follower_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(effective_limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<Uuid> = rows.into_iter().map(|(id,)| id).collect();
        let has_more = offset + effective_limit < total_count;

        Ok(Page {
            items,
            total_count,
            has_more,
        })
    }

    async fn blocked(&self, user_id: Uuid, limit: i64, offset: i64) -> GraphResult<Page<Uuid>> {
        let effective_limit = limit.clamp(0, 10_000);
        let offset = offset.max(0);

        let total_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM blocks WHERE blocker_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT blocked_id FROM blocks
             WHERE blocker_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(effective_limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<Uuid> = rows.into_iter().map(|(id,)| id).collect();
        let has_more = offset + effective_limit < total_count;

        Ok(Page {
            items,
            total_count,
            has_more,
        })
    }

    async fn batch_is_following(
        &self,
        follower_id: Uuid,
        followed_ids: &[Uuid],
    ) -> GraphResult<HashMap<Uuid, bool>> {
        if followed_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT followed_id FROM follows
             WHERE follower_id = $1 AND followed_id = ANY($2)",
        )
        .bind(follower_id)
        .bind(followed_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut result: HashMap<Uuid, bool> =
            followed_ids.iter().map(|id| (*id, false)).collect();
        for (id,) in rows {
            result.insert(id, true);
        }

        Ok(result)
    }
}
