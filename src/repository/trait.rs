use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{BlockEdge, FollowEdge, FollowPolicy, Page, Profile};
use crate::error::GraphResult;

/// Outcome of an idempotent follow-edge write.
///
/// `Blocked` is reported when the conditional insert found a block edge in
/// either direction; under concurrent block creation this is how the race
/// surfaces instead of a constraint violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowWrite {
    Inserted,
    AlreadyFollowing,
    Blocked,
}

/// Interface for the relationship store.
///
/// Every mutating method executes as a single atomic unit: the edge write
/// and the counter updates it implies commit (or roll back) together.
/// `PostgresGraphStore` is the backing-store implementation;
/// `MemoryGraphStore` provides the same contract in process for tests.
#[async_trait::async_trait]
pub trait SocialGraphStore: Send + Sync {
    /// Create the profile row for an identity if it does not exist yet.
    async fn ensure_profile(&self, user_id: Uuid) -> GraphResult<()>;

    /// Fetch a profile snapshot (counters and privacy settings).
    async fn profile(&self, user_id: Uuid) -> GraphResult<Option<Profile>>;

    /// Update the privacy settings of a profile.
    async fn update_privacy(
        &self,
        user_id: Uuid,
        is_private: bool,
        who_can_follow: FollowPolicy,
    ) -> GraphResult<()>;

    /// Insert a follow edge and bump both counters atomically.
    /// The write is refused (not an error) if a block edge exists in either
    /// direction at write time.
    async fn insert_follow(&self, follower_id: Uuid, followed_id: Uuid)
        -> GraphResult<FollowWrite>;

    /// Delete a follow edge and decrement both counters atomically.
    /// Returns false if no edge existed.
    async fn remove_follow(&self, follower_id: Uuid, followed_id: Uuid) -> GraphResult<bool>;

    /// Insert a block edge and delete any follow edges between the pair
    /// (both directions) in the same transaction, adjusting counters for
    /// each removed edge. Returns the number of follow edges removed, or
    /// None if the block already existed.
    async fn insert_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<Option<u32>>;

    /// Delete a block edge. Returns false if no edge existed. Never
    /// restores previously removed follow edges.
    async fn remove_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<bool>;

    /// Check if follower is following followed.
    async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> GraphResult<bool>;

    /// Check if blocker has blocked blocked (one direction).
    async fn is_blocked(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<bool>;

    /// Check if either user has blocked the other.
    async fn has_block_between(&self, user_a: Uuid, user_b: Uuid) -> GraphResult<bool> {
        Ok(self.is_blocked(user_a, user_b).await? || self.is_blocked(user_b, user_a).await?)
    }

    /// Fetch a single follow edge, if present.
    async fn follow_edge(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> GraphResult<Option<FollowEdge>>;

    /// Fetch a single block edge, if present.
    async fn block_edge(&self, blocker_id: Uuid, blocked_id: Uuid)
        -> GraphResult<Option<BlockEdge>>;

    /// Followers of a user, most recent edge first.
    async fn followers(&self, user_id: Uuid, limit: i64, offset: i64) -> GraphResult<Page<Uuid>>;

    /// Users a user is following, most recent edge first.
    async fn following(&self, user_id: Uuid, limit: i64, offset: i64) -> GraphResult<Page<Uuid>>;

    /// Users blocked by a user, most recent edge first.
    async fn blocked(&self, user_id: Uuid, limit: i64, offset: i64) -> GraphResult<Page<Uuid>>;

    /// Batch check if follower is following each of the candidates.
    async fn batch_is_following(
        &self,
        follower_id: Uuid,
        followed_ids: &[Uuid],
    ) -> GraphResult<HashMap<Uuid, bool>>;
}
