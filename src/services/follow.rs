use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{BlockOutcome, FollowOutcome, FollowPolicy, Profile};
use crate::error::{GraphError, GraphResult};
use crate::repository::{FollowWrite, SocialGraphStore};

/// Relationship mutation entry point. Validates every request against the
/// consistency rules (no self edges, no follow across a block, privacy
/// policy) before handing the write to the store, which applies edge and
/// counter changes as one atomic unit.
#[derive(Clone)]
pub struct FollowService {
    store: Arc<dyn SocialGraphStore>,
}

impl FollowService {
    pub fn new(store: Arc<dyn SocialGraphStore>) -> Self {
        Self { store }
    }

    async fn require_profile(&self, user_id: Uuid) -> GraphResult<Profile> {
        self.store
            .profile(user_id)
            .await?
            .ok_or(GraphError::NotFound(user_id))
    }

    pub async fn follow(&self, follower_id: Uuid, followed_id: Uuid) -> GraphResult<FollowOutcome> {
        if follower_id == followed_id {
            return Err(GraphError::SelfReference);
        }

        self.require_profile(follower_id).await?;
        let target = self.require_profile(followed_id).await?;

        if self.store.has_block_between(follower_id, followed_id).await? {
            return Err(GraphError::Blocked);
        }
        if target.who_can_follow == FollowPolicy::None {
            return Err(GraphError::PrivacyDenied);
        }

        match self.store.insert_follow(follower_id, followed_id).await? {
            FollowWrite::Inserted => {
                debug!("{} now follows {}", follower_id, followed_id);
                Ok(FollowOutcome::Created)
            }
            FollowWrite::AlreadyFollowing => Ok(FollowOutcome::AlreadyFollowing),
            // A block raced the pre-check; report it the same way.
            FollowWrite::Blocked => Err(GraphError::Blocked),
        }
    }

    pub async fn unfollow(&self, follower_id: Uuid, followed_id: Uuid) -> GraphResult<()> {
        if follower_id == followed_id {
            return Err(GraphError::SelfReference);
        }

        self.require_profile(follower_id).await?;
        self.require_profile(followed_id).await?;

        if !self.store.remove_follow(follower_id, followed_id).await? {
            return Err(GraphError::NotFollowing);
        }
        debug!("{} unfollowed {}", follower_id, followed_id);
        Ok(())
    }

    pub async fn block(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<BlockOutcome> {
        if blocker_id == blocked_id {
            return Err(GraphError::SelfReference);
        }

        self.require_profile(blocker_id).await?;
        self.require_profile(blocked_id).await?;

        match self.store.insert_block(blocker_id, blocked_id).await? {
            Some(follows_removed) => {
                debug!(
                    "{} blocked {} ({} follows removed)",
                    blocker_id, blocked_id, follows_removed
                );
                Ok(BlockOutcome::Created { follows_removed })
            }
            None => Ok(BlockOutcome::AlreadyBlocked),
        }
    }

    pub async fn unblock(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<()> {
        self.require_profile(blocker_id).await?;
        self.require_profile(blocked_id).await?;

        if !self.store.remove_block(blocker_id, blocked_id).await? {
            return Err(GraphError::NotBlocked);
        }
        debug!("{} unblocked {}", blocker_id, blocked_id);
        Ok(())
    }
}
