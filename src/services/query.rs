use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Page, Profile};
use crate::error::{GraphError, GraphResult};
use crate::repository::SocialGraphStore;

/// Read-only query surface used by outward-facing handlers.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn SocialGraphStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn SocialGraphStore>) -> Self {
        Self { store }
    }

    pub async fn profile(&self, user_id: Uuid) -> GraphResult<Profile> {
        self.store
            .profile(user_id)
            .await?
            .ok_or(GraphError::NotFound(user_id))
    }

    pub async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> GraphResult<bool> {
        self.store.is_following(follower_id, followed_id).await
    }

    /// True if a block edge exists in either direction.
    pub async fn is_blocked(&self, user_a: Uuid, user_b: Uuid) -> GraphResult<bool> {
        self.store.has_block_between(user_a, user_b).await
    }

    /// Returns (are_mutuals, a_follows_b, b_follows_a).
    pub async fn are_mutual_followers(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> GraphResult<(bool, bool, bool)> {
        let a_follows_b = self.store.is_following(user_a, user_b).await?;
        let b_follows_a = self.store.is_following(user_b, user_a).await?;
        Ok((a_follows_b && b_follows_a, a_follows_b, b_follows_a))
    }

    pub async fn followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> GraphResult<Page<Uuid>> {
        self.store.followers(user_id, limit, offset).await
    }

    pub async fn following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> GraphResult<Page<Uuid>> {
        self.store.following(user_id, limit, offset).await
    }

    pub async fn blocked(&self, user_id: Uuid, limit: i64, offset: i64) -> GraphResult<Page<Uuid>> {
        self.store.blocked(user_id, limit, offset).await
    }

    pub async fn batch_is_following(
        &self,
        follower_id: Uuid,
        followed_ids: &[Uuid],
    ) -> GraphResult<HashMap<Uuid, bool>> {
        self.store.batch_is_following(follower_id, followed_ids).await
    }
}
