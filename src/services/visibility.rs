use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{FollowPolicy, Visibility};
use crate::error::{GraphError, GraphResult};
use crate::repository::SocialGraphStore;

/// Pre-check gate consulted by read paths before returning profile or
/// stream data. A block in either direction suppresses visibility for
/// both sides.
#[derive(Clone)]
pub struct VisibilityService {
    store: Arc<dyn SocialGraphStore>,
}

impl VisibilityService {
    pub fn new(store: Arc<dyn SocialGraphStore>) -> Self {
        Self { store }
    }

    pub async fn can_view(&self, viewer_id: Uuid, target_id: Uuid) -> GraphResult<Visibility> {
        if viewer_id == target_id {
            return Ok(Visibility::Allowed);
        }
        if self.store.has_block_between(viewer_id, target_id).await? {
            return Ok(Visibility::Denied);
        }
        Ok(Visibility::Allowed)
    }

    pub async fn can_follow(&self, viewer_id: Uuid, target_id: Uuid) -> GraphResult<Visibility> {
        if viewer_id == target_id {
            return Ok(Visibility::Denied);
        }
        if self.store.has_block_between(viewer_id, target_id).await? {
            return Ok(Visibility::Denied);
        }

        let target = self
            .store
            .profile(target_id)
            .await?
            .ok_or(GraphError::NotFound(target_id))?;
        if target.who_can_follow == FollowPolicy::None {
            return Ok(Visibility::Denied);
        }
        Ok(Visibility::Allowed)
    }
}
