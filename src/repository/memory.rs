use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{BlockEdge, FollowEdge, FollowPolicy, Page, Profile};
use crate::error::{GraphError, GraphResult};
use crate::repository::r#trait::{FollowWrite, SocialGraphStore};

/// Whole-graph state behind a single lock. Each operation holds the lock
/// for its full critical section, which serializes mutations on any pair
/// the same way the backing store's transactions do.
#[derive(Default)]
struct GraphState {
    profiles: HashMap<Uuid, Profile>,
    follows: HashMap<(Uuid, Uuid), (FollowEdge, u64)>,
    blocks: HashMap<(Uuid, Uuid), (BlockEdge, u64)>,
    // Insertion sequence; listing order is by edge creation, most recent
    // first, and timestamps alone can tie within a test run.
    next_seq: u64,
}

impl GraphState {
    fn has_block_between(&self, a: Uuid, b: Uuid) -> bool {
        self.blocks.contains_key(&(a, b)) || self.blocks.contains_key(&(b, a))
    }

    fn bump_followers(&mut self, user_id: Uuid, delta: i64) {
        match self.profiles.get_mut(&user_id) {
            Some(profile) if profile.followers_count + delta >= 0 => {
                profile.followers_count += delta;
            }
            Some(_) => warn!("followers_count underflow prevented for user {}", user_id),
            None => warn!("counter update for missing profile {}", user_id),
        }
    }

    fn bump_following(&mut self, user_id: Uuid, delta: i64) {
        match self.profiles.get_mut(&user_id) {
            Some(profile) if profile.following_count + delta >= 0 => {
                profile.following_count += delta;
            }
            Some(_) => warn!("following_count underflow prevented for user {}", user_id),
            None => warn!("counter update for missing profile {}", user_id),
        }
    }

    /// Remove one follow edge and adjust both counters.
    fn remove_follow_edge(&mut self, follower_id: Uuid, followed_id: Uuid) -> bool {
        if self.follows.remove(&(follower_id, followed_id)).is_none() {
            return false;
        }
        self.bump_followers(followed_id, -1);
        self.bump_following(follower_id, -1);
        true
    }

    fn page_desc(&self, mut edges: Vec<(u64, Uuid)>, limit: i64, offset: i64) -> Page<Uuid> {
        let effective_limit = limit.clamp(0, 10_000);
        let offset = offset.max(0);
        let total_count = edges.len() as i64;

        edges.sort_by(|a, b| b.0.cmp(&a.0));
        let items: Vec<Uuid> = edges
            .into_iter()
            .skip(offset as usize)
            .take(effective_limit as usize)
            .map(|(_, id)| id)
            .collect();
        let has_more = offset + effective_limit < total_count;

        Page {
            items,
            total_count,
            has_more,
        }
    }
}

/// In-process implementation of the relationship store. Used by the test
/// suite and wherever a backing database is not available.
#[derive(Clone, Default)]
pub struct MemoryGraphStore {
    state: Arc<Mutex<GraphState>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SocialGraphStore for MemoryGraphStore {
    async fn ensure_profile(&self, user_id: Uuid) -> GraphResult<()> {
        let mut state = self.state.lock().await;
        state
            .profiles
            .entry(user_id)
            .or_insert_with(|| Profile::new(user_id));
        Ok(())
    }

    async fn profile(&self, user_id: Uuid) -> GraphResult<Option<Profile>> {
        let state = self.state.lock().await;
        Ok(state.profiles.get(&user_id).cloned())
    }

    async fn update_privacy(
        &self,
        user_id: Uuid,
        is_private: bool,
        who_can_follow: FollowPolicy,
    ) -> GraphResult<()> {
        let mut state = self.state.lock().await;
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or(GraphError::NotFound(user_id))?;
        profile.is_private = is_private;
        profile.who_can_follow = who_can_follow;
        profile.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn insert_follow(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> GraphResult<FollowWrite> {
        let mut state = self.state.lock().await;

        if state.has_block_between(follower_id, followed_id) {
            return Ok(FollowWrite::Blocked);
        }
        if state.follows.contains_key(&(follower_id, followed_id)) {
            return Ok(FollowWrite::AlreadyFollowing);
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.follows.insert(
            (follower_id, followed_id),
            (FollowEdge::new(follower_id, followed_id), seq),
        );
        state.bump_followers(followed_id, 1);
        state.bump_following(follower_id, 1);
        Ok(FollowWrite::Inserted)
    }

    async fn remove_follow(&self, follower_id: Uuid, followed_id: Uuid) -> GraphResult<bool> {
        let mut state = self.state.lock().await;
        Ok(state.remove_follow_edge(follower_id, followed_id))
    }

    async fn insert_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<Option<u32>> {
        let mut state = self.state.lock().await;

        if state.blocks.contains_key(&(blocker_id, blocked_id)) {
            return Ok(None);
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.blocks.insert(
            (blocker_id, blocked_id),
            (BlockEdge::new(blocker_id, blocked_id), seq),
        );

        let mut follows_removed = 0u32;
        for (follower, followed) in [(blocker_id, blocked_id), (blocked_id, blocker_id)] {
            if state.remove_follow_edge(follower, followed) {
                follows_removed += 1;
            }
        }

        Ok(Some(follows_removed))
    }

    async fn remove_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<bool> {
        let mut state = self.state.lock().await;
        Ok(state.blocks.remove(&(blocker_id, blocked_id)).is_some())
    }

    async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> GraphResult<bool> {
        let state = self.state.lock().await;
        Ok(state.follows.contains_key(&(follower_id, followed_id)))
    }

    async fn is_blocked(&self, blocker_id: Uuid, blocked_id: Uuid) -> GraphResult<bool> {
        let state = self.state.lock().await;
        Ok(state.blocks.contains_key(&(blocker_id, blocked_id)))
    }

    async fn follow_edge(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> GraphResult<Option<FollowEdge>> {
        let state = self.state.lock().await;
        Ok(state
            .follows
            .get(&(follower_id, followed_id))
            .map(|(edge, _)| edge.clone()))
    }

    async fn block_edge(
        &self,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> GraphResult<Option<BlockEdge>> {
        let state = self.state.lock().await;
        Ok(state
            .blocks
            .get(&(blocker_id, blocked_id))
            .map(|(edge, _)| edge.clone()))
    }

    async fn followers(&self, user_id: Uuid, limit: i64, offset: i64) -> GraphResult<Page<Uuid>> {
        let state = self.state.lock().await;
        let edges: Vec<(u64, Uuid)> = state
            .follows
            .iter()
            .filter(|((_, followed), _)| *followed == user_id)
            .map(|((follower, _), (_, seq))| (*seq, *follower))
            .collect();
        Ok(state.page_desc(edges, limit, offset))
    }

    async fn following(&self, user_id: Uuid, limit: i64, offset: i64) -> GraphResult<Page<Uuid>> {
        let state = self.state.lock().await;
        let edges: Vec<(u64, Uuid)> = state
            .follows
            .iter()
            .filter(|((follower, _), _)| *follower == user_id)
            .map(|((_, followed), (_, seq))| (*seq, *followed))
            .collect();
        Ok(state.page_desc(edges, limit, offset))
    }

    async fn blocked(&self, user_id: Uuid, limit: i64, offset: i64) -> GraphResult<Page<Uuid>> {
        let state = self.state.lock().await;
        let edges: Vec<(u64, Uuid)> = state
            .blocks
            .iter()
            .filter(|((blocker, _), _)| *blocker == user_id)
            .map(|((_, blocked), (_, seq))| (*seq, *blocked))
            .collect();
        Ok(state.page_desc(edges, limit, offset))
    }

    async fn batch_is_following(
        &self,
        follower_id: Uuid,
        followed_ids: &[Uuid],
    ) -> GraphResult<HashMap<Uuid, bool>> {
        let state = self.state.lock().await;
        Ok(followed_ids
            .iter()
            .map(|id| (*id, state.follows.contains_key(&(follower_id, *id))))
            .collect())
    }
}
