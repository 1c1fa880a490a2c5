use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who may create a new follow edge towards a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FollowPolicy {
    /// Everyone may follow.
    All,
    /// Nobody may follow (hard privacy block).
    None,
}

impl FollowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowPolicy::All => "ALL",
            FollowPolicy::None => "NONE",
        }
    }

    /// Parse the stored column value. Unknown values fall back to `All`,
    /// matching the column default.
    pub fn from_column(value: &str) -> Self {
        match value {
            "NONE" => FollowPolicy::None,
            _ => FollowPolicy::All,
        }
    }
}

/// Per-identity aggregate holding denormalized social counters and
/// privacy settings. Created lazily on first use; the counter fields are
/// written only by the store operations that mutate edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub followers_count: i64,
    pub following_count: i64,
    pub is_private: bool,
    pub who_can_follow: FollowPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            followers_count: 0,
            following_count: 0,
            is_private: false,
            who_can_follow: FollowPolicy::All,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Directed follow relationship: follower observes followed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower_id: Uuid,
    pub followed_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl FollowEdge {
    pub fn new(follower_id: Uuid, followed_id: Uuid) -> Self {
        Self {
            follower_id,
            followed_id,
            created_at: Utc::now(),
        }
    }
}

/// Directed block relationship suppressing mutual visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEdge {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl BlockEdge {
    pub fn new(blocker_id: Uuid, blocked_id: Uuid) -> Self {
        Self {
            blocker_id,
            blocked_id,
            created_at: Utc::now(),
        }
    }
}

/// Result of a follow request. `AlreadyFollowing` is an idempotent signal,
/// not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
}

/// Result of a block request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Block edge created; `follows_removed` counts the follow edges
    /// (0..=2) deleted in the same transaction.
    Created { follows_removed: u32 },
    AlreadyBlocked,
}

/// Visibility decision used as a pre-check gate by read paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Allowed,
    Denied,
}

impl Visibility {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Visibility::Allowed)
    }
}

/// One page of a listing query, most recent edge first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub has_more: bool,
}
