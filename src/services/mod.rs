mod follow;
mod query;
mod visibility;

pub use follow::FollowService;
pub use query::QueryService;
pub use visibility::VisibilityService;
