pub mod config;
pub mod domain;
pub mod error;
pub mod repository;
pub mod services;

pub use domain::{
    BlockEdge, BlockOutcome, FollowEdge, FollowOutcome, FollowPolicy, Page, Profile, Visibility,
};
pub use error::{GraphError, GraphResult};
pub use repository::{FollowWrite, MemoryGraphStore, PostgresGraphStore, SocialGraphStore};
pub use services::{FollowService, QueryService, VisibilityService};
