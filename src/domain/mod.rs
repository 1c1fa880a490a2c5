mod models;

pub use models::{
    BlockEdge, BlockOutcome, FollowEdge, FollowOutcome, FollowPolicy, Page, Profile, Visibility,
};
