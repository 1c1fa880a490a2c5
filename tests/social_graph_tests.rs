use std::sync::Arc;

use social_graph_service::{
    BlockOutcome, FollowOutcome, FollowPolicy, FollowService, GraphError, MemoryGraphStore,
    QueryService, SocialGraphStore, Visibility, VisibilityService,
};
use uuid::Uuid;

struct TestGraph {
    store: Arc<MemoryGraphStore>,
    follows: FollowService,
    queries: QueryService,
    visibility: VisibilityService,
}

fn graph() -> TestGraph {
    let store = Arc::new(MemoryGraphStore::new());
    let dyn_store: Arc<dyn SocialGraphStore> = store.clone();
    TestGraph {
        store,
        follows: FollowService::new(dyn_store.clone()),
        queries: QueryService::new(dyn_store.clone()),
        visibility: VisibilityService::new(dyn_store),
    }
}

async fn user(g: &TestGraph) -> Uuid {
    let id = Uuid::new_v4();
    g.store.ensure_profile(id).await.unwrap();
    id
}

#[tokio::test]
async fn follow_self_is_rejected() {
    let g = graph();
    let alice = user(&g).await;

    let err = g.follows.follow(alice, alice).await.unwrap_err();
    assert!(matches!(err, GraphError::SelfReference));

    let err = g.follows.block(alice, alice).await.unwrap_err();
    assert!(matches!(err, GraphError::SelfReference));
}

#[tokio::test]
async fn follow_unknown_user_is_not_found() {
    let g = graph();
    let alice = user(&g).await;
    let ghost = Uuid::new_v4();

    let err = g.follows.follow(alice, ghost).await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound(id) if id == ghost));

    let err = g.follows.follow(ghost, alice).await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound(id) if id == ghost));
}

#[tokio::test]
async fn follow_updates_both_counters() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    let outcome = g.follows.follow(alice, bob).await.unwrap();
    assert_eq!(outcome, FollowOutcome::Created);

    let bob_profile = g.queries.profile(bob).await.unwrap();
    let alice_profile = g.queries.profile(alice).await.unwrap();
    assert_eq!(bob_profile.followers_count, 1);
    assert_eq!(bob_profile.following_count, 0);
    assert_eq!(alice_profile.following_count, 1);
    assert_eq!(alice_profile.followers_count, 0);
    assert!(g.queries.is_following(alice, bob).await.unwrap());
    assert!(!g.queries.is_following(bob, alice).await.unwrap());
}

#[tokio::test]
async fn follow_twice_is_idempotent() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    assert_eq!(
        g.follows.follow(alice, bob).await.unwrap(),
        FollowOutcome::Created
    );
    assert_eq!(
        g.follows.follow(alice, bob).await.unwrap(),
        FollowOutcome::AlreadyFollowing
    );

    // Exactly one edge, counter incremented exactly once.
    let bob_profile = g.queries.profile(bob).await.unwrap();
    assert_eq!(bob_profile.followers_count, 1);
    let page = g.queries.followers(bob, 10, 0).await.unwrap();
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn unfollow_removes_edge_and_counters() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    g.follows.follow(alice, bob).await.unwrap();
    g.follows.unfollow(alice, bob).await.unwrap();

    assert!(!g.queries.is_following(alice, bob).await.unwrap());
    assert_eq!(g.queries.profile(bob).await.unwrap().followers_count, 0);
    assert_eq!(g.queries.profile(alice).await.unwrap().following_count, 0);
}

#[tokio::test]
async fn unfollow_without_edge_fails_and_leaves_counters() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;
    let carol = user(&g).await;

    g.follows.follow(carol, bob).await.unwrap();

    let err = g.follows.unfollow(alice, bob).await.unwrap_err();
    assert!(matches!(err, GraphError::NotFollowing));

    assert_eq!(g.queries.profile(bob).await.unwrap().followers_count, 1);
    assert_eq!(g.queries.profile(alice).await.unwrap().following_count, 0);
}

#[tokio::test]
async fn block_removes_follows_in_both_directions() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    g.follows.follow(alice, bob).await.unwrap();
    g.follows.follow(bob, alice).await.unwrap();

    let outcome = g.follows.block(bob, alice).await.unwrap();
    assert_eq!(outcome, BlockOutcome::Created { follows_removed: 2 });

    assert!(!g.queries.is_following(alice, bob).await.unwrap());
    assert!(!g.queries.is_following(bob, alice).await.unwrap());
    assert!(g.queries.is_blocked(alice, bob).await.unwrap());

    for id in [alice, bob] {
        let profile = g.queries.profile(id).await.unwrap();
        assert_eq!(profile.followers_count, 0);
        assert_eq!(profile.following_count, 0);
    }

    // Mutual exclusion: the block edge exists, no follow edge survives.
    assert!(g.store.block_edge(bob, alice).await.unwrap().is_some());
    assert!(g.store.follow_edge(alice, bob).await.unwrap().is_none());
    assert!(g.store.follow_edge(bob, alice).await.unwrap().is_none());
}

#[tokio::test]
async fn blocked_pair_cannot_follow() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    g.follows.block(bob, alice).await.unwrap();

    let err = g.follows.follow(alice, bob).await.unwrap_err();
    assert!(matches!(err, GraphError::Blocked));
    let err = g.follows.follow(bob, alice).await.unwrap_err();
    assert!(matches!(err, GraphError::Blocked));
}

#[tokio::test]
async fn block_twice_is_idempotent() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    assert_eq!(
        g.follows.block(alice, bob).await.unwrap(),
        BlockOutcome::Created { follows_removed: 0 }
    );
    assert_eq!(
        g.follows.block(alice, bob).await.unwrap(),
        BlockOutcome::AlreadyBlocked
    );

    let page = g.queries.blocked(alice, 10, 0).await.unwrap();
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn unblock_requires_existing_block() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    let err = g.follows.unblock(alice, bob).await.unwrap_err();
    assert!(matches!(err, GraphError::NotBlocked));
}

#[tokio::test]
async fn unblock_does_not_restore_follows() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    g.follows.follow(alice, bob).await.unwrap();
    g.follows.block(bob, alice).await.unwrap();
    g.follows.unblock(bob, alice).await.unwrap();

    assert!(!g.queries.is_blocked(alice, bob).await.unwrap());
    assert!(!g.queries.is_following(alice, bob).await.unwrap());
    assert_eq!(g.queries.profile(bob).await.unwrap().followers_count, 0);

    // Following again works once the block is gone.
    assert_eq!(
        g.follows.follow(alice, bob).await.unwrap(),
        FollowOutcome::Created
    );
}

#[tokio::test]
async fn follow_policy_none_denies_follow() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    g.store
        .update_privacy(bob, false, FollowPolicy::None)
        .await
        .unwrap();

    let err = g.follows.follow(alice, bob).await.unwrap_err();
    assert!(matches!(err, GraphError::PrivacyDenied));
    assert_eq!(
        g.visibility.can_follow(alice, bob).await.unwrap(),
        Visibility::Denied
    );
}

#[tokio::test]
async fn private_profile_with_open_policy_is_followable() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    g.store
        .update_privacy(bob, true, FollowPolicy::All)
        .await
        .unwrap();

    assert_eq!(
        g.visibility.can_follow(alice, bob).await.unwrap(),
        Visibility::Allowed
    );
    assert_eq!(
        g.follows.follow(alice, bob).await.unwrap(),
        FollowOutcome::Created
    );
}

#[tokio::test]
async fn block_suppresses_visibility_for_both_sides() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;
    let carol = user(&g).await;

    g.follows.block(bob, alice).await.unwrap();

    assert!(!g.visibility.can_view(alice, bob).await.unwrap().is_allowed());
    assert!(!g.visibility.can_view(bob, alice).await.unwrap().is_allowed());
    assert_eq!(
        g.visibility.can_view(carol, bob).await.unwrap(),
        Visibility::Allowed
    );
    // A user always sees their own profile.
    assert_eq!(
        g.visibility.can_view(alice, alice).await.unwrap(),
        Visibility::Allowed
    );
}

#[tokio::test]
async fn listings_are_most_recent_first_with_pagination() {
    let g = graph();
    let target = user(&g).await;
    let first = user(&g).await;
    let second = user(&g).await;
    let third = user(&g).await;

    g.follows.follow(first, target).await.unwrap();
    g.follows.follow(second, target).await.unwrap();
    g.follows.follow(third, target).await.unwrap();

    let page = g.queries.followers(target, 2, 0).await.unwrap();
    assert_eq!(page.items, vec![third, second]);
    assert_eq!(page.total_count, 3);
    assert!(page.has_more);

    let page = g.queries.followers(target, 2, 2).await.unwrap();
    assert_eq!(page.items, vec![first]);
    assert!(!page.has_more);

    let page = g.queries.following(first, 10, 0).await.unwrap();
    assert_eq!(page.items, vec![target]);
}

#[tokio::test]
async fn blocked_listing_tracks_blocker_only() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;
    let carol = user(&g).await;

    g.follows.block(alice, bob).await.unwrap();
    g.follows.block(alice, carol).await.unwrap();

    let page = g.queries.blocked(alice, 10, 0).await.unwrap();
    assert_eq!(page.items, vec![carol, bob]);

    let page = g.queries.blocked(bob, 10, 0).await.unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn batch_is_following_marks_each_candidate() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;
    let carol = user(&g).await;

    g.follows.follow(alice, bob).await.unwrap();

    let result = g
        .queries
        .batch_is_following(alice, &[bob, carol])
        .await
        .unwrap();
    assert_eq!(result.get(&bob), Some(&true));
    assert_eq!(result.get(&carol), Some(&false));
}

#[tokio::test]
async fn mutual_followers_require_both_directions() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    g.follows.follow(alice, bob).await.unwrap();
    assert_eq!(
        g.queries.are_mutual_followers(alice, bob).await.unwrap(),
        (false, true, false)
    );

    g.follows.follow(bob, alice).await.unwrap();
    assert_eq!(
        g.queries.are_mutual_followers(alice, bob).await.unwrap(),
        (true, true, true)
    );
}

#[tokio::test]
async fn counters_match_edge_counts_after_mixed_sequence() {
    let g = graph();
    let users: Vec<Uuid> = {
        let mut v = Vec::new();
        for _ in 0..4 {
            v.push(user(&g).await);
        }
        v
    };

    // Everyone follows everyone, then some edges are removed again.
    for &a in &users {
        for &b in &users {
            if a != b {
                g.follows.follow(a, b).await.unwrap();
            }
        }
    }
    g.follows.unfollow(users[0], users[1]).await.unwrap();
    g.follows.unfollow(users[2], users[1]).await.unwrap();
    g.follows.block(users[3], users[0]).await.unwrap();

    for &u in &users {
        let profile = g.queries.profile(u).await.unwrap();
        let followers = g.queries.followers(u, 100, 0).await.unwrap();
        let following = g.queries.following(u, 100, 0).await.unwrap();
        assert_eq!(profile.followers_count, followers.total_count);
        assert_eq!(profile.following_count, following.total_count);
    }
}

// Scenario from the service contract: alice follows bob, bob blocks alice.
#[tokio::test]
async fn block_after_follow_scenario() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    g.follows.follow(alice, bob).await.unwrap();
    assert_eq!(g.queries.profile(bob).await.unwrap().followers_count, 1);

    let outcome = g.follows.block(bob, alice).await.unwrap();
    assert_eq!(outcome, BlockOutcome::Created { follows_removed: 1 });
    assert_eq!(g.queries.profile(bob).await.unwrap().followers_count, 0);
    assert!(!g.queries.is_following(alice, bob).await.unwrap());

    let err = g.follows.follow(alice, bob).await.unwrap_err();
    assert!(matches!(err, GraphError::Blocked));
}

#[tokio::test]
async fn negative_paging_inputs_are_clamped() {
    let g = graph();
    let target = user(&g).await;
    let fan = user(&g).await;

    g.follows.follow(fan, target).await.unwrap();

    // Negative offset must not inflate has_more once everything was returned.
    let page = g.queries.followers(target, 5, -10).await.unwrap();
    assert_eq!(page.items, vec![fan]);
    assert_eq!(page.total_count, 1);
    assert!(!page.has_more);

    // Negative limit clamps to an empty page; rows remain available.
    let page = g.queries.followers(target, -1, 0).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 1);
    assert!(page.has_more);
}

#[tokio::test]
async fn concurrent_follow_and_block_settle_on_block() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    let follows = g.follows.clone();
    let blocks = g.follows.clone();
    let t1 = tokio::spawn(async move { follows.follow(alice, bob).await });
    let t2 = tokio::spawn(async move { blocks.block(bob, alice).await });

    let follow_result = t1.await.unwrap();
    let block_result = t2.await.unwrap();

    // Whichever order the two mutations serialized in, the committed state
    // holds the block edge and no follow edge.
    assert!(block_result.is_ok());
    match follow_result {
        Ok(_) => assert!(!g.queries.is_following(alice, bob).await.unwrap()),
        Err(e) => assert!(matches!(e, GraphError::Blocked)),
    }
    assert!(g.queries.is_blocked(alice, bob).await.unwrap());
    assert!(g.store.follow_edge(alice, bob).await.unwrap().is_none());
    assert_eq!(g.queries.profile(bob).await.unwrap().followers_count, 0);
}

#[tokio::test]
async fn concurrent_double_follow_creates_one_edge() {
    let g = graph();
    let alice = user(&g).await;
    let bob = user(&g).await;

    let f1 = g.follows.clone();
    let f2 = g.follows.clone();
    let t1 = tokio::spawn(async move { f1.follow(alice, bob).await });
    let t2 = tokio::spawn(async move { f2.follow(alice, bob).await });

    let outcomes = [t1.await.unwrap().unwrap(), t2.await.unwrap().unwrap()];
    let created = outcomes
        .iter()
        .filter(|o| **o == FollowOutcome::Created)
        .count();
    assert_eq!(created, 1);

    assert_eq!(g.queries.profile(bob).await.unwrap().followers_count, 1);
    assert_eq!(g.queries.followers(bob, 10, 0).await.unwrap().total_count, 1);
}
