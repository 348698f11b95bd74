//! Invites and community creation

use crate::core_community::{
    Community, CommunityDraft, CommunityId, CommunityInvite, Location, MembershipError, Role,
    UserId, Visibility,
};
use crate::test_utils::*;

fn invite_only_world() -> TestWorld {
    let mut community = Community::new(CommunityId::from("garden"), "Garden", Visibility::Closed);
    community.invite_only = true;
    TestWorld::seeded(
        community,
        vec![
            member("ada", Role::Admin),
            member("max", Role::Moderator),
            member("mia", Role::Member),
        ],
        vec![request("rex")],
    )
}

#[tokio::test]
async fn test_member_invites_friend() {
    let world = TestWorld::new(
        Visibility::Open,
        &[("ada", Role::Admin), ("mia", Role::Member)],
        &[],
    );
    let mia = world.manager_for("mia");
    let id = world.community_id.clone();
    mia.open(&id).await.unwrap();
    let friend = UserId::from("fay");

    let view = mia.invite_friend(&id, &friend).await.unwrap();
    assert!(view.invites.contains(&friend));

    let inbox = world.directory.inbox(&friend).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].invited_by.as_deref(), Some("mia"));
    assert_eq!(inbox[0].community_name, "Garden");

    let err = mia.invite_friend(&id, &friend).await.unwrap_err();
    assert!(matches!(err, MembershipError::InvalidOperation(_)));
}

#[tokio::test]
async fn test_invite_only_restricts_inviters() {
    let world = invite_only_world();
    let id = world.community_id.clone();
    let friend = UserId::from("fay");

    let mia = world.manager_for("mia");
    mia.open(&id).await.unwrap();
    let err = mia.invite_friend(&id, &friend).await.unwrap_err();
    assert!(matches!(err, MembershipError::Unauthorized { .. }));

    let max = world.manager_for("max");
    max.open(&id).await.unwrap();
    max.invite_friend(&id, &friend).await.unwrap();
    assert_eq!(world.directory.inbox(&friend).unwrap().len(), 1);
}

#[tokio::test]
async fn test_cannot_invite_members_or_requesters() {
    let world = invite_only_world();
    let id = world.community_id.clone();
    let ada = world.manager_for("ada");
    ada.open(&id).await.unwrap();
    world.directory.clear_calls().unwrap();

    let err = ada.invite_friend(&id, &UserId::from("mia")).await.unwrap_err();
    assert!(matches!(err, MembershipError::AlreadyMember(_)));
    let err = ada.invite_friend(&id, &UserId::from("rex")).await.unwrap_err();
    assert!(matches!(err, MembershipError::AlreadyRequested(_)));

    assert_eq!(world.directory.mutating_call_count().unwrap(), 0);
}

#[tokio::test]
async fn test_accepting_invite_replaces_own_request() {
    let world = invite_only_world();
    let id = world.community_id.clone();
    let rex = UserId::from("rex");
    world
        .directory
        .seed_invite(&rex, CommunityInvite::new(id.clone(), "Garden"))
        .unwrap();

    let manager = world.manager_for("rex");
    let invites = manager.fetch_invites().await.unwrap();
    assert_eq!(invites.len(), 1);

    manager.open(&id).await.unwrap();
    let view = manager.accept_invite(&id).await.unwrap().expect("view is open");
    assert_eq!(view.role_of(&rex), Some(Role::Member));
    assert!(!view.requests.contains(&rex));
    assert_view_consistent(&view);

    assert!(manager.fetch_invites().await.unwrap().is_empty());
    assert!(world.directory.requests(&id).unwrap().is_empty());
}

#[tokio::test]
async fn test_declining_invite() {
    let world = invite_only_world();
    let id = world.community_id.clone();
    let fay = UserId::from("fay");
    world
        .directory
        .seed_invite(&fay, CommunityInvite::new(id.clone(), "Garden"))
        .unwrap();

    let manager = world.manager_for("fay");
    manager.decline_invite(&id).await.unwrap();
    assert!(world.directory.inbox(&fay).unwrap().is_empty());

    // Nothing left to decline
    let err = manager.decline_invite(&id).await.unwrap_err();
    assert!(matches!(err, MembershipError::RemoteFailure(_)));
}

#[tokio::test]
async fn test_approval_settles_sent_invite() {
    let world = TestWorld::new(Visibility::Closed, &[("ada", Role::Admin)], &[]);
    let id = world.community_id.clone();
    let ada = world.manager_for("ada");
    let fay = world.manager_for("fay");
    let fay_id = UserId::from("fay");

    ada.open(&id).await.unwrap();
    ada.invite_friend(&id, &fay_id).await.unwrap();

    fay.request(&id).await.unwrap();
    let view = ada.refresh().await.unwrap();
    assert!(view.invites.contains(&fay_id));

    let view = ada.approve_request(&id, &fay_id).await.unwrap();
    assert!(!view.invites.contains(&fay_id));
    assert!(view.invites.is_empty());
}

#[tokio::test]
async fn test_create_then_manage_community() {
    let world = TestWorld::new(Visibility::Open, &[], &[]);
    let ada = world.manager_for("ada");

    let err = ada
        .create_community(&CommunityDraft::new("Book club", "  "))
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::InvalidCommunity(_)));
    assert_eq!(world.directory.call_count("create").unwrap(), 0);

    let location = Location {
        street: "1 Long Lane".to_string(),
        city: "Leeds".to_string(),
        country: "UK".to_string(),
        ..Location::default()
    };
    let draft = CommunityDraft::new("Book club", "Monthly reads")
        .with_visibility(Visibility::Closed)
        .with_location(location);
    let id = ada.create_community(&draft).await.unwrap();

    let view = ada.open(&id).await.unwrap();
    assert_eq!(view.community.name, "Book club");
    assert!(!view.community.is_open());
    assert_eq!(
        view.community.location.as_ref().map(Location::formatted).as_deref(),
        Some("1 Long Lane, Leeds, UK")
    );
    assert_eq!(ada.my_role().await, Some(Role::Admin));
}
