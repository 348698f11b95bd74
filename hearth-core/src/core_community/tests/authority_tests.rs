//! Role checks run before any directory call

use crate::core_community::{CommunityDraft, MembershipError, Role, UserId, Visibility};
use crate::test_utils::*;

fn governed_world() -> TestWorld {
    TestWorld::new(
        Visibility::Closed,
        &[
            ("ada", Role::Admin),
            ("max", Role::Moderator),
            ("mia", Role::Member),
            ("ned", Role::Member),
        ],
        &["xavier"],
    )
}

fn assert_unauthorized(result: Result<impl std::fmt::Debug, MembershipError>) {
    let err = assert_err(result);
    assert!(
        matches!(err, MembershipError::Unauthorized { .. }),
        "expected Unauthorized, got {err:?}"
    );
}

#[tokio::test]
async fn test_refused_actions_never_reach_the_directory() {
    let world = governed_world();
    let mia = world.manager_for("mia");
    let id = world.community_id.clone();
    mia.open(&id).await.unwrap();
    let before = mia.view().await.unwrap();
    world.directory.clear_calls().unwrap();

    let xavier = UserId::from("xavier");
    let ned = UserId::from("ned");
    assert_unauthorized(mia.approve_request(&id, &xavier).await);
    assert_unauthorized(mia.deny_request(&id, &xavier).await);
    assert_unauthorized(mia.promote_to_owner(&id, "ned").await);
    assert_unauthorized(mia.promote_to_moderator(&id, &ned).await);
    assert_unauthorized(mia.remove_member(&id, &ned).await);
    assert_unauthorized(mia.delete_community(&id).await);
    assert_unauthorized(
        mia.update_details(&id, &CommunityDraft::new("Mine now", "All mine"))
            .await,
    );

    assert_eq!(world.directory.mutating_call_count().unwrap(), 0);
    assert_eq!(mia.metrics().snapshot().unauthorized, 7);

    let after = mia.view().await.unwrap();
    assert_eq!(
        after.roster.sorted_view().collect::<Vec<_>>(),
        before.roster.sorted_view().collect::<Vec<_>>()
    );
    assert_eq!(after.requests.len(), 1);
}

#[tokio::test]
async fn test_moderator_decides_requests_and_removes() {
    let world = governed_world();
    let max = world.manager_for("max");
    let id = world.community_id.clone();
    max.open(&id).await.unwrap();

    let view = max
        .deny_request(&id, &UserId::from("xavier"))
        .await
        .unwrap();
    assert!(view.requests.is_empty());

    let view = max.remove_member(&id, &UserId::from("ned")).await.unwrap();
    assert!(!view.roster.contains(&UserId::from("ned")));

    // Moderators cannot hand out roles
    assert_unauthorized(max.promote_to_moderator(&id, &UserId::from("mia")).await);
    assert_unauthorized(max.promote_to_owner(&id, "mia").await);
}

#[tokio::test]
async fn test_moderator_promotion_rules() {
    let world = governed_world();
    let ada = world.manager_for("ada");
    let id = world.community_id.clone();
    ada.open(&id).await.unwrap();

    // Already a moderator
    assert_unauthorized(ada.promote_to_moderator(&id, &UserId::from("max")).await);
    // Only moderators can be demoted
    assert_unauthorized(ada.demote_moderator(&id, &UserId::from("mia")).await);

    let view = ada
        .promote_to_moderator(&id, &UserId::from("mia"))
        .await
        .unwrap();
    assert_roles(&view, &[("mia", Role::Moderator)]);
    assert_roster_sorted(&view.roster);

    let view = ada
        .demote_moderator(&id, &UserId::from("max"))
        .await
        .unwrap();
    assert_roles(&view, &[("max", Role::Member), ("mia", Role::Moderator)]);
}

#[tokio::test]
async fn test_self_targeting_is_refused() {
    let world = governed_world();
    let ada = world.manager_for("ada");
    let id = world.community_id.clone();
    ada.open(&id).await.unwrap();
    world.directory.clear_calls().unwrap();

    let me = UserId::from("ada");
    let err = ada.remove_member(&id, &me).await.unwrap_err();
    assert!(matches!(err, MembershipError::InvalidOperation(_)));
    let err = ada.promote_to_owner(&id, "ada").await.unwrap_err();
    assert!(matches!(err, MembershipError::InvalidOperation(_)));

    assert_eq!(world.directory.mutating_call_count().unwrap(), 0);
    assert!(ada.actions_for(&me).await.is_empty());
}

#[tokio::test]
async fn test_unknown_targets_are_not_found() {
    let world = governed_world();
    let ada = world.manager_for("ada");
    let id = world.community_id.clone();
    ada.open(&id).await.unwrap();

    let err = ada.promote_to_owner(&id, "nobody").await.unwrap_err();
    assert!(matches!(err, MembershipError::NotFound(_)));
    let err = ada
        .approve_request(&id, &UserId::from("mia"))
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::NotFound(_)));
}

#[tokio::test]
async fn test_sole_admin_must_hand_over_before_leaving() {
    let world = governed_world();
    let ada = world.manager_for("ada");
    let id = world.community_id.clone();
    ada.open(&id).await.unwrap();
    world.directory.clear_calls().unwrap();

    let err = ada.leave(&id).await.unwrap_err();
    assert!(matches!(err, MembershipError::OwnershipTransferRequired));
    assert_eq!(world.directory.call_count("leave").unwrap(), 0);

    ada.promote_to_owner(&id, "max").await.unwrap();
    let view = ada.leave(&id).await.unwrap();
    assert!(!view.roster.contains(&UserId::from("ada")));
    assert_eq!(ada.my_role().await, None);
}

#[tokio::test]
async fn test_plain_member_can_leave() {
    let world = governed_world();
    let ned = world.manager_for("ned");
    let id = world.community_id.clone();
    ned.open(&id).await.unwrap();

    let view = ned.leave(&id).await.unwrap();
    assert_eq!(view.roster.len(), 3);
    assert_view_consistent(&view);
}

#[tokio::test]
async fn test_delete_tears_down_view() {
    let world = governed_world();
    let ada = world.manager_for("ada");
    let id = world.community_id.clone();
    ada.open(&id).await.unwrap();

    ada.delete_community(&id).await.unwrap();
    assert!(matches!(ada.view().await, Err(MembershipError::ViewClosed)));
    assert!(world.directory.community(&id).unwrap().is_none());

    let err = ada.leave(&id).await.unwrap_err();
    assert!(matches!(err, MembershipError::ViewClosed));
}

#[tokio::test]
async fn test_admin_edits_details() {
    let world = governed_world();
    let ada = world.manager_for("ada");
    let id = world.community_id.clone();
    ada.open(&id).await.unwrap();

    let draft = CommunityDraft::new("  Allotment  ", "Shared beds")
        .with_visibility(Visibility::Open);
    let view = ada.update_details(&id, &draft).await.unwrap();
    assert_eq!(view.community.name, "Allotment");
    assert!(view.community.is_open());

    let remote = world.directory.community(&id).unwrap().unwrap();
    assert_eq!(remote.name, "Allotment");

    let err = ada
        .update_details(&id, &CommunityDraft::new("", "blank"))
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::InvalidCommunity(_)));
}

#[tokio::test]
async fn test_menu_follows_role_changes() {
    let world = governed_world();
    let ada = world.manager_for("ada");
    let id = world.community_id.clone();
    ada.open(&id).await.unwrap();
    let mia = UserId::from("mia");

    let before = ada.actions_for(&mia).await;
    assert!(before.promote_moderator);
    assert!(!before.demote_moderator);

    ada.promote_to_moderator(&id, &mia).await.unwrap();
    let after = ada.actions_for(&mia).await;
    assert!(!after.promote_moderator);
    assert!(after.demote_moderator);
}
