//! Membership manager
//!
//! Drives every membership transition of the signed-in user against the
//! [`CommunityDirectory`] and mirrors confirmed transitions into the open
//! [`CommunityView`].
//!
//! Each transition follows the same steps:
//!
//! 1. Take a read lock, check authority and preconditions, remember the view
//!    generation, release the lock.
//! 2. Call the directory with no lock held.
//! 3. Take the write lock. If the generation moved (the view closed or another
//!    community was opened) the response is dropped and the caller gets
//!    [`MembershipError::ViewClosed`]. Otherwise apply the local mutation.
//!
//! Local state is never touched before the directory confirms, so a failed
//! call leaves the view exactly as it was.

use super::community::{Community, CommunityDraft};
use super::directory::{CommunityDirectory, DirectoryAck, DirectoryResult, ImageResolver};
use super::errors::{MembershipError, MembershipResult};
use super::invite::CommunityInvite;
use super::request_queue::{RequestEntry, RequestQueue};
use super::role::{self, MemberActions, Role};
use super::roster::{MemberEntry, Roster};
use super::types::{CommunityId, Identity, UserId};
use super::view::CommunityView;
use crate::config::MembershipConfig;
use crate::metrics::MembershipMetrics;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct ViewState {
    generation: u64,
    view: Option<CommunityView>,
}

/// What join and request need to know about a community
struct EntryContext {
    community: Community,
    is_member: bool,
    is_requested: bool,
    /// Set when the community is the one currently open
    generation: Option<u64>,
}

/// Membership workflow for one signed-in user
pub struct MembershipManager {
    directory: Arc<dyn CommunityDirectory>,
    images: Option<Arc<dyn ImageResolver>>,
    identity: Identity,
    config: MembershipConfig,
    metrics: MembershipMetrics,
    state: Arc<RwLock<ViewState>>,
}

impl MembershipManager {
    pub fn new(directory: Arc<dyn CommunityDirectory>, identity: Identity) -> Self {
        Self {
            directory,
            images: None,
            identity,
            config: MembershipConfig::default(),
            metrics: MembershipMetrics::default(),
            state: Arc::new(RwLock::new(ViewState::default())),
        }
    }

    /// Resolve profile pictures through `images`
    pub fn with_image_resolver(mut self, images: Arc<dyn ImageResolver>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_config(mut self, config: MembershipConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: MembershipMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn metrics(&self) -> &MembershipMetrics {
        &self.metrics
    }

    /// Open a community view, replacing any view already open
    ///
    /// Fetches details, members and requests from the directory and decorates
    /// them with image urls before installing the view.
    pub async fn open(&self, community_id: &CommunityId) -> MembershipResult<CommunityView> {
        let view = self.load_view(community_id).await?;

        let mut state = self.state.write().await;
        state.generation += 1;
        state.view = Some(view.clone());
        self.metrics
            .view_sizes(view.roster.len(), view.requests.len());

        info!(
            community_id = %community_id,
            members = view.roster.len(),
            requests = view.requests.len(),
            "Opened community view"
        );
        Ok(view)
    }

    /// Close the open view; in-flight transitions will not apply
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        if let Some(view) = state.view.take() {
            debug!(community_id = %view.community.id, "Closed community view");
        }
    }

    /// Re-fetch the open community from the directory
    ///
    /// The invite ledger of the current view is kept. If the view closes while
    /// the fetch is in flight the result is discarded.
    pub async fn refresh(&self) -> MembershipResult<CommunityView> {
        let (generation, community_id) = {
            let state = self.state.read().await;
            let view = state.view.as_ref().ok_or(MembershipError::ViewClosed)?;
            (state.generation, view.community.id.clone())
        };

        let mut fresh = self.load_view(&community_id).await?;

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(community_id = %community_id, "View changed during refresh, discarding");
            return Err(MembershipError::ViewClosed);
        }
        let view = state.view.as_mut().ok_or(MembershipError::ViewClosed)?;
        fresh.invites = std::mem::take(&mut view.invites);
        let joined: Vec<UserId> = fresh
            .roster
            .sorted_view()
            .filter(|entry| fresh.invites.contains(&entry.user_id))
            .map(|entry| entry.user_id.clone())
            .collect();
        for user_id in &joined {
            fresh.invites.settle(user_id);
        }
        *view = fresh;
        self.metrics
            .view_sizes(view.roster.len(), view.requests.len());

        debug!(community_id = %community_id, "Refreshed community view");
        Ok(view.clone())
    }

    /// Snapshot of the open view
    pub async fn view(&self) -> MembershipResult<CommunityView> {
        let state = self.state.read().await;
        state.view.clone().ok_or(MembershipError::ViewClosed)
    }

    /// Role of the signed-in user in the open view
    pub async fn my_role(&self) -> Option<Role> {
        let state = self.state.read().await;
        state
            .view
            .as_ref()
            .and_then(|view| view.role_of(&self.identity.user_id))
    }

    /// Roster rows sized by the configured group size
    pub async fn member_rows(&self) -> MembershipResult<Vec<Vec<MemberEntry>>> {
        let state = self.state.read().await;
        let view = state.view.as_ref().ok_or(MembershipError::ViewClosed)?;
        Ok(view.member_rows(self.config.row_group_size))
    }

    /// Rows of members whose username contains `needle`
    pub async fn search_members(&self, needle: &str) -> MembershipResult<Vec<Vec<MemberEntry>>> {
        let state = self.state.read().await;
        let view = state.view.as_ref().ok_or(MembershipError::ViewClosed)?;
        Ok(view.search_rows(needle, self.config.row_group_size))
    }

    /// Menu options the signed-in user gets for `target`
    pub async fn actions_for(&self, target: &UserId) -> MemberActions {
        let state = self.state.read().await;
        state
            .view
            .as_ref()
            .map(|view| view.actions_for(&self.identity.user_id, target))
            .unwrap_or_default()
    }

    /// Join an open community
    ///
    /// Returns the updated view when `community_id` is the open community.
    pub async fn join(&self, community_id: &CommunityId) -> MembershipResult<Option<CommunityView>> {
        const ACTION: &str = "join";
        let me = self.identity.user_id.clone();
        let ctx = self.entry_context(community_id).await?;

        if !ctx.community.is_open() {
            return Err(MembershipError::InvalidOperation(
                "community is closed, send a join request instead".to_string(),
            ));
        }
        if ctx.is_member {
            return Err(MembershipError::AlreadyMember(me));
        }
        if ctx.is_requested {
            return Err(MembershipError::AlreadyRequested(me));
        }

        self.remote(ACTION, community_id, self.directory.join(community_id))
            .await?;

        let Some(generation) = ctx.generation else {
            self.confirmed(ACTION, community_id, &me);
            return Ok(None);
        };

        let entry = self.own_member_entry().await;
        self.commit(generation, ACTION, Some(&me), |view| {
            view.roster.add(entry)?;
            Ok(view.clone())
        })
        .await
        .map(Some)
    }

    /// Ask to join a closed community
    pub async fn request(
        &self,
        community_id: &CommunityId,
    ) -> MembershipResult<Option<CommunityView>> {
        const ACTION: &str = "request";
        let me = self.identity.user_id.clone();
        let ctx = self.entry_context(community_id).await?;

        if ctx.community.is_open() {
            return Err(MembershipError::InvalidOperation(
                "community is open, join it directly".to_string(),
            ));
        }
        if ctx.is_member {
            return Err(MembershipError::AlreadyMember(me));
        }
        if ctx.is_requested {
            return Err(MembershipError::AlreadyRequested(me));
        }

        self.remote(ACTION, community_id, self.directory.request(community_id))
            .await?;

        let Some(generation) = ctx.generation else {
            self.confirmed(ACTION, community_id, &me);
            return Ok(None);
        };

        let entry = self.own_request_entry().await;
        self.commit(generation, ACTION, Some(&me), |view| {
            view.requests.enqueue(entry, &view.roster)?;
            Ok(view.clone())
        })
        .await
        .map(Some)
    }

    /// Approve a pending request; the requester becomes a Member
    pub async fn approve_request(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> MembershipResult<CommunityView> {
        const ACTION: &str = "approve_request";
        let generation = self
            .precheck(community_id, ACTION, |view, actor| {
                self.authorize(actor, "approve join requests", role::can_decide_requests)?;
                Self::require_request(view, user_id)
            })
            .await?;

        self.remote(
            ACTION,
            community_id,
            self.directory.accept_request(community_id, user_id),
        )
        .await?;

        self.commit(generation, ACTION, Some(user_id), |view| {
            view.requests.approve(user_id, &mut view.roster)?;
            view.invites.settle(user_id);
            Ok(view.clone())
        })
        .await
    }

    /// Deny a pending request
    pub async fn deny_request(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> MembershipResult<CommunityView> {
        const ACTION: &str = "deny_request";
        let generation = self
            .precheck(community_id, ACTION, |view, actor| {
                self.authorize(actor, "deny join requests", role::can_decide_requests)?;
                Self::require_request(view, user_id)
            })
            .await?;

        self.remote(
            ACTION,
            community_id,
            self.directory.deny_request(community_id, user_id),
        )
        .await?;

        self.commit(generation, ACTION, Some(user_id), |view| {
            view.requests.deny(user_id)?;
            Ok(view.clone())
        })
        .await
    }

    /// Hand the community over to the member named `target_username`
    ///
    /// The target becomes Admin and the acting Admin steps down to Moderator
    /// in a single roster update.
    pub async fn promote_to_owner(
        &self,
        community_id: &CommunityId,
        target_username: &str,
    ) -> MembershipResult<CommunityView> {
        const ACTION: &str = "promote_owner";
        let me = self.identity.user_id.clone();
        let mut target = None;
        let generation = self
            .precheck(community_id, ACTION, |view, actor| {
                self.authorize(actor, "transfer ownership", role::can_promote_to_owner)?;
                let entry = view.roster.find_by_username(target_username).ok_or_else(|| {
                    MembershipError::NotFound(format!("member {target_username}"))
                })?;
                Self::reject_self(&me, &entry.user_id)?;
                target = Some(entry.user_id.clone());
                Ok(())
            })
            .await?;
        let target = target.ok_or_else(|| {
            MembershipError::NotFound(format!("member {target_username}"))
        })?;

        self.remote(
            ACTION,
            community_id,
            self.directory.promote(community_id, &target, Role::Admin),
        )
        .await?;

        self.commit(generation, ACTION, Some(&target), |view| {
            view.roster
                .set_roles(&[(target.clone(), Role::Admin), (me.clone(), Role::Moderator)])?;
            Ok(view.clone())
        })
        .await
    }

    /// Make a member a Moderator
    pub async fn promote_to_moderator(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> MembershipResult<CommunityView> {
        const ACTION: &str = "promote_moderator";
        let generation = self
            .precheck(community_id, ACTION, |view, actor| {
                Self::reject_self(&self.identity.user_id, user_id)?;
                let target = Self::require_member(view, user_id)?;
                self.authorize(actor, "promote to moderator", |actor| {
                    role::can_promote_to_moderator(actor, target)
                })
            })
            .await?;

        self.remote(
            ACTION,
            community_id,
            self.directory.promote(community_id, user_id, Role::Moderator),
        )
        .await?;

        self.commit(generation, ACTION, Some(user_id), |view| {
            view.roster.set_role(user_id, Role::Moderator)?;
            Ok(view.clone())
        })
        .await
    }

    /// Return a Moderator to plain Member
    pub async fn demote_moderator(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> MembershipResult<CommunityView> {
        const ACTION: &str = "demote_moderator";
        let generation = self
            .precheck(community_id, ACTION, |view, actor| {
                Self::reject_self(&self.identity.user_id, user_id)?;
                let target = Self::require_member(view, user_id)?;
                self.authorize(actor, "demote moderators", |actor| {
                    role::can_demote_moderator(actor, target)
                })
            })
            .await?;

        self.remote(ACTION, community_id, self.directory.demote(community_id, user_id))
            .await?;

        self.commit(generation, ACTION, Some(user_id), |view| {
            view.roster.set_role(user_id, Role::Member)?;
            Ok(view.clone())
        })
        .await
    }

    /// Remove another member from the community
    pub async fn remove_member(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> MembershipResult<CommunityView> {
        const ACTION: &str = "remove_member";
        let generation = self
            .precheck(community_id, ACTION, |view, actor| {
                Self::reject_self(&self.identity.user_id, user_id)?;
                self.authorize(actor, "remove members", role::can_remove)?;
                Self::require_member(view, user_id).map(|_| ())
            })
            .await?;

        self.remote(ACTION, community_id, self.directory.remove(community_id, user_id))
            .await?;

        self.commit(generation, ACTION, Some(user_id), |view| {
            view.roster.remove(user_id)?;
            Ok(view.clone())
        })
        .await
    }

    /// Leave the open community
    ///
    /// The only holder of Owner or Admin must transfer ownership first.
    pub async fn leave(&self, community_id: &CommunityId) -> MembershipResult<CommunityView> {
        const ACTION: &str = "leave";
        let me = self.identity.user_id.clone();
        let generation = self
            .precheck(community_id, ACTION, |view, _actor| {
                if view.is_sole_owner(&me) {
                    return Err(MembershipError::OwnershipTransferRequired);
                }
                Ok(())
            })
            .await?;

        self.remote(ACTION, community_id, self.directory.leave(community_id))
            .await?;

        self.commit(generation, ACTION, Some(&me), |view| {
            view.roster.remove(&me)?;
            Ok(view.clone())
        })
        .await
    }

    /// Delete the open community and tear down the view
    pub async fn delete_community(&self, community_id: &CommunityId) -> MembershipResult<()> {
        const ACTION: &str = "delete_community";
        let generation = self
            .precheck(community_id, ACTION, |_view, actor| {
                self.authorize(actor, "delete the community", role::can_delete_community)
            })
            .await?;

        self.remote(ACTION, community_id, self.directory.delete(community_id))
            .await?;

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(community_id = %community_id, "View changed while deleting, discarding");
            return Err(MembershipError::ViewClosed);
        }
        state.generation += 1;
        state.view = None;
        self.confirmed(ACTION, community_id, &self.identity.user_id);
        Ok(())
    }

    /// Create a community and return its id
    ///
    /// The open view, if any, is left alone.
    pub async fn create_community(&self, draft: &CommunityDraft) -> MembershipResult<CommunityId> {
        const ACTION: &str = "create_community";
        draft.validate()?;

        let id = self
            .fetch(ACTION, self.directory.create(draft))
            .await?;
        self.confirmed(ACTION, &id, &self.identity.user_id);
        Ok(id)
    }

    /// Update name, description, location and visibility of the open community
    pub async fn update_details(
        &self,
        community_id: &CommunityId,
        draft: &CommunityDraft,
    ) -> MembershipResult<CommunityView> {
        const ACTION: &str = "update_details";
        draft.validate()?;
        let generation = self
            .precheck(community_id, ACTION, |_view, actor| {
                self.authorize(actor, "edit the community", role::can_edit_community)
            })
            .await?;

        self.remote(ACTION, community_id, self.directory.update(community_id, draft))
            .await?;

        self.commit(generation, ACTION, None, |view| {
            view.community.apply_draft(draft);
            Ok(view.clone())
        })
        .await
    }

    /// Invite a user into the open community
    ///
    /// Any member may invite unless the community is invite-only, in which
    /// case Moderator rank or higher is needed.
    pub async fn invite_friend(
        &self,
        community_id: &CommunityId,
        user_id: &UserId,
    ) -> MembershipResult<CommunityView> {
        const ACTION: &str = "invite";
        let generation = self
            .precheck(community_id, ACTION, |view, actor| {
                Self::reject_self(&self.identity.user_id, user_id)?;
                if view.community.invite_only {
                    self.authorize(actor, "invite to this community", |actor| {
                        actor.rank() <= Role::Moderator.rank()
                    })?;
                }
                if view.roster.contains(user_id) {
                    return Err(MembershipError::AlreadyMember(user_id.clone()));
                }
                if view.requests.contains(user_id) {
                    return Err(MembershipError::AlreadyRequested(user_id.clone()));
                }
                if view.invites.contains(user_id) {
                    return Err(MembershipError::InvalidOperation(format!(
                        "user {user_id} already invited"
                    )));
                }
                Ok(())
            })
            .await?;

        self.remote(ACTION, community_id, self.directory.invite(community_id, user_id))
            .await?;

        self.commit(generation, ACTION, Some(user_id), |view| {
            view.invites.record(user_id.clone())?;
            Ok(view.clone())
        })
        .await
    }

    /// Invites addressed to the signed-in user
    pub async fn fetch_invites(&self) -> MembershipResult<Vec<CommunityInvite>> {
        self.fetch("fetch_invites", self.directory.fetch_invites())
            .await
    }

    /// Accept an invite and become a Member
    ///
    /// When the invited community is open, the user's own pending request is
    /// dropped and they are added to the roster.
    pub async fn accept_invite(
        &self,
        community_id: &CommunityId,
    ) -> MembershipResult<Option<CommunityView>> {
        const ACTION: &str = "accept_invite";
        let me = self.identity.user_id.clone();
        let generation = self.open_generation(community_id).await;

        if let Some(generation) = generation {
            let state = self.state.read().await;
            if state.generation == generation {
                if let Some(view) = state.view.as_ref() {
                    if view.roster.contains(&me) {
                        return Err(MembershipError::AlreadyMember(me));
                    }
                }
            }
        }

        self.remote(ACTION, community_id, self.directory.accept_invite(community_id))
            .await?;

        let Some(generation) = generation else {
            self.confirmed(ACTION, community_id, &me);
            return Ok(None);
        };

        let entry = self.own_member_entry().await;
        self.commit(generation, ACTION, Some(&me), |view| {
            view.roster.add(entry)?;
            view.requests.withdraw(&me);
            Ok(view.clone())
        })
        .await
        .map(Some)
    }

    pub async fn decline_invite(&self, community_id: &CommunityId) -> MembershipResult<()> {
        const ACTION: &str = "decline_invite";
        self.remote(ACTION, community_id, self.directory.decline_invite(community_id))
            .await?;
        self.confirmed(ACTION, community_id, &self.identity.user_id);
        Ok(())
    }

    /// Run `check` against the open view and return its generation
    ///
    /// Fails with `ViewClosed` when `community_id` is not the open community
    /// and with `NotFound` when the signed-in user is not on its roster.
    async fn precheck<F>(
        &self,
        community_id: &CommunityId,
        action: &'static str,
        check: F,
    ) -> MembershipResult<u64>
    where
        F: FnOnce(&CommunityView, Role) -> MembershipResult<()>,
    {
        let state = self.state.read().await;
        let view = state
            .view
            .as_ref()
            .filter(|view| &view.community.id == community_id)
            .ok_or(MembershipError::ViewClosed)?;

        let actor = view.role_of(&self.identity.user_id).ok_or_else(|| {
            MembershipError::NotFound(format!("member {}", self.identity.user_id))
        })?;

        check(view, actor).map_err(|e| {
            debug!(
                community_id = %community_id,
                actor = %self.identity.user_id,
                action,
                error = %e,
                "Transition refused before directory call"
            );
            e
        })?;
        Ok(state.generation)
    }

    fn authorize(
        &self,
        actor: Role,
        action: &'static str,
        allowed: impl FnOnce(Role) -> bool,
    ) -> MembershipResult<()> {
        if allowed(actor) {
            Ok(())
        } else {
            self.metrics.unauthorized(action);
            Err(MembershipError::Unauthorized { action })
        }
    }

    fn require_member(view: &CommunityView, user_id: &UserId) -> MembershipResult<Role> {
        view.role_of(user_id)
            .ok_or_else(|| MembershipError::NotFound(format!("member {user_id}")))
    }

    fn require_request(view: &CommunityView, user_id: &UserId) -> MembershipResult<()> {
        if view.requests.contains(user_id) {
            Ok(())
        } else {
            Err(MembershipError::NotFound(format!("request {user_id}")))
        }
    }

    fn reject_self(me: &UserId, target: &UserId) -> MembershipResult<()> {
        if me == target && !role::can_act_on_self() {
            return Err(MembershipError::InvalidOperation(
                "cannot act on yourself".to_string(),
            ));
        }
        Ok(())
    }

    async fn open_generation(&self, community_id: &CommunityId) -> Option<u64> {
        let state = self.state.read().await;
        state
            .view
            .as_ref()
            .filter(|view| &view.community.id == community_id)
            .map(|_| state.generation)
    }

    /// Membership facts for join and request
    ///
    /// Uses the open view when it shows `community_id`, the directory otherwise.
    async fn entry_context(&self, community_id: &CommunityId) -> MembershipResult<EntryContext> {
        let me = &self.identity.user_id;
        {
            let state = self.state.read().await;
            if let Some(view) = state
                .view
                .as_ref()
                .filter(|view| &view.community.id == community_id)
            {
                return Ok(EntryContext {
                    community: view.community.clone(),
                    is_member: view.roster.contains(me),
                    is_requested: view.requests.contains(me),
                    generation: Some(state.generation),
                });
            }
        }

        let community = self
            .fetch("fetch_community", self.directory.fetch_community(community_id))
            .await?;
        let members = self
            .fetch("fetch_members", self.directory.fetch_members(community_id))
            .await?;
        let requests = self
            .fetch("fetch_requests", self.directory.fetch_requests(community_id))
            .await?;

        Ok(EntryContext {
            community,
            is_member: members.iter().any(|m| &m.user_id == me),
            is_requested: requests.iter().any(|r| &r.user_id == me),
            generation: None,
        })
    }

    async fn load_view(&self, community_id: &CommunityId) -> MembershipResult<CommunityView> {
        let community = self
            .fetch("fetch_community", self.directory.fetch_community(community_id))
            .await?;
        let members = self
            .fetch("fetch_members", self.directory.fetch_members(community_id))
            .await?;
        let requests = self
            .fetch("fetch_requests", self.directory.fetch_requests(community_id))
            .await?;

        let roster = Roster::from_entries(members).map_err(|e| {
            warn!(community_id = %community_id, error = %e, "Directory returned a duplicate member");
            MembershipError::from(e)
        })?;
        let requests = RequestQueue::from_entries(requests, &roster).map_err(|e| {
            warn!(community_id = %community_id, error = %e, "Directory returned an inconsistent request list");
            MembershipError::from(e)
        })?;

        let mut view = CommunityView::new(community);
        view.roster = roster;
        view.requests = requests;
        self.decorate(&mut view).await;
        Ok(view)
    }

    /// Fill in image urls for members and requests that have none yet
    ///
    /// A failed resolution falls back to the placeholder image.
    async fn decorate(&self, view: &mut CommunityView) {
        if !self.config.decorate_images {
            return;
        }
        for (user_id, image_ref) in view.roster.undecorated() {
            let url = self.resolve_image(&image_ref).await;
            // Entries come from undecorated(), so they are present
            let _ = view.roster.cache_image(&user_id, url);
        }
        for (user_id, image_ref) in view.requests.undecorated() {
            let url = self.resolve_image(&image_ref).await;
            let _ = view.requests.cache_image(&user_id, url);
        }
    }

    async fn resolve_image(&self, image_ref: &str) -> String {
        let Some(images) = self.images.as_ref() else {
            return self.config.placeholder_image.clone();
        };
        match images.resolve(image_ref).await {
            Ok(url) => url,
            Err(e) => {
                warn!(image_ref, error = %e, "Image resolution failed, using placeholder");
                self.config.placeholder_image.clone()
            }
        }
    }

    async fn own_image_url(&self) -> Option<String> {
        if !self.config.decorate_images {
            return None;
        }
        match self.identity.profile_image_ref.as_deref() {
            Some(image_ref) => Some(self.resolve_image(image_ref).await),
            None => None,
        }
    }

    async fn own_member_entry(&self) -> MemberEntry {
        let mut entry = MemberEntry::new(
            self.identity.user_id.clone(),
            self.identity.username.clone(),
            Role::Member,
        );
        entry.profile_image_ref = self.identity.profile_image_ref.clone();
        entry.cached_image_url = self.own_image_url().await;
        entry
    }

    async fn own_request_entry(&self) -> RequestEntry {
        let mut entry =
            RequestEntry::new(self.identity.user_id.clone(), self.identity.username.clone());
        entry.profile_image_ref = self.identity.profile_image_ref.clone();
        entry.cached_image_url = self.own_image_url().await;
        entry
    }

    /// Await a mutating directory call; errors and rejections become `RemoteFailure`
    async fn remote<F>(
        &self,
        action: &'static str,
        community_id: &CommunityId,
        call: F,
    ) -> MembershipResult<()>
    where
        F: Future<Output = DirectoryResult<DirectoryAck>>,
    {
        match call.await.and_then(DirectoryAck::into_result) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    community_id = %community_id,
                    actor = %self.identity.user_id,
                    action,
                    error = %e,
                    "Directory call failed"
                );
                self.metrics.remote_failure(action);
                Err(e.into())
            }
        }
    }

    /// Await a fetching directory call
    async fn fetch<T, F>(&self, action: &'static str, call: F) -> MembershipResult<T>
    where
        F: Future<Output = DirectoryResult<T>>,
    {
        call.await.map_err(|e| {
            warn!(action, error = %e, "Directory fetch failed");
            self.metrics.remote_failure(action);
            MembershipError::from(e)
        })
    }

    /// Apply a confirmed transition to the view it was started against
    ///
    /// `apply` must leave the view untouched when it fails. A failure that
    /// shows the view drifted from the directory triggers a full refresh when
    /// `resync_on_divergence` is set; the original error is still returned.
    async fn commit<T, F>(
        &self,
        generation: u64,
        action: &'static str,
        target: Option<&UserId>,
        apply: F,
    ) -> MembershipResult<T>
    where
        F: FnOnce(&mut CommunityView) -> MembershipResult<T>,
    {
        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(action, "View closed while the directory call was in flight, discarding");
            return Err(MembershipError::ViewClosed);
        }
        let view = state.view.as_mut().ok_or(MembershipError::ViewClosed)?;
        let community_id = view.community.id.clone();

        match apply(&mut *view) {
            Ok(value) => {
                self.metrics
                    .view_sizes(view.roster.len(), view.requests.len());
                drop(state);
                match target {
                    Some(target) => self.confirmed(action, &community_id, target),
                    None => self.confirmed(action, &community_id, &self.identity.user_id),
                }
                Ok(value)
            }
            Err(e) if e.is_divergence() => {
                drop(state);
                warn!(
                    community_id = %community_id,
                    action,
                    error = %e,
                    "Local view diverged from the directory"
                );
                if self.config.resync_on_divergence {
                    self.metrics.resync();
                    if let Err(refresh_error) = self.refresh().await {
                        warn!(
                            community_id = %community_id,
                            error = %refresh_error,
                            "Resync after divergence failed"
                        );
                    }
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn confirmed(&self, action: &'static str, community_id: &CommunityId, target: &UserId) {
        self.metrics.transition(action);
        info!(
            community_id = %community_id,
            actor = %self.identity.user_id,
            target = %target,
            action,
            "Membership transition applied"
        );
    }
}
