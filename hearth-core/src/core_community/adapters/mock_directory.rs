//! In-memory CommunityDirectory for testing
//!
//! Behaves like a small community service: it keeps members, requests and
//! invites per community and rejects calls the service would reject. Every
//! call is recorded, single calls can be scripted to fail, and responses can
//! be held back to simulate a slow network.

use crate::core_community::{
    community::{Community, CommunityDraft, Visibility},
    directory::{CommunityDirectory, DirectoryAck, DirectoryError, DirectoryResult},
    invite::CommunityInvite,
    request_queue::RequestEntry,
    role::Role,
    roster::MemberEntry,
    types::{CommunityId, Identity, UserId},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// One recorded directory call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCall {
    pub op: &'static str,
    pub caller: UserId,
    pub community_id: Option<CommunityId>,
    pub target: Option<UserId>,
}

impl DirectoryCall {
    pub fn is_fetch(&self) -> bool {
        self.op.starts_with("fetch_")
    }
}

#[derive(Debug, Clone)]
enum Failure {
    Rejected(String),
    Transport(String),
}

impl Failure {
    fn into_error(self) -> DirectoryError {
        match self {
            Failure::Rejected(message) => DirectoryError::Rejected(message),
            Failure::Transport(message) => DirectoryError::Transport(anyhow::anyhow!(message)),
        }
    }

    fn into_ack(self) -> DirectoryResult<DirectoryAck> {
        match self {
            Failure::Rejected(message) => Ok(DirectoryAck::rejected(message)),
            transport => Err(transport.into_error()),
        }
    }
}

#[derive(Debug, Clone)]
struct CommunityRecord {
    community: Community,
    members: Vec<MemberEntry>,
    requests: Vec<RequestEntry>,
}

impl CommunityRecord {
    fn member_mut(&mut self, user_id: &UserId) -> Option<&mut MemberEntry> {
        self.members.iter_mut().find(|m| &m.user_id == user_id)
    }

    fn has_member(&self, user_id: &UserId) -> bool {
        self.members.iter().any(|m| &m.user_id == user_id)
    }

    fn has_request(&self, user_id: &UserId) -> bool {
        self.requests.iter().any(|r| &r.user_id == user_id)
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    communities: HashMap<CommunityId, CommunityRecord>,
    inbox: HashMap<UserId, Vec<CommunityInvite>>,
    calls: Vec<DirectoryCall>,
    failures: HashMap<&'static str, Failure>,
    holds: HashMap<&'static str, Arc<Notify>>,
}

impl DirectoryState {
    fn record(&mut self, id: &CommunityId) -> DirectoryResult<&mut CommunityRecord> {
        self.communities
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))
    }
}

/// Mock directory shared by any number of simulated users
#[derive(Debug, Clone)]
pub struct MockDirectory {
    caller: Identity,
    state: Arc<Mutex<DirectoryState>>,
}

impl MockDirectory {
    /// Create an empty directory acting on behalf of `caller`
    pub fn new(caller: Identity) -> Self {
        Self {
            caller,
            state: Arc::new(Mutex::new(DirectoryState::default())),
        }
    }

    /// Handle onto the same directory acting on behalf of another user
    pub fn as_user(&self, caller: Identity) -> Self {
        Self {
            caller,
            state: Arc::clone(&self.state),
        }
    }

    pub fn caller(&self) -> &Identity {
        &self.caller
    }

    /// Insert or replace a community with its members and requests
    pub fn seed_community(
        &self,
        community: Community,
        members: Vec<MemberEntry>,
        requests: Vec<RequestEntry>,
    ) -> DirectoryResult<()> {
        let mut state = self.lock()?;
        state.communities.insert(
            community.id.clone(),
            CommunityRecord {
                community,
                members,
                requests,
            },
        );
        Ok(())
    }

    /// Put an invite into `user_id`'s inbox
    pub fn seed_invite(&self, user_id: &UserId, invite: CommunityInvite) -> DirectoryResult<()> {
        self.lock()?
            .inbox
            .entry(user_id.clone())
            .or_default()
            .push(invite);
        Ok(())
    }

    pub fn members(&self, id: &CommunityId) -> DirectoryResult<Vec<MemberEntry>> {
        Ok(self.lock()?.record(id)?.members.clone())
    }

    pub fn requests(&self, id: &CommunityId) -> DirectoryResult<Vec<RequestEntry>> {
        Ok(self.lock()?.record(id)?.requests.clone())
    }

    pub fn community(&self, id: &CommunityId) -> DirectoryResult<Option<Community>> {
        Ok(self
            .lock()?
            .communities
            .get(id)
            .map(|record| record.community.clone()))
    }

    pub fn inbox(&self, user_id: &UserId) -> DirectoryResult<Vec<CommunityInvite>> {
        Ok(self.lock()?.inbox.get(user_id).cloned().unwrap_or_default())
    }

    /// Answer the next `op` call with `success = false`
    pub fn reject_next(&self, op: &'static str, message: impl Into<String>) -> DirectoryResult<()> {
        self.lock()?
            .failures
            .insert(op, Failure::Rejected(message.into()));
        Ok(())
    }

    /// Fail the next `op` call at the transport level
    pub fn fail_next(&self, op: &'static str, message: impl Into<String>) -> DirectoryResult<()> {
        self.lock()?
            .failures
            .insert(op, Failure::Transport(message.into()));
        Ok(())
    }

    /// Hold back responses to `op` until the returned handle is notified
    ///
    /// The call still takes effect on the directory before it waits.
    pub fn hold(&self, op: &'static str) -> DirectoryResult<Arc<Notify>> {
        let notify = Arc::new(Notify::new());
        self.lock()?.holds.insert(op, Arc::clone(&notify));
        Ok(notify)
    }

    pub fn release(&self, op: &'static str) -> DirectoryResult<()> {
        if let Some(notify) = self.lock()?.holds.remove(op) {
            notify.notify_one();
        }
        Ok(())
    }

    pub fn calls(&self) -> DirectoryResult<Vec<DirectoryCall>> {
        Ok(self.lock()?.calls.clone())
    }

    pub fn call_count(&self, op: &str) -> DirectoryResult<usize> {
        Ok(self.lock()?.calls.iter().filter(|c| c.op == op).count())
    }

    /// Number of recorded calls that would change directory state
    pub fn mutating_call_count(&self) -> DirectoryResult<usize> {
        Ok(self.lock()?.calls.iter().filter(|c| !c.is_fetch()).count())
    }

    pub fn clear_calls(&self) -> DirectoryResult<()> {
        self.lock()?.calls.clear();
        Ok(())
    }

    fn lock(&self) -> DirectoryResult<MutexGuard<'_, DirectoryState>> {
        self.state
            .lock()
            .map_err(|_| DirectoryError::Transport(anyhow::anyhow!("mock directory poisoned")))
    }

    fn log(
        &self,
        state: &mut DirectoryState,
        op: &'static str,
        community_id: Option<&CommunityId>,
        target: Option<&UserId>,
    ) {
        state.calls.push(DirectoryCall {
            op,
            caller: self.caller.user_id.clone(),
            community_id: community_id.cloned(),
            target: target.cloned(),
        });
    }

    async fn query<T, F>(
        &self,
        op: &'static str,
        community_id: Option<&CommunityId>,
        read: F,
    ) -> DirectoryResult<T>
    where
        F: FnOnce(&mut DirectoryState, &Identity) -> DirectoryResult<T>,
    {
        let (outcome, hold) = {
            let mut state = self.lock()?;
            self.log(&mut state, op, community_id, None);
            if let Some(failure) = state.failures.remove(op) {
                return Err(failure.into_error());
            }
            (read(&mut *state, &self.caller), state.holds.get(op).cloned())
        };
        if let Some(notify) = hold {
            notify.notified().await;
        }
        outcome
    }

    async fn mutate<F>(
        &self,
        op: &'static str,
        community_id: &CommunityId,
        target: Option<&UserId>,
        apply: F,
    ) -> DirectoryResult<DirectoryAck>
    where
        F: FnOnce(&mut DirectoryState, &Identity) -> DirectoryResult<DirectoryAck>,
    {
        let (outcome, hold) = {
            let mut state = self.lock()?;
            self.log(&mut state, op, Some(community_id), target);
            if let Some(failure) = state.failures.remove(op) {
                return failure.into_ack();
            }
            (apply(&mut *state, &self.caller), state.holds.get(op).cloned())
        };
        if let Some(notify) = hold {
            notify.notified().await;
        }
        outcome
    }
}

fn member_from(identity: &Identity, role: Role) -> MemberEntry {
    MemberEntry {
        user_id: identity.user_id.clone(),
        username: identity.username.clone(),
        role,
        profile_image_ref: identity.profile_image_ref.clone(),
        cached_image_url: None,
    }
}

#[async_trait]
impl CommunityDirectory for MockDirectory {
    async fn fetch_community(&self, id: &CommunityId) -> DirectoryResult<Community> {
        self.query("fetch_community", Some(id), |state, _| {
            Ok(state.record(id)?.community.clone())
        })
        .await
    }

    async fn fetch_members(&self, id: &CommunityId) -> DirectoryResult<Vec<MemberEntry>> {
        self.query("fetch_members", Some(id), |state, _| {
            Ok(state.record(id)?.members.clone())
        })
        .await
    }

    async fn fetch_requests(&self, id: &CommunityId) -> DirectoryResult<Vec<RequestEntry>> {
        self.query("fetch_requests", Some(id), |state, _| {
            Ok(state.record(id)?.requests.clone())
        })
        .await
    }

    async fn join(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck> {
        self.mutate("join", id, None, |state, caller| {
            let record = state.record(id)?;
            if record.community.visibility != Visibility::Open {
                return Ok(DirectoryAck::rejected("community is closed"));
            }
            if record.has_member(&caller.user_id) {
                return Ok(DirectoryAck::rejected("already a member"));
            }
            record.members.push(member_from(caller, Role::Member));
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn request(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck> {
        self.mutate("request", id, None, |state, caller| {
            let record = state.record(id)?;
            if record.community.visibility == Visibility::Open {
                return Ok(DirectoryAck::rejected("community is open"));
            }
            if record.has_member(&caller.user_id) || record.has_request(&caller.user_id) {
                return Ok(DirectoryAck::rejected("already a member or requested"));
            }
            let mut entry = RequestEntry::new(caller.user_id.clone(), caller.username.clone());
            entry.profile_image_ref = caller.profile_image_ref.clone();
            record.requests.push(entry);
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn accept_request(&self, id: &CommunityId, user_id: &UserId) -> DirectoryResult<DirectoryAck> {
        self.mutate("accept_request", id, Some(user_id), |state, _| {
            let record = state.record(id)?;
            let Some(idx) = record.requests.iter().position(|r| &r.user_id == user_id) else {
                return Ok(DirectoryAck::rejected("no such request"));
            };
            let entry = record.requests.remove(idx);
            record.members.push(entry.into_member());
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn deny_request(&self, id: &CommunityId, user_id: &UserId) -> DirectoryResult<DirectoryAck> {
        self.mutate("deny_request", id, Some(user_id), |state, _| {
            let record = state.record(id)?;
            let before = record.requests.len();
            record.requests.retain(|r| &r.user_id != user_id);
            if record.requests.len() == before {
                return Ok(DirectoryAck::rejected("no such request"));
            }
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn promote(
        &self,
        id: &CommunityId,
        user_id: &UserId,
        to_role: Role,
    ) -> DirectoryResult<DirectoryAck> {
        self.mutate("promote", id, Some(user_id), |state, caller| {
            let record = state.record(id)?;
            if !record.has_member(user_id) {
                return Ok(DirectoryAck::rejected("not a member"));
            }
            if to_role == Role::Admin {
                match record.member_mut(&caller.user_id) {
                    Some(me) if me.role == Role::Admin => me.role = Role::Moderator,
                    _ => return Ok(DirectoryAck::rejected("only an admin can hand over")),
                }
            }
            if let Some(target) = record.member_mut(user_id) {
                target.role = to_role;
            }
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn demote(&self, id: &CommunityId, user_id: &UserId) -> DirectoryResult<DirectoryAck> {
        self.mutate("demote", id, Some(user_id), |state, _| {
            let record = state.record(id)?;
            match record.member_mut(user_id) {
                Some(target) if target.role == Role::Moderator => {
                    target.role = Role::Member;
                    Ok(DirectoryAck::ok())
                }
                _ => Ok(DirectoryAck::rejected("not a moderator")),
            }
        })
        .await
    }

    async fn remove(&self, id: &CommunityId, user_id: &UserId) -> DirectoryResult<DirectoryAck> {
        self.mutate("remove", id, Some(user_id), |state, _| {
            let record = state.record(id)?;
            if !record.has_member(user_id) {
                return Ok(DirectoryAck::rejected("not a member"));
            }
            record.members.retain(|m| &m.user_id != user_id);
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn leave(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck> {
        self.mutate("leave", id, None, |state, caller| {
            let record = state.record(id)?;
            if !record.has_member(&caller.user_id) {
                return Ok(DirectoryAck::rejected("not a member"));
            }
            record.members.retain(|m| m.user_id != caller.user_id);
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn delete(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck> {
        self.mutate("delete", id, None, |state, _| {
            state.record(id)?;
            state.communities.remove(id);
            for invites in state.inbox.values_mut() {
                invites.retain(|invite| &invite.community_id != id);
            }
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn create(&self, draft: &CommunityDraft) -> DirectoryResult<CommunityId> {
        self.query("create", None, |state, caller| {
            let id = CommunityId::generate();
            let mut community = Community::new(id.clone(), draft.name.clone(), draft.visibility);
            community.apply_draft(draft);
            state.communities.insert(
                id.clone(),
                CommunityRecord {
                    community,
                    members: vec![member_from(caller, Role::Admin)],
                    requests: Vec::new(),
                },
            );
            Ok(id)
        })
        .await
    }

    async fn update(&self, id: &CommunityId, draft: &CommunityDraft) -> DirectoryResult<DirectoryAck> {
        self.mutate("update", id, None, |state, _| {
            state.record(id)?.community.apply_draft(draft);
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn invite(&self, id: &CommunityId, user_id: &UserId) -> DirectoryResult<DirectoryAck> {
        self.mutate("invite", id, Some(user_id), |state, caller| {
            let record = state.record(id)?;
            if record.has_member(user_id) {
                return Ok(DirectoryAck::rejected("already a member"));
            }
            let mut invite = CommunityInvite::new(id.clone(), record.community.name.clone());
            invite.invited_by = Some(caller.username.clone());

            let inbox = state.inbox.entry(user_id.clone()).or_default();
            if inbox.iter().any(|i| &i.community_id == id) {
                return Ok(DirectoryAck::rejected("already invited"));
            }
            inbox.push(invite);
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn fetch_invites(&self) -> DirectoryResult<Vec<CommunityInvite>> {
        self.query("fetch_invites", None, |state, caller| {
            Ok(state.inbox.get(&caller.user_id).cloned().unwrap_or_default())
        })
        .await
    }

    async fn accept_invite(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck> {
        self.mutate("accept_invite", id, None, |state, caller| {
            let inbox = state.inbox.entry(caller.user_id.clone()).or_default();
            let Some(idx) = inbox.iter().position(|i| &i.community_id == id) else {
                return Ok(DirectoryAck::rejected("no such invite"));
            };
            inbox.remove(idx);

            let record = state.record(id)?;
            if record.has_member(&caller.user_id) {
                return Ok(DirectoryAck::rejected("already a member"));
            }
            record.requests.retain(|r| r.user_id != caller.user_id);
            record.members.push(member_from(caller, Role::Member));
            Ok(DirectoryAck::ok())
        })
        .await
    }

    async fn decline_invite(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck> {
        self.mutate("decline_invite", id, None, |state, caller| {
            let inbox = state.inbox.entry(caller.user_id.clone()).or_default();
            let before = inbox.len();
            inbox.retain(|i| &i.community_id != id);
            if inbox.len() == before {
                return Ok(DirectoryAck::rejected("no such invite"));
            }
            Ok(DirectoryAck::ok())
        })
        .await
    }
}
