//! Local state of one open community

use super::community::Community;
use super::invite::InviteLedger;
use super::request_queue::RequestQueue;
use super::role::{MemberActions, Role};
use super::roster::{MemberEntry, Roster};
use super::types::UserId;

/// Roster, request queue and details of the community currently on screen
///
/// Created empty when a community is opened, populated by a full fetch and
/// discarded when the view closes. The directory stays the source of truth.
#[derive(Debug, Clone)]
pub struct CommunityView {
    pub community: Community,
    pub roster: Roster,
    pub requests: RequestQueue,
    pub invites: InviteLedger,
}

impl CommunityView {
    pub fn new(community: Community) -> Self {
        Self {
            community,
            roster: Roster::new(),
            requests: RequestQueue::new(),
            invites: InviteLedger::new(),
        }
    }

    pub fn role_of(&self, user_id: &UserId) -> Option<Role> {
        self.roster.role_of(user_id)
    }

    /// Display rows of the full roster
    pub fn member_rows(&self, group_size: usize) -> Vec<Vec<MemberEntry>> {
        self.roster
            .grouped_rows(group_size)
            .into_iter()
            .map(|row| row.into_iter().cloned().collect())
            .collect()
    }

    /// Display rows of members whose username contains `needle`
    pub fn search_rows(&self, needle: &str, group_size: usize) -> Vec<Vec<MemberEntry>> {
        self.roster
            .filter(needle)
            .rows(group_size)
            .into_iter()
            .map(|row| row.into_iter().cloned().collect())
            .collect()
    }

    /// Options `actor` gets when opening `target`'s menu
    pub fn actions_for(&self, actor: &UserId, target: &UserId) -> MemberActions {
        match (self.role_of(actor), self.role_of(target)) {
            (Some(actor_role), Some(target_role)) => {
                MemberActions::for_pair(actor, actor_role, target, target_role)
            }
            _ => MemberActions::default(),
        }
    }

    /// True if `user_id` holds Owner or Admin and nobody else does
    pub fn is_sole_owner(&self, user_id: &UserId) -> bool {
        match self.role_of(user_id) {
            Some(role) if role.holds_ownership() => {
                self.roster
                    .sorted_view()
                    .filter(|entry| entry.role.holds_ownership())
                    .count()
                    == 1
            }
            _ => false,
        }
    }
}
