//! Community roles and the permission predicates over them
//!
//! Roles form a fixed total order by rank. A lower rank carries more
//! authority: `Owner(1) > Admin(2) > Moderator(3) > Member(4)`.
//!
//! The predicates here are pure. The manager consults them before any
//! remote call is issued.

use super::types::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a member inside a community
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    /// Founding role, rank 1
    Owner,
    /// Governs the community, rank 2. Holds ownership handoff rights.
    Admin,
    /// Can remove, block and decide join requests, rank 3
    Moderator,
    /// Default role for confirmed members, rank 4
    Member,
}

impl Role {
    /// All roles, highest authority first
    pub const ALL: [Role; 4] = [Role::Owner, Role::Admin, Role::Moderator, Role::Member];

    /// Numeric rank as used by the directory
    pub fn rank(self) -> u8 {
        match self {
            Role::Owner => 1,
            Role::Admin => 2,
            Role::Moderator => 3,
            Role::Member => 4,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            1 => Some(Role::Owner),
            2 => Some(Role::Admin),
            3 => Some(Role::Moderator),
            4 => Some(Role::Member),
            _ => None,
        }
    }

    /// True if `self` carries strictly more authority than `other`
    pub fn outranks(self, other: Role) -> bool {
        self.rank() < other.rank()
    }

    /// Owner or Admin
    pub fn holds_ownership(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Style class used when rendering member badges
    pub fn css_class(self) -> &'static str {
        match self {
            Role::Owner => "super-admin",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Member => "member",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Admin => "Admin",
            Role::Moderator => "Moderator",
            Role::Member => "Member",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Member
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label(), self.rank())
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by rank ascending, so `Owner < Member`
impl Ord for Role {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Error returned when decoding an unknown role rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role rank: {0}")]
pub struct UnknownRole(pub u8);

impl TryFrom<u8> for Role {
    type Error = UnknownRole;

    fn try_from(rank: u8) -> Result<Self, Self::Error> {
        Role::from_rank(rank).ok_or(UnknownRole(rank))
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role.rank()
    }
}

/// Only an Admin may hand ownership to another member
pub fn can_promote_to_owner(actor: Role) -> bool {
    actor == Role::Admin
}

pub fn can_promote_to_moderator(actor: Role, target: Role) -> bool {
    actor == Role::Admin && target != Role::Moderator
}

/// Demotion always lands on [`Role::Member`]
pub fn can_demote_moderator(actor: Role, target: Role) -> bool {
    actor == Role::Admin && target == Role::Moderator
}

pub fn can_remove(actor: Role) -> bool {
    matches!(actor, Role::Admin | Role::Moderator)
}

pub fn can_block(actor: Role) -> bool {
    matches!(actor, Role::Admin | Role::Moderator)
}

/// Join requests are decided with removal authority
pub fn can_decide_requests(actor: Role) -> bool {
    can_remove(actor)
}

pub fn can_delete_community(actor: Role) -> bool {
    actor.holds_ownership()
}

pub fn can_edit_community(actor: Role) -> bool {
    actor.holds_ownership()
}

/// No action may target the acting user
pub fn can_act_on_self() -> bool {
    false
}

/// Options offered for one member when viewed by another
///
/// Must be recomputed whenever either role changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MemberActions {
    pub view_profile: bool,
    pub share_profile: bool,
    pub promote_owner: bool,
    pub promote_moderator: bool,
    pub demote_moderator: bool,
    pub report: bool,
    pub block: bool,
    pub remove: bool,
}

impl MemberActions {
    /// Compute the option set `actor` sees for `target`
    pub fn for_pair(
        actor_id: &UserId,
        actor_role: Role,
        target_id: &UserId,
        target_role: Role,
    ) -> Self {
        if actor_id == target_id && !can_act_on_self() {
            return Self::default();
        }

        Self {
            view_profile: true,
            share_profile: true,
            promote_owner: can_promote_to_owner(actor_role),
            promote_moderator: can_promote_to_moderator(actor_role, target_role),
            demote_moderator: can_demote_moderator(actor_role, target_role),
            report: true,
            block: can_block(actor_role),
            remove: can_remove(actor_role),
        }
    }

    pub fn visible_count(&self) -> usize {
        [
            self.view_profile,
            self.share_profile,
            self.promote_owner,
            self.promote_moderator,
            self.demote_moderator,
            self.report,
            self.block,
            self.remove,
        ]
        .iter()
        .filter(|v| **v)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.visible_count() == 0
    }
}
