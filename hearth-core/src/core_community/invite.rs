//! Community invitations between friends

use super::types::{CommunityId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An invitation addressed to the acting user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityInvite {
    pub community_id: CommunityId,
    pub community_name: String,
    /// Username of the member who sent the invite
    #[serde(default)]
    pub invited_by: Option<String>,
}

impl CommunityInvite {
    pub fn new(community_id: CommunityId, community_name: impl Into<String>) -> Self {
        Self {
            community_id,
            community_name: community_name.into(),
            invited_by: None,
        }
    }
}

/// Invite errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InviteError {
    #[error("User {0} was already invited")]
    AlreadyInvited(UserId),
}

/// Invites sent from an open community view
///
/// Keeps the "invited" marker on the friend picker consistent after the
/// directory confirmed the invite.
#[derive(Debug, Clone, Default)]
pub struct InviteLedger {
    sent: HashSet<UserId>,
}

impl InviteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, user_id: UserId) -> Result<(), InviteError> {
        if !self.sent.insert(user_id.clone()) {
            return Err(InviteError::AlreadyInvited(user_id));
        }
        Ok(())
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.sent.contains(user_id)
    }

    /// Forget an invite once the user joined or requested
    pub fn settle(&mut self, user_id: &UserId) -> bool {
        self.sent.remove(user_id)
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}
