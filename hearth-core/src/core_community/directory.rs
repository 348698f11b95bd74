//! Collaborator contracts consumed by the membership core
//!
//! The remote community service and the image store are injected. Their
//! transport, retries and timeouts are owned by the implementations.

use super::community::{Community, CommunityDraft};
use super::invite::CommunityInvite;
use super::request_queue::RequestEntry;
use super::role::Role;
use super::roster::MemberEntry;
use super::types::{CommunityId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Acknowledgement of a mutating directory call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryAck {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl DirectoryAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    /// Turn a `success = false` ack into an error
    pub fn into_result(self) -> Result<(), DirectoryError> {
        if self.success {
            Ok(())
        } else {
            Err(DirectoryError::Rejected(
                self.message.unwrap_or_else(|| "request rejected".to_string()),
            ))
        }
    }
}

/// Directory call failures
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory rejected the request: {0}")]
    Rejected(String),

    #[error("Community {0} not found")]
    NotFound(CommunityId),

    #[error("Transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Remote source of truth for communities and their membership
///
/// Calls act on behalf of the authenticated user. Member and request
/// listings are always flat sequences.
#[async_trait]
pub trait CommunityDirectory: Send + Sync {
    async fn fetch_community(&self, id: &CommunityId) -> DirectoryResult<Community>;

    async fn fetch_members(&self, id: &CommunityId) -> DirectoryResult<Vec<MemberEntry>>;

    async fn fetch_requests(&self, id: &CommunityId) -> DirectoryResult<Vec<RequestEntry>>;

    async fn join(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck>;

    async fn request(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck>;

    async fn accept_request(&self, id: &CommunityId, user_id: &UserId) -> DirectoryResult<DirectoryAck>;

    async fn deny_request(&self, id: &CommunityId, user_id: &UserId) -> DirectoryResult<DirectoryAck>;

    /// Promote `user_id` to `to_role`
    ///
    /// `to_role == Role::Admin` is the ownership handoff: the directory also
    /// demotes the calling Admin to Moderator.
    async fn promote(
        &self,
        id: &CommunityId,
        user_id: &UserId,
        to_role: Role,
    ) -> DirectoryResult<DirectoryAck>;

    /// Demote a Moderator back to Member
    async fn demote(&self, id: &CommunityId, user_id: &UserId) -> DirectoryResult<DirectoryAck>;

    async fn remove(&self, id: &CommunityId, user_id: &UserId) -> DirectoryResult<DirectoryAck>;

    async fn leave(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck>;

    async fn delete(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck>;

    async fn create(&self, draft: &CommunityDraft) -> DirectoryResult<CommunityId>;

    async fn update(&self, id: &CommunityId, draft: &CommunityDraft) -> DirectoryResult<DirectoryAck>;

    async fn invite(&self, id: &CommunityId, user_id: &UserId) -> DirectoryResult<DirectoryAck>;

    /// Invites addressed to the calling user
    async fn fetch_invites(&self) -> DirectoryResult<Vec<CommunityInvite>>;

    async fn accept_invite(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck>;

    async fn decline_invite(&self, id: &CommunityId) -> DirectoryResult<DirectoryAck>;
}

/// Resolves storage references to displayable urls
#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve(&self, image_ref: &str) -> anyhow::Result<String>;
}
