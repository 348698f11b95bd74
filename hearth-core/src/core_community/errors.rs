//! Error types for membership operations

use super::community::CommunityError;
use super::directory::DirectoryError;
use super::invite::InviteError;
use super::request_queue::RequestError;
use super::roster::RosterError;
use super::types::UserId;
use thiserror::Error;

/// Result type for membership operations
pub type MembershipResult<T> = Result<T, MembershipError>;

/// Errors surfaced to callers of the membership manager
#[derive(Error, Debug)]
pub enum MembershipError {
    /// Local roster already holds this user
    #[error("Member {0} already in roster")]
    DuplicateMember(UserId),

    #[error("User {0} already has a pending request")]
    AlreadyRequested(UserId),

    #[error("User {0} is already a member")]
    AlreadyMember(UserId),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The acting role may not perform this action
    #[error("Not authorized to {action}")]
    Unauthorized { action: &'static str },

    /// The directory call failed or returned `success = false`
    #[error("Remote failure: {0}")]
    RemoteFailure(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The only owner must hand over ownership before leaving
    #[error("Ownership must be transferred before leaving")]
    OwnershipTransferRequired,

    /// No community view is open, or it closed while a call was in flight
    #[error("Community view is closed")]
    ViewClosed,

    #[error("Invalid community: {0}")]
    InvalidCommunity(#[from] CommunityError),
}

impl MembershipError {
    /// Errors signalling that local state no longer mirrors the directory
    pub fn is_divergence(&self) -> bool {
        matches!(
            self,
            MembershipError::DuplicateMember(_)
                | MembershipError::AlreadyMember(_)
                | MembershipError::AlreadyRequested(_)
                | MembershipError::NotFound(_)
        )
    }
}

impl From<RosterError> for MembershipError {
    fn from(e: RosterError) -> Self {
        match e {
            RosterError::DuplicateMember(user) => MembershipError::DuplicateMember(user),
            RosterError::NotFound(user) => MembershipError::NotFound(format!("member {user}")),
        }
    }
}

impl From<RequestError> for MembershipError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::AlreadyRequested(user) => MembershipError::AlreadyRequested(user),
            RequestError::AlreadyMember(user) => MembershipError::AlreadyMember(user),
            RequestError::NotFound(user) => MembershipError::NotFound(format!("request {user}")),
        }
    }
}

impl From<InviteError> for MembershipError {
    fn from(e: InviteError) -> Self {
        MembershipError::InvalidOperation(e.to_string())
    }
}

impl From<DirectoryError> for MembershipError {
    fn from(e: DirectoryError) -> Self {
        MembershipError::RemoteFailure(e.to_string())
    }
}
