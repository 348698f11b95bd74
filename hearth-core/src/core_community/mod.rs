//! Community membership and role governance
//!
//! Tracks who belongs to a community, who is waiting to get in, and what each
//! member may do to others. The remote [`CommunityDirectory`] is the source of
//! truth; [`MembershipManager`] mirrors its confirmed transitions into the
//! open [`CommunityView`].
//!
//! Roles are ranked Owner (1), Admin (2), Moderator (3), Member (4). The
//! roster is always sorted by rank and then by arrival, and a user is never a
//! member and a pending requester at the same time.

pub mod adapters;
pub mod community;
pub mod directory;
pub mod errors;
pub mod invite;
pub mod manager;
pub mod request_queue;
pub mod role;
pub mod roster;
pub mod types;
pub mod view;

#[cfg(test)]
mod tests;

pub use community::{Community, CommunityDraft, CommunityError, Location, Visibility};
pub use directory::{CommunityDirectory, DirectoryAck, DirectoryError, DirectoryResult, ImageResolver};
pub use errors::{MembershipError, MembershipResult};
pub use invite::{CommunityInvite, InviteLedger};
pub use manager::MembershipManager;
pub use request_queue::{RequestEntry, RequestQueue};
pub use role::{MemberActions, Role};
pub use roster::{group_into_rows, MemberEntry, Roster};
pub use types::{CommunityId, Identity, UserId};
pub use view::CommunityView;
