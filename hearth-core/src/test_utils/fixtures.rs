//! Test fixtures for creating common test objects
//!
//! Builders for members and a ready-made community world backed by the
//! in-memory directory.

use crate::config::MembershipConfig;
use crate::core_community::adapters::{MockDirectory, StaticImageResolver};
use crate::core_community::{
    Community, CommunityId, Identity, MemberEntry, MembershipManager, RequestEntry, Role, Roster,
    UserId, Visibility,
};
use crate::metrics::MembershipMetrics;
use std::sync::Arc;

pub const TEST_IMAGE_BASE: &str = "https://img.test";

/// Builder for creating test members
pub struct TestMemberBuilder {
    id: String,
    role: Role,
    image_ref: Option<String>,
}

impl TestMemberBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            role: Role::Member,
            image_ref: None,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_image(mut self, image_ref: &str) -> Self {
        self.image_ref = Some(image_ref.to_string());
        self
    }

    pub fn build(self) -> MemberEntry {
        let entry = MemberEntry::new(UserId::new(self.id.clone()), self.id, self.role);
        match self.image_ref {
            Some(image_ref) => entry.with_profile_image(image_ref),
            None => entry,
        }
    }
}

/// Member entry whose username equals its id
pub fn member(id: &str, role: Role) -> MemberEntry {
    TestMemberBuilder::new(id).role(role).build()
}

pub fn request(id: &str) -> RequestEntry {
    RequestEntry::new(UserId::from(id), id)
}

pub fn identity(id: &str) -> Identity {
    Identity::new(UserId::from(id), id)
}

/// Roster built from `(id, role)` pairs in arrival order
pub fn roster_of(members: &[(&str, Role)]) -> Roster {
    Roster::from_entries(members.iter().map(|(id, role)| member(id, *role)))
        .expect("fixture members must be unique")
}

/// One community seeded in a mock directory
pub struct TestWorld {
    pub directory: MockDirectory,
    pub community_id: CommunityId,
}

impl TestWorld {
    /// Seed community `garden` with `members` and `requests`
    pub fn new(visibility: Visibility, members: &[(&str, Role)], requests: &[&str]) -> Self {
        Self::seeded(
            Community::new(CommunityId::from("garden"), "Garden", visibility),
            members.iter().map(|(id, role)| member(id, *role)).collect(),
            requests.iter().map(|id| request(id)).collect(),
        )
    }

    pub fn seeded(
        community: Community,
        members: Vec<MemberEntry>,
        requests: Vec<RequestEntry>,
    ) -> Self {
        let community_id = community.id.clone();
        let directory = MockDirectory::new(identity("system"));
        directory
            .seed_community(community, members, requests)
            .expect("seeding the mock directory");
        Self {
            directory,
            community_id,
        }
    }

    /// Directory handle acting as `user`
    pub fn directory_for(&self, user: &str) -> MockDirectory {
        self.directory.as_user(identity(user))
    }

    /// Manager signed in as `user`, with a fresh metrics handle
    pub fn manager_for(&self, user: &str) -> MembershipManager {
        self.manager_with_config(user, MembershipConfig::default())
    }

    pub fn manager_with_config(&self, user: &str, config: MembershipConfig) -> MembershipManager {
        MembershipManager::new(Arc::new(self.directory_for(user)), identity(user))
            .with_image_resolver(Arc::new(StaticImageResolver::new(TEST_IMAGE_BASE)))
            .with_config(config)
            .with_metrics(MembershipMetrics::new(true))
    }
}
