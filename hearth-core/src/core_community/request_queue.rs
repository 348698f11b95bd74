//! Pending join requests for closed communities

use super::role::Role;
use super::roster::{MemberEntry, Roster, RosterError};
use super::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A user waiting for their join request to be decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEntry {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub profile_image_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_image_url: Option<String>,
}

impl RequestEntry {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            profile_image_ref: None,
            cached_image_url: None,
        }
    }

    pub fn with_profile_image(mut self, image_ref: impl Into<String>) -> Self {
        self.profile_image_ref = Some(image_ref.into());
        self
    }

    /// Entry this request becomes once approved
    pub fn into_member(self) -> MemberEntry {
        MemberEntry {
            user_id: self.user_id,
            username: self.username,
            role: Role::Member,
            profile_image_ref: self.profile_image_ref,
            cached_image_url: self.cached_image_url,
        }
    }
}

/// Request queue errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("User {0} already has a pending request")]
    AlreadyRequested(UserId),

    #[error("User {0} is already a member")]
    AlreadyMember(UserId),

    #[error("No pending request for user {0}")]
    NotFound(UserId),
}

impl From<RosterError> for RequestError {
    fn from(e: RosterError) -> Self {
        match e {
            RosterError::DuplicateMember(user) => RequestError::AlreadyMember(user),
            RosterError::NotFound(user) => RequestError::NotFound(user),
        }
    }
}

/// FIFO queue of pending requests, unique by user id
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    entries: Vec<RequestEntry>,
    image_cache: HashMap<UserId, String>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from a fetched request list
    ///
    /// Fails if an entry repeats or names someone already in `roster`.
    pub fn from_entries(
        entries: impl IntoIterator<Item = RequestEntry>,
        roster: &Roster,
    ) -> Result<Self, RequestError> {
        let mut queue = Self::new();
        for entry in entries {
            queue.enqueue(entry, roster)?;
        }
        Ok(queue)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.position(user_id).is_some()
    }

    pub fn get(&self, user_id: &UserId) -> Option<&RequestEntry> {
        self.position(user_id).map(|idx| &self.entries[idx])
    }

    /// Pending requests in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &RequestEntry> + '_ {
        self.entries.iter()
    }

    pub fn enqueue(&mut self, mut entry: RequestEntry, roster: &Roster) -> Result<(), RequestError> {
        if roster.contains(&entry.user_id) {
            return Err(RequestError::AlreadyMember(entry.user_id));
        }
        if self.contains(&entry.user_id) {
            return Err(RequestError::AlreadyRequested(entry.user_id));
        }

        if entry.cached_image_url.is_none() {
            entry.cached_image_url = self.image_cache.get(&entry.user_id).cloned();
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Move a request into `roster` as a Member
    ///
    /// Both collections are borrowed mutably for the whole move, so no reader
    /// can observe the id in both or in neither. Nothing changes on error.
    pub fn approve(&mut self, user_id: &UserId, roster: &mut Roster) -> Result<(), RequestError> {
        let idx = self
            .position(user_id)
            .ok_or_else(|| RequestError::NotFound(user_id.clone()))?;
        if roster.contains(user_id) {
            return Err(RequestError::AlreadyMember(user_id.clone()));
        }

        let entry = self.entries.remove(idx);
        let cached = self.image_cache.remove(user_id);
        let user_id = entry.user_id.clone();
        roster.add(entry.into_member())?;
        if let Some(url) = cached {
            roster.cache_image(&user_id, url)?;
        }
        Ok(())
    }

    pub fn deny(&mut self, user_id: &UserId) -> Result<RequestEntry, RequestError> {
        self.withdraw(user_id)
            .ok_or_else(|| RequestError::NotFound(user_id.clone()))
    }

    /// Drop a request if present, without treating absence as an error
    pub fn withdraw(&mut self, user_id: &UserId) -> Option<RequestEntry> {
        let idx = self.position(user_id)?;
        self.image_cache.remove(user_id);
        Some(self.entries.remove(idx))
    }

    pub fn cached_image(&self, user_id: &UserId) -> Option<&str> {
        self.image_cache.get(user_id).map(String::as_str)
    }

    pub fn cache_image(&mut self, user_id: &UserId, url: impl Into<String>) -> Result<(), RequestError> {
        let idx = self
            .position(user_id)
            .ok_or_else(|| RequestError::NotFound(user_id.clone()))?;

        let url = url.into();
        self.entries[idx].cached_image_url = Some(url.clone());
        self.image_cache.insert(user_id.clone(), url);
        Ok(())
    }

    /// Requests that have an image reference but no resolved url yet
    pub fn undecorated(&self) -> Vec<(UserId, String)> {
        self.entries
            .iter()
            .filter(|entry| entry.cached_image_url.is_none())
            .filter_map(|entry| {
                entry
                    .profile_image_ref
                    .as_ref()
                    .map(|r| (entry.user_id.clone(), r.clone()))
            })
            .collect()
    }

    fn position(&self, user_id: &UserId) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.user_id == user_id)
    }
}
