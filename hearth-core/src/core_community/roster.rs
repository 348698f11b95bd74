//! Roster of confirmed community members
//!
//! The roster keeps its entries ordered by role rank (Owner first) with
//! ties broken by arrival order. Every mutation re-establishes that order,
//! so the read-side projections ([`Roster::sorted_view`],
//! [`Roster::grouped_rows`], [`Roster::filter`]) are plain borrows.

use super::role::Role;
use super::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A confirmed member of a community
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEntry {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub profile_image_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_image_url: Option<String>,
}

impl MemberEntry {
    pub fn new(user_id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            profile_image_ref: None,
            cached_image_url: None,
        }
    }

    pub fn with_profile_image(mut self, image_ref: impl Into<String>) -> Self {
        self.profile_image_ref = Some(image_ref.into());
        self
    }
}

#[derive(Debug, Clone)]
struct Slot {
    entry: MemberEntry,
    arrival: u64,
}

/// Roster operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("Member {0} already in roster")]
    DuplicateMember(UserId),

    #[error("Member {0} not found in roster")]
    NotFound(UserId),
}

/// Ordered set of members, unique by user id
#[derive(Debug, Clone, Default)]
pub struct Roster {
    slots: Vec<Slot>,
    next_arrival: u64,
    image_cache: HashMap<UserId, String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from a fetched member list, keeping the fetch order
    /// as arrival order
    pub fn from_entries(
        entries: impl IntoIterator<Item = MemberEntry>,
    ) -> Result<Self, RosterError> {
        let mut roster = Self::new();
        for entry in entries {
            roster.add(entry)?;
        }
        Ok(roster)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.position(user_id).is_some()
    }

    pub fn get(&self, user_id: &UserId) -> Option<&MemberEntry> {
        self.position(user_id).map(|idx| &self.slots[idx].entry)
    }

    pub fn role_of(&self, user_id: &UserId) -> Option<Role> {
        self.get(user_id).map(|entry| entry.role)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&MemberEntry> {
        self.slots
            .iter()
            .map(|slot| &slot.entry)
            .find(|entry| entry.username == username)
    }

    /// Number of members holding `role`
    pub fn count_role(&self, role: Role) -> usize {
        self.slots.iter().filter(|slot| slot.entry.role == role).count()
    }

    pub fn add(&mut self, mut entry: MemberEntry) -> Result<(), RosterError> {
        if self.contains(&entry.user_id) {
            return Err(RosterError::DuplicateMember(entry.user_id));
        }

        if entry.cached_image_url.is_none() {
            entry.cached_image_url = self.image_cache.get(&entry.user_id).cloned();
        }

        let arrival = self.next_arrival;
        self.next_arrival += 1;
        self.slots.push(Slot { entry, arrival });
        self.resort();
        Ok(())
    }

    /// Remove a member and drop its cached image url
    pub fn remove(&mut self, user_id: &UserId) -> Result<MemberEntry, RosterError> {
        let idx = self
            .position(user_id)
            .ok_or_else(|| RosterError::NotFound(user_id.clone()))?;

        self.image_cache.remove(user_id);
        Ok(self.slots.remove(idx).entry)
    }

    /// Change a member's role, returning the previous one
    pub fn set_role(&mut self, user_id: &UserId, new_role: Role) -> Result<Role, RosterError> {
        let idx = self
            .position(user_id)
            .ok_or_else(|| RosterError::NotFound(user_id.clone()))?;

        let previous = std::mem::replace(&mut self.slots[idx].entry.role, new_role);
        self.resort();
        Ok(previous)
    }

    /// Apply several role changes as one update
    ///
    /// Every user id is checked before anything is written; if one is
    /// missing the roster is left untouched.
    pub fn set_roles(&mut self, changes: &[(UserId, Role)]) -> Result<(), RosterError> {
        let mut targets = Vec::with_capacity(changes.len());
        for (user_id, role) in changes {
            let idx = self
                .position(user_id)
                .ok_or_else(|| RosterError::NotFound(user_id.clone()))?;
            targets.push((idx, *role));
        }

        for (idx, role) in targets {
            self.slots[idx].entry.role = role;
        }
        self.resort();
        Ok(())
    }

    /// Members ordered by rank ascending, then arrival
    pub fn sorted_view(&self) -> impl Iterator<Item = &MemberEntry> + '_ {
        self.slots.iter().map(|slot| &slot.entry)
    }

    /// Rows of at most `group_size` members for display
    pub fn grouped_rows(&self, group_size: usize) -> Vec<Vec<&MemberEntry>> {
        group_into_rows(self.sorted_view().collect(), group_size)
    }

    /// Username search over the full roster
    pub fn filter(&self, needle: &str) -> RosterFilter<'_> {
        RosterFilter {
            roster: self,
            needle: needle.trim().to_lowercase(),
        }
    }

    pub fn cached_image(&self, user_id: &UserId) -> Option<&str> {
        self.image_cache.get(user_id).map(String::as_str)
    }

    /// Record a resolved image url for a present member
    pub fn cache_image(&mut self, user_id: &UserId, url: impl Into<String>) -> Result<(), RosterError> {
        let idx = self
            .position(user_id)
            .ok_or_else(|| RosterError::NotFound(user_id.clone()))?;

        let url = url.into();
        self.slots[idx].entry.cached_image_url = Some(url.clone());
        self.image_cache.insert(user_id.clone(), url);
        Ok(())
    }

    /// Members that have an image reference but no resolved url yet
    pub fn undecorated(&self) -> Vec<(UserId, String)> {
        self.slots
            .iter()
            .filter(|slot| slot.entry.cached_image_url.is_none())
            .filter_map(|slot| {
                slot.entry
                    .profile_image_ref
                    .as_ref()
                    .map(|r| (slot.entry.user_id.clone(), r.clone()))
            })
            .collect()
    }

    fn position(&self, user_id: &UserId) -> Option<usize> {
        self.slots.iter().position(|slot| &slot.entry.user_id == user_id)
    }

    fn resort(&mut self) {
        self.slots
            .sort_by_key(|slot| (slot.entry.role.rank(), slot.arrival));
    }
}

/// Lazy, restartable username filter over a [`Roster`]
///
/// Borrowing the roster means a filter can never modify it; a new search is
/// always evaluated against the complete member set.
#[derive(Debug, Clone)]
pub struct RosterFilter<'a> {
    roster: &'a Roster,
    needle: String,
}

impl<'a> RosterFilter<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a MemberEntry> + '_ {
        self.roster
            .sorted_view()
            .filter(move |entry| entry.username.to_lowercase().contains(&self.needle))
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn rows(&self, group_size: usize) -> Vec<Vec<&'a MemberEntry>> {
        group_into_rows(self.iter().collect(), group_size)
    }
}

/// Split `items` into rows of `group_size`
///
/// A trailing singleton row borrows the last entry of the row before it, so
/// 7 items in rows of 3 become `[3, 2, 2]`. Rows narrower than 3 are never
/// rebalanced.
pub fn group_into_rows<T>(items: Vec<T>, group_size: usize) -> Vec<Vec<T>> {
    let group_size = group_size.max(1);
    let mut rows: Vec<Vec<T>> = Vec::with_capacity(items.len().div_ceil(group_size));

    let mut current = Vec::with_capacity(group_size);
    for item in items {
        current.push(item);
        if current.len() == group_size {
            rows.push(std::mem::replace(&mut current, Vec::with_capacity(group_size)));
        }
    }
    if !current.is_empty() {
        rows.push(current);
    }

    let n = rows.len();
    if group_size >= 3 && n > 1 && rows[n - 1].len() == 1 {
        if let Some(borrowed) = rows[n - 2].pop() {
            rows[n - 1].insert(0, borrowed);
        }
    }

    rows
}
