//! Community data structures

use super::types::CommunityId;
use serde::{Deserialize, Serialize};

const MAX_NAME_LEN: usize = 100;

/// How a non-member may enter a community
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anyone can join directly
    Open,
    /// Entry goes through a join request approved by an Admin or Moderator
    Closed,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Open
    }
}

/// Physical location attached to a community
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub street: String,
    pub city: String,
    pub country: String,
    pub timezone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    /// "street, city, country" with empty parts skipped
    pub fn formatted(&self) -> String {
        [&self.street, &self.city, &self.country]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// A community as reported by the directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub location: Option<Location>,
    pub visibility: Visibility,
    /// Only Admins and Moderators may send invites when set
    #[serde(default)]
    pub invite_only: bool,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub banner_ref: Option<String>,
}

impl Community {
    pub fn new(id: CommunityId, name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            location: None,
            visibility,
            invite_only: false,
            image_ref: None,
            banner_ref: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.visibility == Visibility::Open
    }

    /// Case-insensitive name search; an empty term matches everything
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        term.is_empty() || self.name.to_lowercase().contains(&term.to_lowercase())
    }

    /// Replace the editable details, keeping the id
    pub fn apply_draft(&mut self, draft: &CommunityDraft) {
        self.name = draft.name.trim().to_string();
        self.description = draft.description.trim().to_string();
        self.location = draft.location.clone();
        self.visibility = draft.visibility;
        self.invite_only = draft.invite_only;
        if draft.image_ref.is_some() {
            self.image_ref = draft.image_ref.clone();
        }
        if draft.banner_ref.is_some() {
            self.banner_ref = draft.banner_ref.clone();
        }
    }
}

/// Filter a community listing by name
pub fn search<'a>(communities: &'a [Community], term: &'a str) -> impl Iterator<Item = &'a Community> {
    communities.iter().filter(move |c| c.matches(term))
}

/// Details submitted when creating or editing a community
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommunityDraft {
    pub name: String,
    pub description: String,
    pub location: Option<Location>,
    pub visibility: Visibility,
    pub invite_only: bool,
    pub image_ref: Option<String>,
    pub banner_ref: Option<String>,
}

impl CommunityDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn invite_only(mut self, enabled: bool) -> Self {
        self.invite_only = enabled;
        self
    }

    /// Check required fields before anything is sent to the directory
    pub fn validate(&self) -> Result<(), CommunityError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CommunityError::MissingField("name"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CommunityError::NameTooLong(MAX_NAME_LEN));
        }
        if self.description.trim().is_empty() {
            return Err(CommunityError::MissingField("description"));
        }
        Ok(())
    }

    /// Prefill a draft from an existing community for editing
    pub fn from_community(community: &Community) -> Self {
        Self {
            name: community.name.clone(),
            description: community.description.clone(),
            location: community.location.clone(),
            visibility: community.visibility,
            invite_only: community.invite_only,
            image_ref: community.image_ref.clone(),
            banner_ref: community.banner_ref.clone(),
        }
    }
}

/// Community draft validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommunityError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Community name exceeds {0} characters")]
    NameTooLong(usize),
}
