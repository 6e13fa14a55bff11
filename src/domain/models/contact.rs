//! Contact classification types and the trigger that enters the pipeline.
//!
//! A `ContactTrigger` is constructed by an external event (webhook, poll,
//! manual CLI call) and consumed exactly once by the automation layer. It is
//! never mutated after construction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the three organizations sharing the platform.
///
/// Entities must not cross-contaminate data: template selection, task sinks,
/// and metrics are all keyed by entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusinessEntity {
    /// Art gallery and wellness center.
    #[serde(rename = "the_7_space")]
    The7Space,
    /// Consulting practice.
    #[serde(rename = "am_consulting")]
    AmConsulting,
    /// Community platform.
    #[serde(rename = "higherself_core")]
    HigherselfCore,
}

impl BusinessEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::The7Space => "the_7_space",
            Self::AmConsulting => "am_consulting",
            Self::HigherselfCore => "higherself_core",
        }
    }

    /// Parse an entity id as it appears in config files and Notion selects.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "the_7_space" => Some(Self::The7Space),
            "am_consulting" => Some(Self::AmConsulting),
            "higherself_core" => Some(Self::HigherselfCore),
            _ => None,
        }
    }
}

impl std::fmt::Display for BusinessEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification tags assigned to a contact by the upstream classifier.
///
/// Classification itself (LLM or heuristic) happens outside this crate; the
/// automation layer treats these as opaque input labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactType {
    Artist,
    #[serde(rename = "gallery_contact")]
    GalleryContact,
    #[serde(rename = "wellness_client")]
    WellnessClient,
    #[serde(rename = "business_partner")]
    BusinessPartner,
    #[serde(rename = "potential_client")]
    PotentialClient,
    Media,
    Academic,
    General,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artist => "Artist",
            Self::GalleryContact => "Gallery Contact",
            Self::WellnessClient => "Wellness Client",
            Self::BusinessPartner => "Business Partner",
            Self::PotentialClient => "Potential Client",
            Self::Media => "Media",
            Self::Academic => "Academic",
            Self::General => "General",
        }
    }

    /// Parse the display name used in Notion select options.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Artist" => Some(Self::Artist),
            "Gallery Contact" => Some(Self::GalleryContact),
            "Wellness Client" => Some(Self::WellnessClient),
            "Business Partner" => Some(Self::BusinessPartner),
            "Potential Client" => Some(Self::PotentialClient),
            "Media" => Some(Self::Media),
            "Academic" => Some(Self::Academic),
            "General" => Some(Self::General),
            _ => None,
        }
    }
}

/// Where the contact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Website,
    Event,
    Referral,
    SocialMedia,
    WalkIn,
    Newsletter,
    Manual,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Event => "event",
            Self::Referral => "referral",
            Self::SocialMedia => "social_media",
            Self::WalkIn => "walk_in",
            Self::Newsletter => "newsletter",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "website" => Some(Self::Website),
            "event" => Some(Self::Event),
            "referral" => Some(Self::Referral),
            "social_media" => Some(Self::SocialMedia),
            "walk_in" => Some(Self::WalkIn),
            "newsletter" => Some(Self::Newsletter),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// An event describing a contact entering the automation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactTrigger {
    /// Identifier of the contact record in the external store.
    pub contact_id: String,
    /// Contact email address.
    pub email: String,
    /// Classification tags for this contact.
    #[serde(default)]
    pub contact_types: Vec<ContactType>,
    /// Where this contact came from.
    pub lead_source: LeadSource,
    /// Name of the event that produced this trigger
    /// (e.g. `contact_created`, `form_submitted`).
    pub trigger_event: String,
    /// Business entities this contact is relevant to.
    pub business_entities: Vec<BusinessEntity>,
    /// Free-form metadata passed through to actions untouched.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ContactTrigger {
    /// Check the structural requirements for processing.
    ///
    /// A trigger must carry a contact id, an email, and at least one
    /// business entity.
    pub fn validate(&self) -> Result<(), String> {
        if self.contact_id.trim().is_empty() {
            return Err("trigger is missing a contact id".to_string());
        }
        if self.email.trim().is_empty() {
            return Err("trigger is missing a contact email".to_string());
        }
        if self.business_entities.is_empty() {
            return Err("trigger names no business entities".to_string());
        }
        Ok(())
    }

    /// Whether any of the given contact types is present on this trigger.
    pub fn has_any_type(&self, types: &[ContactType]) -> bool {
        self.contact_types.iter().any(|t| types.contains(t))
    }
}

/// A contact record as read back from the external store by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    /// External store identifier (Notion page id).
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub contact_types: Vec<ContactType>,
    pub lead_source: LeadSource,
    #[serde(default)]
    pub business_entities: Vec<BusinessEntity>,
    /// When the record was last edited in the external store.
    pub last_edited: DateTime<Utc>,
}

impl ContactRecord {
    /// Convert a changed contact record into a trigger for the pipeline.
    pub fn into_trigger(self, trigger_event: &str) -> ContactTrigger {
        ContactTrigger {
            contact_id: self.id,
            email: self.email,
            contact_types: self.contact_types,
            lead_source: self.lead_source,
            trigger_event: trigger_event.to_string(),
            business_entities: self.business_entities,
            metadata: HashMap::new(),
        }
    }
}
