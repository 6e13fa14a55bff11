//! Built-in workflow templates and rule-based selection.
//!
//! Templates are static data: an ordered action list keyed by entity and
//! contact classification. Selection walks the trigger's business entities
//! and picks at most one template per entity, falling back to a
//! cross-entity generic welcome when nothing matches.

use std::collections::HashMap;

use crate::domain::models::{
    ActionCondition, ActionKind, BusinessEntity, ContactTrigger, ContactType, LeadSource,
    WorkflowAction, WorkflowTemplate,
};

pub const GENERIC_TEMPLATE: &str = "generic_contact_welcome";

/// Catalog of registered templates plus the selection rules.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: HashMap<String, WorkflowTemplate>,
}

impl TemplateCatalog {
    /// Empty catalog; register templates explicitly.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// The full built-in catalog for the three entities.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for template in builtin_templates() {
            catalog.register(template);
        }
        catalog
    }

    /// Insert or replace a template by name.
    pub fn register(&mut self, template: WorkflowTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn get(&self, name: &str) -> Option<&WorkflowTemplate> {
        self.templates.get(name)
    }

    /// All templates for one entity, sorted by name.
    pub fn for_entity(&self, entity: BusinessEntity) -> Vec<&WorkflowTemplate> {
        let mut templates: Vec<&WorkflowTemplate> = self
            .templates
            .values()
            .filter(|t| t.entity == Some(entity))
            .collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }

    /// All templates, sorted by name.
    pub fn all(&self) -> Vec<&WorkflowTemplate> {
        let mut templates: Vec<&WorkflowTemplate> = self.templates.values().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }

    /// Select the templates to run for a trigger: one per business entity,
    /// chosen by classification rules, with the generic welcome as the
    /// overall fallback when no entity rule fires.
    pub fn select_for(&self, trigger: &ContactTrigger) -> Vec<&WorkflowTemplate> {
        let mut selected = Vec::new();
        for entity in &trigger.business_entities {
            if let Some(name) = select_rule(*entity, trigger) {
                if let Some(template) = self.templates.get(name) {
                    selected.push(template);
                }
            }
        }
        if selected.is_empty() {
            if let Some(generic) = self.templates.get(GENERIC_TEMPLATE) {
                selected.push(generic);
            }
        }
        selected
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Entity-specific classification rules. First match wins.
fn select_rule(entity: BusinessEntity, trigger: &ContactTrigger) -> Option<&'static str> {
    match entity {
        BusinessEntity::The7Space => {
            if trigger.has_any_type(&[ContactType::Artist, ContactType::GalleryContact]) {
                if trigger.lead_source == LeadSource::Event {
                    Some("the7space_artist_discovery")
                } else {
                    Some("the7space_artist_welcome")
                }
            } else if trigger.has_any_type(&[ContactType::WellnessClient]) {
                Some("the7space_wellness_welcome")
            } else {
                Some("the7space_general_welcome")
            }
        }
        BusinessEntity::AmConsulting => {
            if trigger.lead_source == LeadSource::Referral {
                Some("am_consulting_referral_thanks")
            } else if trigger.has_any_type(&[
                ContactType::PotentialClient,
                ContactType::BusinessPartner,
            ]) {
                Some("am_consulting_lead_qualification")
            } else {
                Some("am_consulting_general_inquiry")
            }
        }
        BusinessEntity::HigherselfCore => Some("higherself_community_onboarding"),
    }
}

fn builtin_templates() -> Vec<WorkflowTemplate> {
    vec![
        WorkflowTemplate {
            name: "the7space_artist_welcome".to_string(),
            description: "Welcome sequence for artists and gallery contacts".to_string(),
            entity: Some(BusinessEntity::The7Space),
            actions: vec![
                WorkflowAction::immediate(ActionKind::SendNotification {
                    target: "gallery_curator".to_string(),
                    channel: Default::default(),
                    message: "New artist contact {email} is interested in The 7 Space."
                        .to_string(),
                }),
                WorkflowAction::immediate(ActionKind::CreateTask {
                    assignee: "gallery_curator".to_string(),
                    title: "Review portfolio for {email}".to_string(),
                    notes: "Contact {contact_id} was classified as an artist.".to_string(),
                    due_in_hours: 48,
                }),
                WorkflowAction::delayed(
                    ActionKind::ScheduleFollowUp {
                        target: "contact".to_string(),
                        message: "Invite {email} to the next gallery opening.".to_string(),
                        follow_up_in_hours: 72,
                    },
                    72,
                ),
            ],
        },
        WorkflowTemplate {
            name: "the7space_artist_discovery".to_string(),
            description: "Artists met at events get a faster, warmer touch".to_string(),
            entity: Some(BusinessEntity::The7Space),
            actions: vec![
                WorkflowAction::immediate(ActionKind::SendNotification {
                    target: "gallery_curator".to_string(),
                    channel: Default::default(),
                    message: "Artist {email} met at an event; reach out while it's warm."
                        .to_string(),
                }),
                WorkflowAction::immediate(ActionKind::CreateTask {
                    assignee: "gallery_curator".to_string(),
                    title: "Personal follow-up with {email}".to_string(),
                    notes: String::new(),
                    due_in_hours: 24,
                }),
            ],
        },
        WorkflowTemplate {
            name: "the7space_wellness_welcome".to_string(),
            description: "Wellness client intake".to_string(),
            entity: Some(BusinessEntity::The7Space),
            actions: vec![
                WorkflowAction::immediate(ActionKind::SendNotification {
                    target: "wellness_coordinator".to_string(),
                    channel: Default::default(),
                    message: "New wellness inquiry from {email}.".to_string(),
                }),
                WorkflowAction::immediate(ActionKind::CreateTask {
                    assignee: "wellness_coordinator".to_string(),
                    title: "Schedule intake call with {email}".to_string(),
                    notes: String::new(),
                    due_in_hours: 24,
                }),
            ],
        },
        WorkflowTemplate {
            name: "the7space_general_welcome".to_string(),
            description: "Default welcome for unclassified The 7 Space contacts".to_string(),
            entity: Some(BusinessEntity::The7Space),
            actions: vec![WorkflowAction::immediate(ActionKind::SendNotification {
                target: "community_manager".to_string(),
                channel: Default::default(),
                message: "New contact {email} for The 7 Space.".to_string(),
            })],
        },
        WorkflowTemplate {
            name: "am_consulting_lead_qualification".to_string(),
            description: "Qualify potential consulting clients".to_string(),
            entity: Some(BusinessEntity::AmConsulting),
            actions: vec![
                WorkflowAction::immediate(ActionKind::CreateTask {
                    assignee: "account_manager".to_string(),
                    title: "Qualify lead {email}".to_string(),
                    notes: "Assess fit and budget before the discovery call.".to_string(),
                    due_in_hours: 24,
                }),
                WorkflowAction::immediate(ActionKind::SendNotification {
                    target: "account_manager".to_string(),
                    channel: Default::default(),
                    message: "Hot lead: {email} came in via the website.".to_string(),
                })
                .with_condition(ActionCondition {
                    lead_sources: vec![LeadSource::Website],
                    contact_types: Vec::new(),
                }),
                WorkflowAction::delayed(
                    ActionKind::ScheduleFollowUp {
                        target: "contact".to_string(),
                        message: "Check in with {email} about the proposal.".to_string(),
                        follow_up_in_hours: 96,
                    },
                    96,
                ),
            ],
        },
        WorkflowTemplate {
            name: "am_consulting_referral_thanks".to_string(),
            description: "Referred contacts get a thank-you and fast-tracked outreach"
                .to_string(),
            entity: Some(BusinessEntity::AmConsulting),
            actions: vec![
                WorkflowAction::immediate(ActionKind::SendNotification {
                    target: "contact".to_string(),
                    channel: Default::default(),
                    message: "Thanks for reaching out — a consultant will contact you shortly."
                        .to_string(),
                }),
                WorkflowAction::immediate(ActionKind::CreateTask {
                    assignee: "account_manager".to_string(),
                    title: "Call referred contact {email}".to_string(),
                    notes: String::new(),
                    due_in_hours: 8,
                }),
            ],
        },
        WorkflowTemplate {
            name: "am_consulting_general_inquiry".to_string(),
            description: "Default handling for AM Consulting contacts".to_string(),
            entity: Some(BusinessEntity::AmConsulting),
            actions: vec![WorkflowAction::immediate(ActionKind::CreateTask {
                assignee: "account_manager".to_string(),
                title: "Triage inquiry from {email}".to_string(),
                notes: String::new(),
                due_in_hours: 48,
            })],
        },
        WorkflowTemplate {
            name: "higherself_community_onboarding".to_string(),
            description: "Onboarding sequence for the community platform".to_string(),
            entity: Some(BusinessEntity::HigherselfCore),
            actions: vec![
                WorkflowAction::immediate(ActionKind::SendNotification {
                    target: "contact".to_string(),
                    channel: Default::default(),
                    message: "Welcome to the HigherSelf community!".to_string(),
                }),
                WorkflowAction::delayed(
                    ActionKind::ScheduleFollowUp {
                        target: "community_manager".to_string(),
                        message: "Check whether {email} completed their profile.".to_string(),
                        follow_up_in_hours: 168,
                    },
                    168,
                ),
            ],
        },
        WorkflowTemplate {
            name: GENERIC_TEMPLATE.to_string(),
            description: "Fallback when no entity rule matches".to_string(),
            entity: None,
            actions: vec![WorkflowAction::immediate(ActionKind::SendNotification {
                target: "operations".to_string(),
                channel: Default::default(),
                message: "Unrouted contact {email}; review and assign manually.".to_string(),
            })],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    fn trigger(
        entities: Vec<BusinessEntity>,
        types: Vec<ContactType>,
        source: LeadSource,
    ) -> ContactTrigger {
        ContactTrigger {
            contact_id: "c-1".to_string(),
            email: "x@example.com".to_string(),
            contact_types: types,
            lead_source: source,
            trigger_event: "contact_created".to_string(),
            business_entities: entities,
            metadata: StdHashMap::new(),
        }
    }

    #[test]
    fn test_builtin_templates_are_registered() {
        let catalog = TemplateCatalog::builtin();
        assert!(catalog.get("the7space_artist_welcome").is_some());
        assert!(catalog.get(GENERIC_TEMPLATE).is_some());
        assert_eq!(catalog.for_entity(BusinessEntity::The7Space).len(), 4);
        assert_eq!(catalog.for_entity(BusinessEntity::AmConsulting).len(), 3);
    }

    #[test]
    fn test_artist_selects_welcome() {
        let catalog = TemplateCatalog::builtin();
        let t = trigger(
            vec![BusinessEntity::The7Space],
            vec![ContactType::Artist],
            LeadSource::Website,
        );
        let selected = catalog.select_for(&t);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "the7space_artist_welcome");
    }

    #[test]
    fn test_event_artist_selects_discovery() {
        let catalog = TemplateCatalog::builtin();
        let t = trigger(
            vec![BusinessEntity::The7Space],
            vec![ContactType::Artist],
            LeadSource::Event,
        );
        assert_eq!(catalog.select_for(&t)[0].name, "the7space_artist_discovery");
    }

    #[test]
    fn test_referral_beats_classification_for_consulting() {
        let catalog = TemplateCatalog::builtin();
        let t = trigger(
            vec![BusinessEntity::AmConsulting],
            vec![ContactType::PotentialClient],
            LeadSource::Referral,
        );
        assert_eq!(catalog.select_for(&t)[0].name, "am_consulting_referral_thanks");
    }

    #[test]
    fn test_multi_entity_selects_one_per_entity() {
        let catalog = TemplateCatalog::builtin();
        let t = trigger(
            vec![BusinessEntity::The7Space, BusinessEntity::HigherselfCore],
            vec![ContactType::WellnessClient],
            LeadSource::Website,
        );
        let names: Vec<&str> = catalog.select_for(&t).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["the7space_wellness_welcome", "higherself_community_onboarding"]
        );
    }

    #[test]
    fn test_generic_fallback_when_no_rule_matches() {
        let mut catalog = TemplateCatalog::new();
        catalog.register(WorkflowTemplate {
            name: GENERIC_TEMPLATE.to_string(),
            description: String::new(),
            entity: None,
            actions: vec![],
        });
        // Entity rules point at unregistered templates; fallback kicks in.
        let t = trigger(
            vec![BusinessEntity::The7Space],
            vec![ContactType::Artist],
            LeadSource::Website,
        );
        let selected = catalog.select_for(&t);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, GENERIC_TEMPLATE);
    }
}
