//! Multi-entity automation: per-entity metrics and workflow recommendation.
//!
//! Wraps [`ContactWorkflowAutomation`] and attributes every processed
//! trigger to the business entities it touched, keeping running success and
//! latency counters per entity. Entities never share counters or templates.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AutomationRunSummary, BusinessEntity, ContactTrigger, EntityMetrics, TemplateRun,
};

use super::contact_automation::ContactWorkflowAutomation;

/// Automation wrapper that tracks one [`EntityMetrics`] per business entity.
pub struct MultiEntityWorkflowAutomation {
    automation: Arc<ContactWorkflowAutomation>,
    metrics: RwLock<HashMap<BusinessEntity, EntityMetrics>>,
}

impl MultiEntityWorkflowAutomation {
    pub fn new(automation: Arc<ContactWorkflowAutomation>) -> Self {
        Self {
            automation,
            metrics: RwLock::new(HashMap::new()),
        }
    }

    pub fn automation(&self) -> &Arc<ContactWorkflowAutomation> {
        &self.automation
    }

    /// Process a trigger and record metrics for every entity it touched.
    pub async fn process(&self, trigger: &ContactTrigger) -> DomainResult<AutomationRunSummary> {
        let started = Instant::now();
        let summary = self.automation.process_trigger(trigger).await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let mut metrics = self.metrics.write().await;
        for run in &summary.runs {
            // Cross-entity templates (no entity) are attributed to every
            // entity on the trigger.
            let entities: Vec<BusinessEntity> = match run.entity {
                Some(entity) => vec![entity],
                None => trigger.business_entities.clone(),
            };
            for entity in entities {
                metrics
                    .entry(entity)
                    .or_default()
                    .record(TemplateRun::succeeded(run), duration_ms);
            }
        }
        Ok(summary)
    }

    /// Metrics snapshot for one entity.
    pub async fn metrics_for(&self, entity: BusinessEntity) -> EntityMetrics {
        self.metrics
            .read()
            .await
            .get(&entity)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of all entity metrics.
    pub async fn metrics(&self) -> HashMap<BusinessEntity, EntityMetrics> {
        self.metrics.read().await.clone()
    }

    /// Recommend the entity's template whose name and description best
    /// match the free-text need. Scoring is plain keyword overlap; ties go
    /// to the lexicographically first template, no match returns `None`.
    pub fn recommend(&self, entity: BusinessEntity, need: &str) -> Option<String> {
        let keywords: Vec<String> = need
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| w.len() > 2)
            .collect();
        if keywords.is_empty() {
            return None;
        }

        let mut best: Option<(usize, String)> = None;
        for template in self.automation.catalog().for_entity(entity) {
            let haystack =
                format!("{} {}", template.name, template.description).to_lowercase();
            let score = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
            if score > 0 && best.as_ref().is_none_or(|(s, _)| score > *s) {
                best = Some((score, template.name.clone()));
            }
        }
        best.map(|(_, name)| name)
    }
}
