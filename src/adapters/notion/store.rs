//! Notion-backed implementations of the domain ports.
//!
//! Workflow instances and automation run summaries land in the workflow
//! database, reminder tasks in the per-entity tasks database, and the
//! monitor reads contact changes from the contacts database. Complex fields
//! (instance data, history, run summaries) are stored as JSON in rich-text
//! properties; scalar fields get native Notion property types so the
//! databases stay filterable by humans.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AutomationRunSummary, BusinessEntity, ContactRecord, ContactType, LeadSource, NotionConfig,
    ReminderTask, WorkflowInstance,
};
use crate::domain::ports::{ContactSource, InstanceStore, TaskSink};

use super::client::NotionClient;
use super::props;

/// Notion adapter implementing the store-side ports.
#[derive(Debug)]
pub struct NotionWorkflowStore {
    client: Arc<NotionClient>,
    config: NotionConfig,
}

impl NotionWorkflowStore {
    pub fn new(client: Arc<NotionClient>, config: NotionConfig) -> Self {
        Self { client, config }
    }

    fn instance_properties(instance: &WorkflowInstance) -> DomainResult<Value> {
        let data_json = serde_json::to_string(&instance.data)?;
        let history_json = serde_json::to_string(&instance.history)?;
        Ok(json!({
            "Name": props::title(&format!("{} {}", instance.definition_name, instance.id)),
            "Instance ID": props::rich_text(&instance.id.to_string()),
            "Workflow": props::select(&instance.definition_name),
            "State": props::select(&instance.current_state),
            "Data": props::rich_text(&data_json),
            "History": props::rich_text(&history_json),
            "Created": props::date(instance.created_at),
            "Updated": props::date(instance.updated_at),
        }))
    }

    fn instance_from_page(page: &Value) -> DomainResult<WorkflowInstance> {
        let id_text = props::rich_text_text(page, "Instance ID");
        let id = Uuid::parse_str(&id_text).map_err(|_| {
            DomainError::SerializationError(format!("bad instance id in mirror: '{id_text}'"))
        })?;

        let data_json = props::rich_text_text(page, "Data");
        let history_json = props::rich_text_text(page, "History");

        Ok(WorkflowInstance {
            id,
            definition_name: props::select_name(page, "Workflow").unwrap_or_default(),
            current_state: props::select_name(page, "State").unwrap_or_default(),
            data: if data_json.is_empty() {
                Default::default()
            } else {
                serde_json::from_str(&data_json)?
            },
            history: if history_json.is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&history_json)?
            },
            created_at: props::date_value(page, "Created").unwrap_or_else(Utc::now),
            updated_at: props::date_value(page, "Updated").unwrap_or_else(Utc::now),
        })
    }

    fn instance_filter(id: Uuid) -> Value {
        json!({
            "property": "Instance ID",
            "rich_text": { "equals": id.to_string() }
        })
    }

    /// Find the mirror page for an instance, if one exists. Notion queries
    /// exclude archived pages, so archived mirrors are invisible here.
    async fn find_instance_page(&self, id: Uuid) -> DomainResult<Option<Value>> {
        let page = self
            .client
            .find_page(&self.config.databases.workflow_db, Self::instance_filter(id))
            .await?;
        Ok(page)
    }

    fn contact_from_page(page: &Value) -> Option<ContactRecord> {
        let id = page["id"].as_str()?.to_string();
        let email = props::email_value(page, "Email")
            .filter(|e| !e.is_empty())?;

        let contact_types: Vec<ContactType> = props::multi_select_names(page, "Contact Types")
            .iter()
            .filter_map(|n| ContactType::parse(n))
            .collect();
        let business_entities: Vec<BusinessEntity> =
            props::multi_select_names(page, "Business Entities")
                .iter()
                .filter_map(|n| BusinessEntity::parse(n))
                .collect();
        let lead_source = props::select_name(page, "Lead Source")
            .and_then(|n| LeadSource::parse(&n))
            .unwrap_or(LeadSource::Manual);

        Some(ContactRecord {
            id,
            email,
            contact_types,
            lead_source,
            business_entities,
            last_edited: props::last_edited(page).unwrap_or_else(Utc::now),
        })
    }
}

#[async_trait]
impl InstanceStore for NotionWorkflowStore {
    async fn save_instance(&self, instance: &WorkflowInstance) -> DomainResult<()> {
        let properties = Self::instance_properties(instance)?;
        match self.find_instance_page(instance.id).await? {
            Some(page) => {
                let page_id = page["id"].as_str().unwrap_or_default();
                self.client.update_page(page_id, properties).await?;
            }
            None => {
                self.client
                    .create_page(&self.config.databases.workflow_db, properties)
                    .await?;
            }
        }
        Ok(())
    }

    async fn load_instance(&self, id: Uuid) -> DomainResult<Option<WorkflowInstance>> {
        match self.find_instance_page(id).await? {
            Some(page) => Ok(Some(Self::instance_from_page(&page)?)),
            None => Ok(None),
        }
    }

    async fn archive_instance(&self, id: Uuid) -> DomainResult<()> {
        if let Some(page) = self.find_instance_page(id).await? {
            let page_id = page["id"].as_str().unwrap_or_default();
            self.client.archive_page(page_id).await?;
        }
        Ok(())
    }

    async fn record_run(&self, summary: &AutomationRunSummary) -> DomainResult<()> {
        let summary_json = serde_json::to_string(summary)?;
        let properties = json!({
            "Name": props::title(&format!(
                "run {} {}",
                summary.trigger.trigger_event, summary.trigger.email
            )),
            "Workflow": props::select("automation_run"),
            "Data": props::rich_text(&summary_json),
            "Created": props::date(summary.finished_at),
        });
        self.client
            .create_page(&self.config.databases.workflow_db, properties)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TaskSink for NotionWorkflowStore {
    async fn create_task(&self, task: &ReminderTask) -> DomainResult<String> {
        let entity_key = task.entity.map(|e| e.as_str().to_string()).unwrap_or_default();
        let tasks_db = &self.config.databases_for(&entity_key).tasks_db;

        let mut properties = json!({
            "Name": props::title(&task.title),
            "Notes": props::rich_text(&task.notes),
            "Assignee": props::rich_text(&task.assignee),
            "Due": props::date(task.due_at),
            "Contact ID": props::rich_text(&task.contact_id),
        });
        if let Some(entity) = task.entity {
            properties["Entity"] = props::select(entity.as_str());
        }

        let page_id = self.client.create_page(tasks_db, properties).await?;
        Ok(page_id)
    }
}

#[async_trait]
impl ContactSource for NotionWorkflowStore {
    async fn changed_since(&self, since: DateTime<Utc>) -> DomainResult<Vec<ContactRecord>> {
        let filter = json!({
            "timestamp": "last_edited_time",
            "last_edited_time": { "after": since.to_rfc3339() }
        });
        let sorts = json!([
            { "timestamp": "last_edited_time", "direction": "ascending" }
        ]);

        let pages = self
            .client
            .query_database(&self.config.databases.contacts_db, Some(filter), Some(sorts))
            .await?;

        // Pages without an email cannot enter the pipeline; skip them.
        let contacts: Vec<ContactRecord> =
            pages.iter().filter_map(Self::contact_from_page).collect();
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CircuitConfig, EntityDatabases, HttpConfig, WorkflowDefinition};
    use crate::infrastructure::http::ApiConnectionPool;
    use reqwest::header::HeaderMap;
    use std::collections::HashMap;

    fn store_for(server: &mockito::Server) -> NotionWorkflowStore {
        let pool = Arc::new(
            ApiConnectionPool::new(
                "notion",
                server.url(),
                HeaderMap::new(),
                HttpConfig {
                    max_retries: 0,
                    ..HttpConfig::default()
                },
                &CircuitConfig::default(),
            )
            .unwrap(),
        );
        let client = Arc::new(NotionClient::with_pool(pool, 100));
        let config = NotionConfig {
            databases: EntityDatabases {
                contacts_db: "contacts-db".to_string(),
                tasks_db: "tasks-db".to_string(),
                workflow_db: "workflow-db".to_string(),
            },
            ..NotionConfig::default()
        };
        NotionWorkflowStore::new(client, config)
    }

    fn instance() -> WorkflowInstance {
        let def = WorkflowDefinition {
            name: "lead_followup".to_string(),
            description: String::new(),
            states: vec!["created".to_string(), "done".to_string()],
            initial_state: "created".to_string(),
            transitions: HashMap::from([("created".to_string(), vec!["done".to_string()])]),
        };
        WorkflowInstance::new(&def, HashMap::new())
    }

    #[test]
    fn test_instance_page_roundtrip() {
        let mut inst = instance();
        inst.apply_transition(
            "done",
            "finished",
            "system",
            HashMap::from([("note".to_string(), json!("ok"))]),
        );

        let properties = NotionWorkflowStore::instance_properties(&inst).unwrap();
        let page = json!({ "id": "page-1", "properties": properties });
        let back = NotionWorkflowStore::instance_from_page(&page).unwrap();

        assert_eq!(back.id, inst.id);
        assert_eq!(back.definition_name, "lead_followup");
        assert_eq!(back.current_state, "done");
        assert_eq!(back.history.len(), 1);
        assert_eq!(back.data.get("note"), Some(&json!("ok")));
    }

    #[test]
    fn test_instance_from_page_rejects_bad_id() {
        let page = json!({
            "id": "page-1",
            "properties": { "Instance ID": { "rich_text": [{ "text": { "content": "nope" } }] } }
        });
        assert!(matches!(
            NotionWorkflowStore::instance_from_page(&page),
            Err(DomainError::SerializationError(_))
        ));
    }

    #[tokio::test]
    async fn test_save_instance_creates_when_absent() {
        let mut server = mockito::Server::new_async().await;
        let query = server
            .mock("POST", "/databases/workflow-db/query")
            .with_status(200)
            .with_body(r#"{"results":[],"has_more":false}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/pages")
            .with_status(200)
            .with_body(r#"{"id":"page-new"}"#)
            .create_async()
            .await;

        let store = store_for(&server);
        store.save_instance(&instance()).await.unwrap();
        query.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_save_instance_updates_when_present() {
        let mut server = mockito::Server::new_async().await;
        let inst = instance();
        let existing = json!({
            "results": [{ "id": "page-7", "properties": {} }],
            "has_more": false
        });
        let query = server
            .mock("POST", "/databases/workflow-db/query")
            .with_status(200)
            .with_body(existing.to_string())
            .create_async()
            .await;
        let update = server
            .mock("PATCH", "/pages/page-7")
            .with_status(200)
            .with_body(r#"{"id":"page-7"}"#)
            .create_async()
            .await;

        let store = store_for(&server);
        store.save_instance(&inst).await.unwrap();
        query.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_task_routes_to_entity_tasks_db() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/pages")
            .match_body(mockito::Matcher::PartialJson(json!({
                "parent": { "database_id": "tasks-db" }
            })))
            .with_status(200)
            .with_body(r#"{"id":"task-1"}"#)
            .create_async()
            .await;

        let store = store_for(&server);
        let id = store
            .create_task(&ReminderTask {
                title: "Follow up".to_string(),
                notes: String::new(),
                assignee: "curator".to_string(),
                due_at: Utc::now(),
                entity: Some(BusinessEntity::The7Space),
                contact_id: "c-1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(id, "task-1");
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_changed_since_maps_and_skips_pages_without_email() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "results": [
                {
                    "id": "contact-1",
                    "last_edited_time": "2026-08-30T10:00:00.000Z",
                    "properties": {
                        "Email": { "email": "artist@example.com" },
                        "Contact Types": { "multi_select": [{ "name": "Artist" }] },
                        "Lead Source": { "select": { "name": "website" } },
                        "Business Entities": { "multi_select": [{ "name": "the_7_space" }] }
                    }
                },
                { "id": "contact-2", "properties": {} }
            ],
            "has_more": false
        });
        let _query = server
            .mock("POST", "/databases/contacts-db/query")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let store = store_for(&server);
        let contacts = store
            .changed_since(Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, "contact-1");
        assert_eq!(contacts[0].contact_types, vec![ContactType::Artist]);
        assert_eq!(contacts[0].business_entities, vec![BusinessEntity::The7Space]);
    }
}
