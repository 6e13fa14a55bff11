//! Main configuration structure for Cadence.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration, merged by the loader from defaults, YAML files,
/// and `CADENCE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Notion integration settings.
    #[serde(default)]
    pub notion: NotionConfig,

    /// HTTP connection pool settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Circuit breaker settings.
    #[serde(default)]
    pub circuit: CircuitConfig,

    /// Contact-change monitor settings.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Notification sink settings.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Notion API settings: token and per-entity database ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotionConfig {
    /// Integration token. Usually supplied via `CADENCE_NOTION__API_KEY`.
    #[serde(default)]
    pub api_key: String,

    /// Requests per second allowed against the Notion API.
    #[serde(default = "default_notion_rps")]
    pub requests_per_second: u32,

    /// Database ids shared by all entities unless overridden below.
    #[serde(default)]
    pub databases: EntityDatabases,

    /// Per-entity database id overrides, keyed by entity id
    /// (`the_7_space`, `am_consulting`, `higherself_core`).
    #[serde(default)]
    pub entity_databases: HashMap<String, EntityDatabases>,
}

const fn default_notion_rps() -> u32 {
    3
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            requests_per_second: default_notion_rps(),
            databases: EntityDatabases::default(),
            entity_databases: HashMap::new(),
        }
    }
}

impl NotionConfig {
    /// Resolve the database set for an entity, falling back to the shared set.
    pub fn databases_for(&self, entity: &str) -> &EntityDatabases {
        self.entity_databases.get(entity).unwrap_or(&self.databases)
    }
}

/// The three hosted databases the automation layer writes to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EntityDatabases {
    /// Contact records (read by the monitor).
    #[serde(default)]
    pub contacts_db: String,
    /// Reminder / follow-up tasks.
    #[serde(default)]
    pub tasks_db: String,
    /// Workflow instance mirror and audit log.
    #[serde(default)]
    pub workflow_db: String,
}

/// HTTP connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpConfig {
    /// Maximum retry attempts for retryable failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Status codes that are retried with backoff.
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_statuses: default_retry_statuses(),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CircuitConfig {
    /// Consecutive failures before opening the circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before probing half-open.
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,

    /// Maximum concurrent probe calls while half-open.
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,

    /// Per-call timeout in seconds enforced by the breaker.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Status codes that do not count as breaker failures (client errors
    /// the caller must fix, not service outages).
    #[serde(default = "default_excluded_statuses")]
    pub excluded_statuses: Vec<u16>,
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_recovery_timeout_secs() -> u64 {
    60
}

const fn default_half_open_max_calls() -> u32 {
    1
}

const fn default_call_timeout_secs() -> u64 {
    30
}

fn default_excluded_statuses() -> Vec<u16> {
    vec![400, 401, 403, 404, 409]
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            half_open_max_calls: default_half_open_max_calls(),
            call_timeout_secs: default_call_timeout_secs(),
            excluded_statuses: default_excluded_statuses(),
        }
    }
}

/// Contact-change monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorConfig {
    /// Whether the monitor loop starts with `cadence monitor`.
    #[serde(default = "default_monitor_enabled")]
    pub enabled: bool,

    /// Seconds between polls of the contact database.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

const fn default_monitor_enabled() -> bool {
    true
}

const fn default_poll_interval_secs() -> u64 {
    300
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_monitor_enabled(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Notification sink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationConfig {
    /// Webhook URL notifications are posted to. Empty disables delivery.
    #[serde(default)]
    pub webhook_url: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional directory for daily-rotated log files. Empty logs to stderr
    /// only.
    #[serde(default)]
    pub directory: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: String::new(),
        }
    }
}
