//! Notion adapter: API client, property mapping, and port implementations.

pub mod client;
pub mod props;
pub mod store;

pub use client::{NotionClient, NOTION_BASE_URL};
pub use store::NotionWorkflowStore;
