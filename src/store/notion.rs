use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{JobStore, StoreError};
use crate::config::{FieldMapping, NotionCredentials};
use crate::models::{JobCandidate, PersistedRecord};

const NOTION_API: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Tracking store backed by a Notion database
pub struct NotionStore {
    client: Client,
    creds: NotionCredentials,
    fields: FieldMapping,
    api_base: String,
}

impl NotionStore {
    pub fn new(creds: NotionCredentials, fields: FieldMapping) -> Result<Self> {
        Self::with_api_base(creds, fields, NOTION_API)
    }

    fn with_api_base(creds: NotionCredentials, fields: FieldMapping, api_base: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            creds,
            fields,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, StoreError> {
        let url = format!("{}{}", self.api_base, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.creds.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl JobStore for NotionStore {
    async fn find(&self, title: &str, company: &str) -> Result<Vec<PersistedRecord>, StoreError> {
        let path = format!("/databases/{}/query", self.creds.database_id);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = query_body(&self.fields, title, company, cursor.as_deref());
            let response = self.post(&path, &body).await?;

            if let Some(results) = response.get("results").and_then(Value::as_array) {
                records.extend(results.iter().map(|page| record_from_page(&self.fields, page)));
            }

            cursor = match response.get("has_more").and_then(Value::as_bool) {
                Some(true) => response
                    .get("next_cursor")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            };
            if cursor.is_none() {
                break;
            }
        }

        debug!("Notion returned {} records for '{}' at '{}'", records.len(), title, company);
        Ok(records)
    }

    async fn insert(&self, job: &JobCandidate) -> Result<(), StoreError> {
        let body = json!({
            "parent": { "database_id": self.creds.database_id },
            "properties": page_properties(&self.fields, job, Utc::now().date_naive()),
        });
        self.post("/pages", &body).await.map_err(|e| {
            warn!("❌ Error creating Notion page for '{}' at '{}': {}", job.title, job.company, e);
            e
        })?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "notion"
    }
}

/// Database query filtering on exact title AND exact company.
fn query_body(fields: &FieldMapping, title: &str, company: &str, cursor: Option<&str>) -> Value {
    let mut body = json!({
        "filter": {
            "and": [
                { "property": fields.title, "title": { "equals": title } },
                { "property": fields.company, "rich_text": { "equals": company } }
            ]
        },
        "page_size": 100
    });
    if let Some(cursor) = cursor {
        body["start_cursor"] = json!(cursor);
    }
    body
}

fn rich_text(content: &str) -> Value {
    json!([{ "text": { "content": content } }])
}

/// Page properties for a new record. An empty URL is sent as `null`.
fn page_properties(fields: &FieldMapping, job: &JobCandidate, today: NaiveDate) -> Value {
    let url = if job.url.is_empty() {
        Value::Null
    } else {
        json!(job.url)
    };

    let mut props = serde_json::Map::new();
    props.insert(fields.title.clone(), json!({ "title": rich_text(&job.title) }));
    props.insert(fields.company.clone(), json!({ "rich_text": rich_text(&job.company) }));
    props.insert(fields.location.clone(), json!({ "rich_text": rich_text(&job.location) }));
    props.insert(fields.url.clone(), json!({ "url": url }));
    if let Some(date_field) = &fields.date_added {
        props.insert(
            date_field.clone(),
            json!({ "date": { "start": today.format("%Y-%m-%d").to_string() } }),
        );
    }
    Value::Object(props)
}

fn plain_text(property: Option<&Value>, kind: &str) -> String {
    property
        .and_then(|p| p.get(kind))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn record_from_page(fields: &FieldMapping, page: &Value) -> PersistedRecord {
    let props = page.get("properties");
    let prop = |name: &str| props.and_then(|p| p.get(name));

    PersistedRecord {
        title: plain_text(prop(&fields.title), "title"),
        company: plain_text(prop(&fields.company), "rich_text"),
        location: plain_text(prop(&fields.location), "rich_text"),
        url: prop(&fields.url)
            .and_then(|p| p.get("url"))
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        added_at: None,
    }
}
