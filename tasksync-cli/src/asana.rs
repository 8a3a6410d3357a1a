//! Asana REST adapter for [`TaskStore`].
//!
//! Workspaces, projects, sections, tasks, and stories map onto the engine's
//! workspaces, collections, sections, items, and comments. Requests are
//! blocking and unretried; list endpoints are paged with `limit=100` and
//! the `next_page.offset` cursor.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use tasksync_core::types::{
    Collection, CollectionId, Comment, CommentKind, FieldMap, Item, ItemId, ItemSummary,
    Membership, Placement, Section, SectionId, SyncField, Workspace, WorkspaceId,
};
use tasksync_sync::{StoreError, TaskStore};

pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0";
const PAGE_LIMIT: &str = "100";
const TIMEOUT: Duration = Duration::from_secs(30);

/// `opt_fields` for a full task read.
const TASK_FIELDS: &str = "name,completed,custom_fields,due_on,due_at,external,hearted,notes,\
                           start_on,memberships.project.gid,memberships.section.name";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    next_page: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    offset: String,
}

#[derive(Debug, Deserialize)]
struct Named {
    gid: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Gid {
    gid: String,
}

#[derive(Debug, Deserialize)]
struct RawMembership {
    project: Option<Gid>,
    section: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Story {
    #[serde(default)]
    text: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// Blocking Asana client. One per run.
pub struct AsanaStore {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl AsanaStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(TIMEOUT).build(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Build from `ASANA_ACCESS_TOKEN` and optional `ASANA_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("ASANA_ACCESS_TOKEN")
            .context("ASANA_ACCESS_TOKEN is not set (or pass --snapshot FILE to work offline)")?;
        let base_url =
            std::env::var("ASANA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(base_url, token))
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        tracing::debug!("{method} {path}");
        self.agent
            .request(method, &format!("{}{}", self.base_url, path))
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/json")
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StoreError> {
        let request = query
            .iter()
            .fold(self.request("GET", path), |req, (k, v)| req.query(k, v));
        let envelope: Envelope<T> = decode(request.call().map_err(store_error)?)?;
        Ok(envelope.data)
    }

    /// Every page of a list endpoint, concatenated.
    fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, StoreError> {
        let mut all = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let mut request = query
                .iter()
                .fold(self.request("GET", path), |req, (k, v)| req.query(k, v))
                .query("limit", PAGE_LIMIT);
            if let Some(offset) = &offset {
                request = request.query("offset", offset);
            }
            let page: Envelope<Vec<T>> = decode(request.call().map_err(store_error)?)?;
            all.extend(page.data);
            match page.next_page {
                Some(next) => offset = Some(next.offset),
                None => return Ok(all),
            }
        }
    }

    fn send(&self, method: &str, path: &str, data: Value) -> Result<Value, StoreError> {
        let response = self
            .request(method, path)
            .send_json(json!({ "data": data }))
            .map_err(store_error)?;
        let envelope: Envelope<Value> = decode(response)?;
        Ok(envelope.data)
    }

    fn stories(&self, task: &ItemId) -> Result<Vec<Comment>, StoreError> {
        let stories: Vec<Story> =
            self.get_all(&format!("/tasks/{task}/stories"), &[("opt_fields", "text,type")])?;
        Ok(stories.into_iter().map(story_to_comment).collect())
    }
}

impl TaskStore for AsanaStore {
    fn list_workspaces(&self) -> Result<Vec<Workspace>, StoreError> {
        let raw: Vec<Named> = self.get_all("/workspaces", &[])?;
        Ok(raw
            .into_iter()
            .map(|w| Workspace {
                id: WorkspaceId::from(w.gid),
                name: w.name,
            })
            .collect())
    }

    fn list_collections(&self, workspace: &WorkspaceId) -> Result<Vec<Collection>, StoreError> {
        let raw: Vec<Named> = self.get_all(
            "/projects",
            &[("workspace", workspace.as_str()), ("opt_fields", "name")],
        )?;
        Ok(raw
            .into_iter()
            .map(|p| Collection {
                id: CollectionId::from(p.gid),
                name: p.name,
                workspace: workspace.clone(),
            })
            .collect())
    }

    fn list_sections(&self, collection: &CollectionId) -> Result<Vec<Section>, StoreError> {
        let raw: Vec<Named> = self.get_all(
            &format!("/projects/{collection}/sections"),
            &[("opt_fields", "name")],
        )?;
        Ok(raw
            .into_iter()
            .map(|s| Section {
                id: SectionId::from(s.gid),
                name: s.name,
            })
            .collect())
    }

    fn list_items(&self, collection: &CollectionId) -> Result<Vec<ItemSummary>, StoreError> {
        let raw: Vec<Named> = self.get_all(
            &format!("/projects/{collection}/tasks"),
            &[("opt_fields", "name")],
        )?;
        Ok(raw
            .into_iter()
            .map(|t| ItemSummary {
                id: ItemId::from(t.gid),
                name: t.name,
            })
            .collect())
    }

    fn get_item(&self, item: &ItemId) -> Result<Item, StoreError> {
        let task: Map<String, Value> =
            self.get(&format!("/tasks/{item}"), &[("opt_fields", TASK_FIELDS)])?;
        let mut item = task_to_item(item.clone(), task)?;
        item.comments = self.stories(&item.id)?;
        Ok(item)
    }

    fn create_item(
        &mut self,
        collection: &CollectionId,
        fields: &FieldMap,
        placements: &[Placement],
    ) -> Result<Item, StoreError> {
        let mut data = fields_to_body(fields);
        data.insert("projects".to_string(), json!([collection.as_str()]));
        data.insert(
            "memberships".to_string(),
            placements
                .iter()
                .map(|p| json!({ "project": p.collection.as_str(), "section": p.section.as_str() }))
                .collect(),
        );
        let created = self.send("POST", "/tasks", Value::Object(data))?;
        let task = match created {
            Value::Object(map) => map,
            other => return Err(StoreError::Decode(format!("expected task object, got {other}"))),
        };
        let gid = task
            .get("gid")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode("created task has no gid".to_string()))?
            .to_string();
        task_to_item(ItemId::from(gid), task)
    }

    fn update_item(&mut self, item: &ItemId, fields: &FieldMap) -> Result<(), StoreError> {
        self.send(
            "PUT",
            &format!("/tasks/{item}"),
            Value::Object(fields_to_body(fields)),
        )?;
        Ok(())
    }

    fn add_membership(&mut self, item: &ItemId, placement: &Placement) -> Result<(), StoreError> {
        self.send(
            "POST",
            &format!("/tasks/{item}/addProject"),
            json!({
                "project": placement.collection.as_str(),
                "section": placement.section.as_str(),
            }),
        )?;
        Ok(())
    }

    fn add_comment(&mut self, item: &ItemId, text: &str) -> Result<(), StoreError> {
        self.send("POST", &format!("/tasks/{item}/stories"), json!({ "text": text }))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire conversions
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(response: ureq::Response) -> Result<T, StoreError> {
    response
        .into_json()
        .map_err(|e| StoreError::Decode(e.to_string()))
}

fn store_error(err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(status, response) => StoreError::Api {
            status,
            message: api_message(&response.into_string().unwrap_or_default()),
        },
        ureq::Error::Transport(transport) => StoreError::Transport(transport.to_string()),
    }
}

/// First `errors[].message` of an Asana error body, else the raw body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/errors/0/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn task_to_item(id: ItemId, mut task: Map<String, Value>) -> Result<Item, StoreError> {
    let name = task
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let memberships: Vec<RawMembership> = match task.remove("memberships") {
        Some(raw) => serde_json::from_value(raw).map_err(|e| StoreError::Decode(e.to_string()))?,
        None => Vec::new(),
    };

    let fields = SyncField::ALL
        .iter()
        .filter(|field| **field != SyncField::Name)
        .filter_map(|field| {
            task.remove(field.key())
                .map(|value| (field.key().to_string(), value))
        })
        .collect();

    Ok(Item {
        id,
        name,
        fields,
        // Memberships without a section (or project) cannot be translated.
        memberships: memberships
            .into_iter()
            .filter_map(|m| match (m.project, m.section) {
                (Some(project), Some(section)) => Some(Membership {
                    collection: CollectionId::from(project.gid),
                    section: SectionId::from(section.gid),
                    section_name: section.name,
                }),
                _ => None,
            })
            .collect(),
        comments: Vec::new(),
    })
}

fn story_to_comment(story: Story) -> Comment {
    Comment {
        text: story.text,
        kind: if story.kind == "system" {
            CommentKind::System
        } else {
            CommentKind::Human
        },
    }
}

/// Write body for a task. `custom_fields` arrives as the read shape (an
/// array of field objects) and is sent as the write shape (`gid → value`).
fn fields_to_body(fields: &FieldMap) -> Map<String, Value> {
    fields
        .iter()
        .map(|(field, value)| {
            let value = match field {
                SyncField::CustomFields => custom_fields_for_write(value),
                _ => value.clone(),
            };
            (field.key().to_string(), value)
        })
        .collect()
}

fn custom_fields_for_write(value: &Value) -> Value {
    let Some(entries) = value.as_array() else {
        return value.clone();
    };
    let mut out = Map::new();
    for entry in entries {
        let Some(gid) = entry.get("gid").and_then(Value::as_str) else {
            continue;
        };
        let written = if let Some(option) = entry.pointer("/enum_value/gid") {
            option.clone()
        } else if let Some(options) = entry.get("multi_enum_values").and_then(Value::as_array) {
            options.iter().filter_map(|o| o.get("gid").cloned()).collect()
        } else if let Some(date) = entry.get("date_value").filter(|v| !v.is_null()) {
            date.clone()
        } else {
            match (entry.get("number_value"), entry.get("text_value")) {
                (Some(n), _) if !n.is_null() => n.clone(),
                (_, Some(t)) if !t.is_null() => t.clone(),
                _ => Value::Null,
            }
        };
        out.insert(gid.to_string(), written);
    }
    Value::Object(out)
}
