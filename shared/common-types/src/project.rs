use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One entry of a project's visualization history.
///
/// Stored untagged: a plain JSON string or a JSON object of any shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisualizationRequest {
    /// Free-form note, usually the prompt the user typed
    TextNote(String),
    /// Structured record; the keys are not fixed
    StructuredNote(Map<String, Value>),
}

impl From<&str> for VisualizationRequest {
    fn from(note: &str) -> Self {
        Self::TextNote(note.to_string())
    }
}

impl From<String> for VisualizationRequest {
    fn from(note: String) -> Self {
        Self::TextNote(note)
    }
}

/// Row of the `user_projects` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owning user; `None` marks a legacy row that predates accounts
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub visualization_requests: Vec<VisualizationRequest>,
}

/// Project as submitted for creation. The owner comes from the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub visualization_requests: Vec<VisualizationRequest>,
}

/// Partial update of a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization_requests: Option<Vec<VisualizationRequest>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<VisualizationRequest>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<VisualizationRequest>>::deserialize(deserializer)?.unwrap_or_default())
}
