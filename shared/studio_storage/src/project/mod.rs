//! Project store: each user's own design projects

use std::sync::Arc;

use common_types::{NewProject, ProjectPatch, UserProject, VisualizationRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::auth::AuthClient;
use crate::error::{StoreError, StoreResult};
use crate::rest::{Connection, Filter, Query};
use crate::rows::{parse_row, parse_rows_lenient};

/// Table holding user projects
pub const PROJECTS_TABLE: &str = "user_projects";

mod column {
    pub const ID: &str = "id";
    pub const USER_ID: &str = "user_id";
    pub const UPDATED_AT: &str = "updated_at";
}

/// Project as it was kept in browser local storage before accounts existed
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalProject {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    visualization_requests: Vec<VisualizationRequest>,
}

impl From<LocalProject> for NewProject {
    fn from(local: LocalProject) -> Self {
        Self {
            name: local.name,
            description: Some(local.description.unwrap_or_default()),
            thumbnail: local.thumbnail,
            visualization_requests: local.visualization_requests,
        }
    }
}

/// Storage client for the signed-in user's projects
pub struct ProjectStore {
    connection: Option<Connection>,
    auth: Arc<AuthClient>,
}

/// Connection plus the caller's identity, for operations that need both
struct Caller<'a> {
    connection: &'a Connection,
    user_id: String,
    access_token: String,
}

impl Caller<'_> {
    fn owned_filters(&self, id: &str) -> [Filter; 2] {
        [
            Filter::eq(column::ID, id),
            Filter::eq(column::USER_ID, self.user_id.as_str()),
        ]
    }
}

impl ProjectStore {
    /// Creates a new store; `None` runs unconfigured
    #[must_use]
    pub const fn new(connection: Option<Connection>, auth: Arc<AuthClient>) -> Self {
        Self { connection, auth }
    }

    fn caller(&self) -> StoreResult<Caller<'_>> {
        let connection = self.connection.as_ref().ok_or_else(StoreError::not_configured)?;
        let session = self
            .auth
            .current_session()
            .ok_or(StoreError::Unauthenticated)?;
        Ok(Caller {
            connection,
            user_id: session.user.id,
            access_token: session.access_token,
        })
    }

    /// The signed-in user's projects, most recently updated first.
    ///
    /// Empty when signed out or unconfigured. Projects without an owner never
    /// appear here.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` when the service fails
    #[instrument(skip(self))]
    pub async fn list_mine(&self) -> StoreResult<Vec<UserProject>> {
        let caller = match self.caller() {
            Ok(caller) => caller,
            Err(e) => {
                debug!("not listing projects: {e}");
                return Ok(Vec::new());
            }
        };

        let rows = caller
            .connection
            .tables
            .select(
                PROJECTS_TABLE,
                &Query::new()
                    .filter_eq(column::USER_ID, caller.user_id.as_str())
                    .order_desc(column::UPDATED_AT),
                Some(caller.access_token.as_str()),
            )
            .await?;

        Ok(parse_rows_lenient(PROJECTS_TABLE, rows))
    }

    /// Looks up one project by id.
    ///
    /// `Ok(None)` means the project does not exist (or belongs to someone
    /// else); it is not an error. Ownerless legacy projects are returned.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` when the service fails and
    /// `StoreError::Serialization` when the row is malformed
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<UserProject>> {
        let Some(connection) = &self.connection else {
            debug!("project backend not configured");
            return Ok(None);
        };
        let session = self.auth.current_session();
        let bearer = session.as_ref().map(|s| s.access_token.as_str());

        let rows = connection
            .tables
            .select(
                PROJECTS_TABLE,
                &Query::new().filter_eq(column::ID, id).limit(1),
                bearer,
            )
            .await?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let project: UserProject = parse_row(row)?;

        let caller_id = session.as_ref().map(|s| s.user.id.as_str());
        match (project.user_id.as_deref(), caller_id) {
            (Some(owner), Some(caller)) if owner != caller => {
                debug!("project {id} belongs to another user");
                Ok(None)
            }
            _ => Ok(Some(project)),
        }
    }

    /// Creates a project owned by the signed-in user
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` when unconfigured,
    /// `StoreError::Unauthenticated` when signed out, otherwise
    /// `StoreError::Backend`
    #[instrument(skip(self, project), fields(name = %project.name))]
    pub async fn create(&self, project: NewProject) -> StoreResult<UserProject> {
        let caller = self.caller()?;

        let mut row = serde_json::to_value(&project)?;
        if let Value::Object(fields) = &mut row {
            fields.insert(column::USER_ID.to_string(), json!(caller.user_id));
        }

        let row = caller
            .connection
            .tables
            .insert(PROJECTS_TABLE, row, Some(caller.access_token.as_str()))
            .await?;
        let created: UserProject = parse_row(row)?;

        info!("created project {}", created.id);
        Ok(created)
    }

    /// Applies a partial update to one of the caller's projects.
    /// Ownerless legacy projects never match and report `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` when the caller owns no project `id`,
    /// `StoreError::Unauthenticated` when signed out, otherwise
    /// `StoreError::Backend`
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: ProjectPatch) -> StoreResult<UserProject> {
        let caller = self.caller()?;

        let rows = caller
            .connection
            .tables
            .update(
                PROJECTS_TABLE,
                &caller.owned_filters(id),
                serde_json::to_value(&patch)?,
                Some(caller.access_token.as_str()),
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("project {id}")))?;
        parse_row(row)
    }

    /// Appends one request to a project's visualization history.
    ///
    /// Ownerless legacy projects are readable but not writable, so they are
    /// refused before any write is attempted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` when the project is absent,
    /// `StoreError::Validation` for an ownerless legacy project, otherwise
    /// the errors of [`Self::update`]
    #[instrument(skip(self, request))]
    pub async fn append_visualization_request(
        &self,
        id: &str,
        request: VisualizationRequest,
    ) -> StoreResult<UserProject> {
        let mut project = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("project {id}")))?;
        if project.user_id.is_none() {
            return Err(StoreError::Validation(format!(
                "project {id} has no owner and is read-only"
            )));
        }
        project.visualization_requests.push(request);

        self.update(
            id,
            ProjectPatch {
                visualization_requests: Some(project.visualization_requests),
                ..ProjectPatch::default()
            },
        )
        .await
    }

    /// Deletes one of the caller's projects. A missing id succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unauthenticated` when signed out, otherwise
    /// `StoreError::Backend`
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let caller = self.caller()?;

        caller
            .connection
            .tables
            .delete(
                PROJECTS_TABLE,
                &caller.owned_filters(id),
                Some(caller.access_token.as_str()),
            )
            .await?;

        info!("deleted project {id}");
        Ok(())
    }

    /// Copies projects kept in browser local storage into the caller's account.
    ///
    /// Best effort: each record is migrated on its own, and one that cannot be
    /// read or is rejected is logged and skipped. Returns the projects created.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn migrate_from_local_storage(&self, records: Vec<Value>) -> Vec<UserProject> {
        if let Err(e) = self.caller() {
            warn!("cannot migrate local projects: {e}");
            return Vec::new();
        }

        let total = records.len();
        let mut migrated = Vec::with_capacity(total);
        for (index, record) in records.into_iter().enumerate() {
            let local: LocalProject = match serde_json::from_value(record) {
                Ok(local) => local,
                Err(e) => {
                    warn!("skipping local project #{index}: unreadable record: {e}");
                    continue;
                }
            };

            match self.create(local.into()).await {
                Ok(project) => migrated.push(project),
                Err(e) => warn!("skipping local project #{index}: {e}"),
            }
        }

        info!("migrated {} of {total} local projects", migrated.len());
        migrated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_local_project_mapping_defaults() {
        let local: LocalProject = serde_json::from_value(json!({ "name": "Den" })).unwrap();
        let project = NewProject::from(local);

        assert_eq!(project.name, "Den");
        assert_eq!(project.description, Some(String::new()));
        assert_eq!(project.thumbnail, None);
        assert!(project.visualization_requests.is_empty());
    }

    #[test]
    fn test_local_project_reads_camel_case_fields() {
        let local: LocalProject = serde_json::from_value(json!({
            "id": "local-1",
            "name": "Nursery",
            "description": "Soft greens",
            "thumbnail": "data:image/png;base64,AAAA",
            "createdAt": "2023-11-02T10:00:00.000Z",
            "visualizationRequests": ["pastel walls", { "prompt": "crib by the window" }]
        }))
        .unwrap();
        let project = NewProject::from(local);

        assert_eq!(project.description.as_deref(), Some("Soft greens"));
        assert_eq!(project.visualization_requests.len(), 2);
    }
}
