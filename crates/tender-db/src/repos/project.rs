//! Project repository.

use chrono::Utc;
use tender_core::entities::Project;
use tender_core::enums::{AuditAction, EntityType};
use tender_core::ids::PREFIX_PROJECT;

use crate::error::DatabaseError;
use crate::helpers::{generate_id, get_opt_string, parse_datetime};
use crate::repos::audit::append_audit;
use crate::service::TenderService;

const SELECT_COLS: &str = "id, name, description, created_at, updated_at";

fn row_to_project(row: &libsql::Row) -> Result<Project, DatabaseError> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: get_opt_string(row, 2)?,
        created_at: parse_datetime(&row.get::<String>(3)?)?,
        updated_at: parse_datetime(&row.get::<String>(4)?)?,
    })
}

pub(crate) async fn fetch_project(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<Project>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM projects WHERE id = ?1"),
            [id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_project(&row)?)),
        None => Ok(None),
    }
}

impl TenderService {
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for an empty name.
    pub async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project, DatabaseError> {
        if name.trim().is_empty() {
            return Err(DatabaseError::Validation("project name must not be empty".into()));
        }
        let wtx = self.begin().await?;
        let result: Result<Project, DatabaseError> = async {
            let now = Utc::now();
            let project = Project {
                id: generate_id(&wtx.tx, PREFIX_PROJECT).await?,
                name: name.to_string(),
                description: description.map(String::from),
                created_at: now,
                updated_at: now,
            };
            wtx.tx
                .execute(
                    "INSERT INTO projects (id, name, description, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    libsql::params![
                        project.id.as_str(),
                        project.name.as_str(),
                        project.description.as_deref(),
                        now.to_rfc3339(),
                        now.to_rfc3339()
                    ],
                )
                .await?;
            append_audit(&wtx.tx, EntityType::Project, &project.id, AuditAction::Created, None)
                .await?;
            Ok(project)
        }
        .await;
        wtx.finish("create_project", result).await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown id.
    pub async fn get_project(&self, id: &str) -> Result<Project, DatabaseError> {
        fetch_project(self.db().conn(), id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("project", id))
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_projects(&self, limit: u32) -> Result<Vec<Project>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM projects ORDER BY created_at DESC, rowid DESC LIMIT ?1"),
                [limit],
            )
            .await?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next().await? {
            projects.push(row_to_project(&row)?);
        }
        Ok(projects)
    }
}
