use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use foodx_models::{Project, ProjectPriority, ProjectStatus, Rfq};

use crate::entity::{Entity, ForeignKey, OnDelete};
use crate::value::Value;

impl Entity for Project {
    const TABLE: &'static str = "projects";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "project_number",
        "title",
        "description",
        "status",
        "priority",
        "start_date",
        "expected_end_date",
        "actual_end_date",
        "assigned_to",
        "notes",
        "rfq_id",
        "created_by",
        "created_at",
        "updated_by",
        "updated_at",
    ];
    // rfq_id is not unique: several projects may reference one RFQ.
    const UNIQUE: &'static [&'static str] = &["project_number"];
    const FOREIGN_KEYS: &'static [ForeignKey] =
        &[ForeignKey::new("rfq_id", Rfq::TABLE, OnDelete::Cascade)];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            (&self.project_number).into(),
            (&self.title).into(),
            (&self.description).into(),
            self.status.as_str().into(),
            self.priority.as_str().into(),
            self.start_date.into(),
            self.expected_end_date.into(),
            self.actual_end_date.into(),
            (&self.assigned_to).into(),
            (&self.notes).into(),
            self.rfq_id.into(),
            (&self.created_by).into(),
            self.created_at.into(),
            (&self.updated_by).into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        ProjectRow::from_row(row).map(Into::into)
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: Uuid,
    project_number: String,
    title: String,
    description: String,
    status: String,
    priority: String,
    start_date: DateTime<Utc>,
    expected_end_date: Option<DateTime<Utc>>,
    actual_end_date: Option<DateTime<Utc>>,
    assigned_to: Option<String>,
    notes: Option<String>,
    rfq_id: Uuid,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            project_number: row.project_number,
            title: row.title,
            description: row.description,
            status: ProjectStatus::from_str(&row.status).unwrap_or_default(),
            priority: ProjectPriority::from_str(&row.priority).unwrap_or_default(),
            start_date: row.start_date,
            expected_end_date: row.expected_end_date,
            actual_end_date: row.actual_end_date,
            assigned_to: row.assigned_to,
            notes: row.notes,
            rfq_id: row.rfq_id,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        }
    }
}
