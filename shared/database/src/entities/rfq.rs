use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use foodx_models::{ProductBrief, Rfq, RfqStatus};

use crate::entity::{Entity, ForeignKey, OnDelete};
use crate::value::Value;

impl Entity for Rfq {
    const TABLE: &'static str = "rfqs";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "rfq_number",
        "title",
        "description",
        "category",
        "package_size",
        "country_of_origin",
        "is_kosher_certified",
        "kosher_organization",
        "special_attributes",
        "additional_notes",
        "issue_date",
        "response_deadline",
        "status",
        "response_count",
        "product_brief_id",
        "created_by",
        "created_at",
        "updated_by",
        "updated_at",
    ];
    // One RFQ per brief.
    const UNIQUE: &'static [&'static str] = &["rfq_number", "product_brief_id"];
    const FOREIGN_KEYS: &'static [ForeignKey] = &[ForeignKey::new(
        "product_brief_id",
        ProductBrief::TABLE,
        OnDelete::Cascade,
    )];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            (&self.rfq_number).into(),
            (&self.title).into(),
            (&self.description).into(),
            (&self.category).into(),
            (&self.package_size).into(),
            (&self.country_of_origin).into(),
            self.is_kosher_certified.into(),
            (&self.kosher_organization).into(),
            (&self.special_attributes).into(),
            (&self.additional_notes).into(),
            self.issue_date.into(),
            self.response_deadline.into(),
            self.status.as_str().into(),
            self.response_count.into(),
            self.product_brief_id.into(),
            (&self.created_by).into(),
            self.created_at.into(),
            (&self.updated_by).into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        RfqRow::from_row(row).map(Into::into)
    }
}

#[derive(Debug, FromRow)]
struct RfqRow {
    id: Uuid,
    rfq_number: String,
    title: String,
    description: String,
    category: Option<String>,
    package_size: Option<String>,
    country_of_origin: Option<String>,
    is_kosher_certified: bool,
    kosher_organization: Option<String>,
    special_attributes: Option<String>,
    additional_notes: Option<String>,
    issue_date: DateTime<Utc>,
    response_deadline: DateTime<Utc>,
    status: String,
    response_count: i64,
    product_brief_id: Uuid,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<RfqRow> for Rfq {
    fn from(row: RfqRow) -> Self {
        Self {
            id: row.id,
            rfq_number: row.rfq_number,
            title: row.title,
            description: row.description,
            category: row.category,
            package_size: row.package_size,
            country_of_origin: row.country_of_origin,
            is_kosher_certified: row.is_kosher_certified,
            kosher_organization: row.kosher_organization,
            special_attributes: row.special_attributes,
            additional_notes: row.additional_notes,
            issue_date: row.issue_date,
            response_deadline: row.response_deadline,
            status: RfqStatus::from_str(&row.status).unwrap_or_default(),
            response_count: row.response_count,
            product_brief_id: row.product_brief_id,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        }
    }
}
