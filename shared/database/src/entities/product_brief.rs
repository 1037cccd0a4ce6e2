use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use foodx_models::{BriefStatus, ProductBrief};

use crate::entity::Entity;
use crate::value::Value;

impl Entity for ProductBrief {
    const TABLE: &'static str = "product_briefs";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "product_name",
        "category",
        "benchmark_brand_reference",
        "benchmark_website_url",
        "package_size",
        "storage_requirements",
        "country_of_origin",
        "is_kosher_certified",
        "kosher_organization",
        "kosher_symbol",
        "special_attributes",
        "image_url",
        "additional_notes",
        "status",
        "correlation_id",
        "is_workflow_completed",
        "workflow_completed_at",
        "created_by",
        "created_at",
        "updated_by",
        "updated_at",
    ];
    const UNIQUE: &'static [&'static str] = &["correlation_id"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            (&self.product_name).into(),
            (&self.category).into(),
            (&self.benchmark_brand_reference).into(),
            (&self.benchmark_website_url).into(),
            (&self.package_size).into(),
            (&self.storage_requirements).into(),
            (&self.country_of_origin).into(),
            self.is_kosher_certified.into(),
            (&self.kosher_organization).into(),
            (&self.kosher_symbol).into(),
            (&self.special_attributes).into(),
            (&self.image_url).into(),
            (&self.additional_notes).into(),
            self.status.as_str().into(),
            (&self.correlation_id).into(),
            self.is_workflow_completed.into(),
            self.workflow_completed_at.into(),
            (&self.created_by).into(),
            self.created_at.into(),
            (&self.updated_by).into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        ProductBriefRow::from_row(row).map(Into::into)
    }
}

#[derive(Debug, FromRow)]
struct ProductBriefRow {
    id: Uuid,
    product_name: String,
    category: String,
    benchmark_brand_reference: Option<String>,
    benchmark_website_url: Option<String>,
    package_size: Option<String>,
    storage_requirements: Option<String>,
    country_of_origin: Option<String>,
    is_kosher_certified: bool,
    kosher_organization: Option<String>,
    kosher_symbol: Option<String>,
    special_attributes: Option<String>,
    image_url: Option<String>,
    additional_notes: Option<String>,
    status: String,
    correlation_id: Option<String>,
    is_workflow_completed: bool,
    workflow_completed_at: Option<DateTime<Utc>>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProductBriefRow> for ProductBrief {
    fn from(row: ProductBriefRow) -> Self {
        Self {
            id: row.id,
            product_name: row.product_name,
            category: row.category,
            benchmark_brand_reference: row.benchmark_brand_reference,
            benchmark_website_url: row.benchmark_website_url,
            package_size: row.package_size,
            storage_requirements: row.storage_requirements,
            country_of_origin: row.country_of_origin,
            is_kosher_certified: row.is_kosher_certified,
            kosher_organization: row.kosher_organization,
            kosher_symbol: row.kosher_symbol,
            special_attributes: row.special_attributes,
            image_url: row.image_url,
            additional_notes: row.additional_notes,
            status: BriefStatus::from_str(&row.status).unwrap_or_default(),
            correlation_id: row.correlation_id,
            is_workflow_completed: row.is_workflow_completed,
            workflow_completed_at: row.workflow_completed_at,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        }
    }
}
