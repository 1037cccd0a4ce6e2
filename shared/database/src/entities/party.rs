use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use foodx_models::{Buyer, Supplier};

use crate::entity::Entity;
use crate::value::Value;

impl Entity for Supplier {
    const TABLE: &'static str = "suppliers";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "company_name",
        "contact_name",
        "email",
        "phone",
        "country",
        "website",
        "description",
        "is_verified",
        "is_active",
        "created_at",
        "updated_at",
    ];
    const UNIQUE: &'static [&'static str] = &["email"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            (&self.company_name).into(),
            (&self.contact_name).into(),
            (&self.email).into(),
            (&self.phone).into(),
            (&self.country).into(),
            (&self.website).into(),
            (&self.description).into(),
            self.is_verified.into(),
            self.is_active.into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        SupplierRow::from_row(row).map(|r| Self {
            id: r.id,
            company_name: r.company_name,
            contact_name: r.contact_name,
            email: r.email,
            phone: r.phone,
            country: r.country,
            website: r.website,
            description: r.description,
            is_verified: r.is_verified,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    company_name: String,
    contact_name: Option<String>,
    email: String,
    phone: Option<String>,
    country: Option<String>,
    website: Option<String>,
    description: Option<String>,
    is_verified: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Entity for Buyer {
    const TABLE: &'static str = "buyers";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "company_name",
        "contact_name",
        "email",
        "phone",
        "country",
        "buyer_type",
        "is_active",
        "created_at",
        "updated_at",
    ];
    const UNIQUE: &'static [&'static str] = &["email"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            (&self.company_name).into(),
            (&self.contact_name).into(),
            (&self.email).into(),
            (&self.phone).into(),
            (&self.country).into(),
            (&self.buyer_type).into(),
            self.is_active.into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        BuyerRow::from_row(row).map(|r| Self {
            id: r.id,
            company_name: r.company_name,
            contact_name: r.contact_name,
            email: r.email,
            phone: r.phone,
            country: r.country,
            buyer_type: r.buyer_type,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BuyerRow {
    id: Uuid,
    company_name: String,
    contact_name: Option<String>,
    email: String,
    phone: Option<String>,
    country: Option<String>,
    buyer_type: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}
