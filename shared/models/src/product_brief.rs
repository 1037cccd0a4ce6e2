//! Product brief domain models.
//!
//! A product brief describes the product a buyer wants to source. Creating one triggers
//! the automatic RFQ and project workflow.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Lifecycle status of a product brief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BriefStatus {
    /// Captured but the workflow has not run yet
    #[default]
    Draft,
    /// RFQ and project generated
    Active,
    /// Quotes are being collected
    Sourcing,
    Completed,
    Cancelled,
}

impl BriefStatus {
    pub const ALL: [BriefStatus; 5] = [
        BriefStatus::Draft,
        BriefStatus::Active,
        BriefStatus::Sourcing,
        BriefStatus::Completed,
        BriefStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Active => "Active",
            Self::Sourcing => "Sourcing",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "sourcing" => Some(Self::Sourcing),
            "completed" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for BriefStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted product brief.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductBrief {
    pub id: Uuid,
    pub product_name: String,
    pub category: String,
    pub benchmark_brand_reference: Option<String>,
    pub benchmark_website_url: Option<String>,
    pub package_size: Option<String>,
    pub storage_requirements: Option<String>,
    pub country_of_origin: Option<String>,
    pub is_kosher_certified: bool,
    pub kosher_organization: Option<String>,
    pub kosher_symbol: Option<String>,
    pub special_attributes: Option<String>,
    pub image_url: Option<String>,
    pub additional_notes: Option<String>,
    pub status: BriefStatus,
    /// Caller-supplied key that makes creation idempotent
    pub correlation_id: Option<String>,
    pub is_workflow_completed: bool,
    pub workflow_completed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductBrief {
    pub fn new(
        input: NewProductBrief,
        created_by: impl Into<String>,
        correlation_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_name: input.product_name.trim().to_string(),
            category: input.category.trim().to_string(),
            benchmark_brand_reference: input.benchmark_brand_reference,
            benchmark_website_url: input.benchmark_website_url,
            package_size: input.package_size,
            storage_requirements: input.storage_requirements,
            country_of_origin: input.country_of_origin,
            is_kosher_certified: input.is_kosher_certified,
            kosher_organization: input.kosher_organization,
            kosher_symbol: input.kosher_symbol,
            special_attributes: input.special_attributes,
            image_url: input.image_url,
            additional_notes: input.additional_notes,
            status: BriefStatus::Draft,
            correlation_id,
            is_workflow_completed: false,
            workflow_completed_at: None,
            created_by: created_by.into(),
            created_at: now,
            updated_by: None,
            updated_at: None,
        }
    }

    /// Marks the brief as having gone through the RFQ/project workflow.
    pub fn complete_workflow(&mut self, now: DateTime<Utc>) {
        self.status = BriefStatus::Active;
        self.is_workflow_completed = true;
        self.workflow_completed_at = Some(now);
    }

    pub fn apply_update(&mut self, update: ProductBriefUpdate, updated_by: &str, now: DateTime<Utc>) {
        self.product_name = update.details.product_name.trim().to_string();
        self.category = update.details.category.trim().to_string();
        self.benchmark_brand_reference = update.details.benchmark_brand_reference;
        self.benchmark_website_url = update.details.benchmark_website_url;
        self.package_size = update.details.package_size;
        self.storage_requirements = update.details.storage_requirements;
        self.country_of_origin = update.details.country_of_origin;
        self.is_kosher_certified = update.details.is_kosher_certified;
        self.kosher_organization = update.details.kosher_organization;
        self.kosher_symbol = update.details.kosher_symbol;
        self.special_attributes = update.details.special_attributes;
        self.image_url = update.details.image_url;
        self.additional_notes = update.details.additional_notes;
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_by = Some(updated_by.to_string());
        self.updated_at = Some(now);
    }
}

/// Input for creating a product brief.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Default)]
#[validate(schema(function = "validate_kosher_organization", skip_on_field_errors = false))]
pub struct NewProductBrief {
    #[validate(length(min = 1, max = 200, message = "Product name is required and must not exceed 200 characters"))]
    pub product_name: String,
    #[validate(length(min = 1, max = 100, message = "Category is required and must not exceed 100 characters"))]
    pub category: String,
    #[validate(length(max = 200, message = "Benchmark brand reference must not exceed 200 characters"))]
    #[serde(default)]
    pub benchmark_brand_reference: Option<String>,
    #[validate(
        length(max = 500, message = "Benchmark website URL must not exceed 500 characters"),
        custom = "validate_http_url"
    )]
    #[serde(default)]
    pub benchmark_website_url: Option<String>,
    #[validate(length(max = 100, message = "Package size must not exceed 100 characters"))]
    #[serde(default)]
    pub package_size: Option<String>,
    #[validate(length(max = 200, message = "Storage requirements must not exceed 200 characters"))]
    #[serde(default)]
    pub storage_requirements: Option<String>,
    #[validate(length(max = 100, message = "Country of origin must not exceed 100 characters"))]
    #[serde(default)]
    pub country_of_origin: Option<String>,
    #[serde(default)]
    pub is_kosher_certified: bool,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub kosher_organization: Option<String>,
    #[validate(length(max = 50))]
    #[serde(default)]
    pub kosher_symbol: Option<String>,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub special_attributes: Option<String>,
    #[validate(custom = "validate_http_url")]
    #[serde(default)]
    pub image_url: Option<String>,
    #[validate(length(max = 2000, message = "Additional notes must not exceed 2000 characters"))]
    #[serde(default)]
    pub additional_notes: Option<String>,
}

impl NewProductBrief {
    /// Minimal brief with only the required fields set.
    pub fn named(product_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            category: category.into(),
            ..Default::default()
        }
    }
}

/// Full replacement of a brief's editable fields, optionally moving its status.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ProductBriefUpdate {
    #[validate]
    #[serde(flatten)]
    pub details: NewProductBrief,
    #[serde(default)]
    pub status: Option<BriefStatus>,
}

fn validate_kosher_organization(brief: &NewProductBrief) -> Result<(), ValidationError> {
    let has_organization = brief
        .kosher_organization
        .as_deref()
        .map(|org| !org.trim().is_empty())
        .unwrap_or(false);

    if brief.is_kosher_certified && !has_organization {
        let mut error = ValidationError::new("kosher_organization");
        error.message = Some("Kosher organization is required when product is kosher certified".into());
        return Err(error);
    }
    Ok(())
}

/// Accepts absolute http and https URLs only.
pub fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() || is_http_url(url) {
        Ok(())
    } else {
        let mut error = ValidationError::new("url");
        error.message = Some("Must be a valid http or https URL".into());
        Err(error)
    }
}

pub fn is_http_url(url: &str) -> bool {
    let pattern = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").ok();
    pattern.map(|re| re.is_match(url.trim())).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_url_validation() {
        assert!(is_http_url("https://www.example.com/quinoa"));
        assert!(is_http_url("http://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("not a url"));
    }

    #[test]
    fn test_name_length_limit() {
        let input = NewProductBrief::named("x".repeat(201), "Grains");
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_keeps_status_when_absent() {
        let now = Utc::now();
        let mut brief = ProductBrief::new(NewProductBrief::named("Oats", "Grains"), "u1", None, now);
        brief.complete_workflow(now);

        let update = ProductBriefUpdate {
            details: NewProductBrief::named("Rolled Oats", "Grains"),
            status: None,
        };
        brief.apply_update(update, "u2", now);

        assert_eq!(brief.product_name, "Rolled Oats");
        assert_eq!(brief.status, BriefStatus::Active);
        assert_eq!(brief.updated_by.as_deref(), Some("u2"));
    }
}
