//! Trading parties: suppliers and buyers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::product_brief::validate_http_url;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Supplier {
    pub id: Uuid,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Default)]
pub struct SupplierInput {
    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    pub company_name: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub contact_name: Option<String>,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub country: Option<String>,
    #[validate(custom = "validate_http_url")]
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Supplier {
    pub fn new(input: SupplierInput, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_name: input.company_name.trim().to_string(),
            contact_name: input.contact_name,
            email: input.email.trim().to_lowercase(),
            phone: input.phone,
            country: input.country,
            website: input.website,
            description: input.description,
            is_verified: false,
            is_active: true,
            created_at: now,
            updated_at: None,
        }
    }

    /// Replaces the editable fields; verification and activity flags are kept.
    pub fn apply(&mut self, input: SupplierInput, now: DateTime<Utc>) {
        self.company_name = input.company_name.trim().to_string();
        self.contact_name = input.contact_name;
        self.email = input.email.trim().to_lowercase();
        self.phone = input.phone;
        self.country = input.country;
        self.website = input.website;
        self.description = input.description;
        self.updated_at = Some(now);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Buyer {
    pub id: Uuid,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub country: Option<String>,
    /// Retailer, distributor, food service...
    pub buyer_type: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Default)]
pub struct BuyerInput {
    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    pub company_name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub country: Option<String>,
    #[validate(length(max = 50))]
    #[serde(default)]
    pub buyer_type: Option<String>,
}

impl Buyer {
    pub fn new(input: BuyerInput, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_name: input.company_name.trim().to_string(),
            contact_name: input.contact_name,
            email: input.email.trim().to_lowercase(),
            phone: input.phone,
            country: input.country,
            buyer_type: input.buyer_type,
            is_active: true,
            created_at: now,
            updated_at: None,
        }
    }

    pub fn apply(&mut self, input: BuyerInput, now: DateTime<Utc>) {
        self.company_name = input.company_name.trim().to_string();
        self.contact_name = input.contact_name;
        self.email = input.email.trim().to_lowercase();
        self.phone = input.phone;
        self.country = input.country;
        self.buyer_type = input.buyer_type;
        self.updated_at = Some(now);
    }
}
