//! Request-for-quote models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RFQ lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RfqStatus {
    /// Open for supplier responses
    #[default]
    Active,
    Closed,
    Awarded,
    Cancelled,
}

impl RfqStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Closed => "Closed",
            Self::Awarded => "Awarded",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "closed" => Some(Self::Closed),
            "awarded" => Some(Self::Awarded),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for RfqStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request for quote generated from exactly one product brief.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rfq {
    pub id: Uuid,
    /// Human readable number, `RFQ-{year}-{NNN}`
    pub rfq_number: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub package_size: Option<String>,
    pub country_of_origin: Option<String>,
    pub is_kosher_certified: bool,
    pub kosher_organization: Option<String>,
    pub special_attributes: Option<String>,
    pub additional_notes: Option<String>,
    pub issue_date: DateTime<Utc>,
    pub response_deadline: DateTime<Utc>,
    pub status: RfqStatus,
    pub response_count: i64,
    pub product_brief_id: Uuid,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Rfq {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == RfqStatus::Active && now <= self.response_deadline
    }
}
