//! Pure derivation of the records the workflow generates.

use chrono::{DateTime, Duration, Utc};
use foodx_models::{ProductBrief, Project, ProjectPriority, ProjectStatus, Rfq, RfqStatus};
use foodx_utils::WorkflowConfig;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub rfq_response_days: i64,
    pub project_buffer_days: i64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            rfq_response_days: 14,
            project_buffer_days: 30,
        }
    }
}

impl From<&WorkflowConfig> for WorkflowSettings {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            rfq_response_days: config.rfq_response_days,
            project_buffer_days: config.project_buffer_days,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn derive_rfq(
    brief: &ProductBrief,
    rfq_number: String,
    user: &str,
    now: DateTime<Utc>,
    settings: &WorkflowSettings,
) -> Rfq {
    let description = match non_blank(&brief.additional_notes) {
        Some(notes) => notes.to_string(),
        None => format!("RFQ for {}", brief.product_name),
    };

    Rfq {
        id: Uuid::new_v4(),
        rfq_number,
        title: brief.product_name.clone(),
        description,
        category: Some(brief.category.clone()),
        package_size: brief.package_size.clone(),
        country_of_origin: brief.country_of_origin.clone(),
        is_kosher_certified: brief.is_kosher_certified,
        kosher_organization: brief.kosher_organization.clone(),
        special_attributes: brief.special_attributes.clone(),
        additional_notes: brief.additional_notes.clone(),
        issue_date: now,
        response_deadline: now + Duration::days(settings.rfq_response_days),
        status: RfqStatus::Active,
        response_count: 0,
        product_brief_id: brief.id,
        created_by: user.to_string(),
        created_at: now,
        updated_by: None,
        updated_at: None,
    }
}

pub fn derive_project(
    rfq: &Rfq,
    project_number: String,
    user: &str,
    now: DateTime<Utc>,
    settings: &WorkflowSettings,
) -> Project {
    Project {
        id: Uuid::new_v4(),
        project_number,
        title: format!("Project: {}", rfq.title),
        description: format!("Procurement project for {}", rfq.title),
        status: ProjectStatus::Planning,
        priority: ProjectPriority::Medium,
        start_date: now,
        expected_end_date: Some(rfq.response_deadline + Duration::days(settings.project_buffer_days)),
        actual_end_date: None,
        assigned_to: Some(user.to_string()),
        notes: Some(format!("Auto-generated project for RFQ {}", rfq.rfq_number)),
        rfq_id: rfq.id,
        created_by: user.to_string(),
        created_at: now,
        updated_by: None,
        updated_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodx_models::NewProductBrief;

    fn quinoa(now: DateTime<Utc>) -> ProductBrief {
        let mut input = NewProductBrief::named("Organic Quinoa", "Grains");
        input.is_kosher_certified = true;
        input.kosher_organization = Some("OU".into());
        input.package_size = Some("500g".into());
        ProductBrief::new(input, "buyer-1", None, now)
    }

    #[test]
    fn test_rfq_copies_brief_fields() {
        let now = Utc::now();
        let brief = quinoa(now);
        let rfq = derive_rfq(&brief, "RFQ-2026-001".into(), "buyer-1", now, &WorkflowSettings::default());

        assert_eq!(rfq.title, "Organic Quinoa");
        assert_eq!(rfq.description, "RFQ for Organic Quinoa");
        assert_eq!(rfq.category.as_deref(), Some("Grains"));
        assert_eq!(rfq.kosher_organization.as_deref(), Some("OU"));
        assert_eq!(rfq.package_size.as_deref(), Some("500g"));
        assert_eq!(rfq.response_deadline - rfq.issue_date, Duration::days(14));
        assert_eq!(rfq.product_brief_id, brief.id);
        assert_eq!(rfq.status, RfqStatus::Active);
    }

    #[test]
    fn test_notes_become_rfq_description() {
        let now = Utc::now();
        let mut brief = quinoa(now);
        brief.additional_notes = Some("Needs non-GMO certificate".into());
        let rfq = derive_rfq(&brief, "RFQ-2026-002".into(), "u", now, &WorkflowSettings::default());
        assert_eq!(rfq.description, "Needs non-GMO certificate");

        brief.additional_notes = Some("   ".into());
        let rfq = derive_rfq(&brief, "RFQ-2026-003".into(), "u", now, &WorkflowSettings::default());
        assert_eq!(rfq.description, "RFQ for Organic Quinoa");
    }

    #[test]
    fn test_project_follows_rfq_deadline() {
        let now = Utc::now();
        let settings = WorkflowSettings {
            rfq_response_days: 10,
            project_buffer_days: 5,
        };
        let rfq = derive_rfq(&quinoa(now), "RFQ-2026-001".into(), "buyer-1", now, &settings);
        let project = derive_project(&rfq, "PRJ-2026-001".into(), "buyer-1", now, &settings);

        assert_eq!(project.title, "Project: Organic Quinoa");
        assert_eq!(project.description, "Procurement project for Organic Quinoa");
        assert_eq!(project.notes.as_deref(), Some("Auto-generated project for RFQ RFQ-2026-001"));
        assert_eq!(project.expected_end_date, Some(now + Duration::days(15)));
        assert_eq!(project.assigned_to.as_deref(), Some("buyer-1"));
        assert_eq!(project.priority, ProjectPriority::Medium);
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.rfq_id, rfq.id);
    }
}
