//! Lookups used by the product brief workflow.

use async_trait::async_trait;
use foodx_models::{BriefStatus, ProductBrief, Project, Rfq};
use uuid::Uuid;

use crate::error::RepositoryResult;
use crate::predicate::field;
use crate::query::Query;
use crate::repository::Repository;

#[async_trait]
pub trait ProductBriefQueries: Repository<ProductBrief> {
    /// Every brief, newest first.
    async fn newest_first(&self) -> RepositoryResult<Vec<ProductBrief>> {
        self.query(Query::new().order_by_desc("created_at")).await
    }

    async fn by_status(&self, status: BriefStatus) -> RepositoryResult<Vec<ProductBrief>> {
        self.query(
            Query::new()
                .filter(field("status").eq(status.as_str()))
                .order_by_desc("created_at"),
        )
        .await
    }

    async fn by_user(&self, user_id: &str) -> RepositoryResult<Vec<ProductBrief>> {
        self.query(
            Query::new()
                .filter(field("created_by").eq(user_id))
                .order_by_desc("created_at"),
        )
        .await
    }

    async fn by_correlation_id(&self, correlation_id: &str) -> RepositoryResult<Option<ProductBrief>> {
        self.first(field("correlation_id").eq(correlation_id)).await
    }
}

impl<R: Repository<ProductBrief> + ?Sized> ProductBriefQueries for R {}

#[async_trait]
pub trait RfqQueries: Repository<Rfq> {
    async fn by_brief(&self, product_brief_id: Uuid) -> RepositoryResult<Option<Rfq>> {
        self.first(field("product_brief_id").eq(product_brief_id)).await
    }

    async fn by_number(&self, rfq_number: &str) -> RepositoryResult<Option<Rfq>> {
        self.first(field("rfq_number").eq(rfq_number)).await
    }

    /// Highest numeric suffix among RFQ numbers starting with `prefix`, 0 when none.
    async fn last_sequence(&self, prefix: &str) -> RepositoryResult<i64> {
        let rfqs = self.find(field("rfq_number").starts_with(prefix)).await?;
        Ok(highest_sequence(rfqs.iter().map(|r| r.rfq_number.as_str()), prefix))
    }
}

impl<R: Repository<Rfq> + ?Sized> RfqQueries for R {}

#[async_trait]
pub trait ProjectQueries: Repository<Project> {
    /// Oldest project for the RFQ, if any.
    async fn by_rfq(&self, rfq_id: Uuid) -> RepositoryResult<Option<Project>> {
        let mut projects = self
            .query(
                Query::new()
                    .filter(field("rfq_id").eq(rfq_id))
                    .order_by_asc("created_at")
                    .limit(1),
            )
            .await?;
        Ok(projects.pop())
    }

    async fn by_number(&self, project_number: &str) -> RepositoryResult<Option<Project>> {
        self.first(field("project_number").eq(project_number)).await
    }

    async fn last_sequence(&self, prefix: &str) -> RepositoryResult<i64> {
        let projects = self.find(field("project_number").starts_with(prefix)).await?;
        Ok(highest_sequence(
            projects.iter().map(|p| p.project_number.as_str()),
            prefix,
        ))
    }
}

impl<R: Repository<Project> + ?Sized> ProjectQueries for R {}

/// Numbers are compared by their parsed suffix, so `RFQ-2026-1000` follows `RFQ-2026-999`.
fn highest_sequence<'a>(numbers: impl Iterator<Item = &'a str>, prefix: &str) -> i64 {
    numbers
        .filter_map(|n| n.strip_prefix(prefix))
        .filter_map(|suffix| suffix.parse::<i64>().ok())
        .max()
        .unwrap_or(0)
}
