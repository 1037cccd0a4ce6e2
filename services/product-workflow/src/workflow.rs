//! ProductBrief → RFQ → Project cascade.
//!
//! A brief and the records derived from it are written inside one unit of work; nothing is
//! visible until all three rows are in. A caller-supplied correlation id makes creation
//! idempotent: the second request with the same id gets the first request's records back.

use std::time::Instant;

use chrono::{DateTime, Datelike, Utc};
use foodx_database::{
    ProductBriefQueries, ProjectQueries, Repository, RfqQueries, UnitOfWork, UnitOfWorkFactory,
};
use foodx_models::{NewProductBrief, ProductBrief, Project, Rfq};
use foodx_utils::transaction::finish;
use foodx_utils::{validate_model, FoodxError, FoodxResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::derive::{derive_project, derive_rfq, WorkflowSettings};
use crate::metrics::{record_run, RunOutcome};
use crate::numbering::{next_number, year_prefix, PROJECT_PREFIX, RFQ_PREFIX};

/// A brief with the records the workflow generated for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowOutcome {
    pub product_brief: ProductBrief,
    pub rfq: Rfq,
    pub project: Project,
    /// Set when an earlier request with the same correlation id produced these records
    pub replayed: bool,
}

/// Current state of a brief's workflow; RFQ and project are absent until generated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowView {
    pub product_brief: ProductBrief,
    pub rfq: Option<Rfq>,
    pub project: Option<Project>,
}

pub struct AutomaticWorkflowService<F: UnitOfWorkFactory> {
    factory: F,
    settings: WorkflowSettings,
}

impl<F: UnitOfWorkFactory> AutomaticWorkflowService<F> {
    pub fn new(factory: F, settings: WorkflowSettings) -> Self {
        Self { factory, settings }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Persists a new brief together with its RFQ and project.
    pub async fn create_product_brief(
        &self,
        input: NewProductBrief,
        user: &str,
        correlation_id: Option<String>,
    ) -> FoodxResult<WorkflowOutcome> {
        validate_model(&input)?;
        let started = Instant::now();
        let correlation_id = correlation_id.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

        if let Some(key) = correlation_id.as_deref() {
            if let Some(outcome) = self.replay(key, user).await? {
                record_run(RunOutcome::Replayed, started.elapsed().as_secs_f64());
                return Ok(outcome);
            }
        }

        let now = Utc::now();
        let brief = ProductBrief::new(input, user, correlation_id, now);
        let product_name = brief.product_name.clone();

        let uow = self.factory.unit_of_work();
        uow.begin_transaction().await?;
        let result = async {
            let brief = uow.product_briefs().add(brief).await?;
            self.run_workflow(&uow, brief, user, now).await
        }
        .await;

        match finish(&uow, result).await {
            Ok((product_brief, rfq, project)) => {
                record_run(RunOutcome::Created, started.elapsed().as_secs_f64());
                info!(
                    brief_id = %product_brief.id,
                    rfq_number = %rfq.rfq_number,
                    project_number = %project.project_number,
                    "Created product brief {} with its RFQ and project",
                    product_name
                );
                Ok(WorkflowOutcome {
                    product_brief,
                    rfq,
                    project,
                    replayed: false,
                })
            }
            Err(e) => {
                record_run(RunOutcome::Failed, started.elapsed().as_secs_f64());
                error!(error = %e, product_name = %product_name, "Product brief workflow failed");
                Err(e)
            }
        }
    }

    /// Generates the missing RFQ and project for an existing brief, reusing what exists.
    pub async fn process_complete_workflow(&self, brief_id: Uuid, user: &str) -> FoodxResult<WorkflowOutcome> {
        let started = Instant::now();
        let now = Utc::now();
        let uow = self.factory.unit_of_work();
        uow.begin_transaction().await?;
        let result = async {
            let brief = load_brief(&uow, brief_id).await?;
            self.run_workflow(&uow, brief, user, now).await
        }
        .await;

        match finish(&uow, result).await {
            Ok((product_brief, rfq, project)) => {
                record_run(RunOutcome::Created, started.elapsed().as_secs_f64());
                info!(
                    brief_id = %brief_id,
                    rfq_number = %rfq.rfq_number,
                    project_number = %project.project_number,
                    "Completed workflow for product brief"
                );
                Ok(WorkflowOutcome {
                    product_brief,
                    rfq,
                    project,
                    replayed: false,
                })
            }
            Err(e) => {
                record_run(RunOutcome::Failed, started.elapsed().as_secs_f64());
                error!(error = %e, brief_id = %brief_id, "Error processing workflow for product brief");
                Err(e)
            }
        }
    }

    /// The brief's RFQ, created when it does not exist yet.
    pub async fn create_rfq_from_brief(&self, brief_id: Uuid, user: &str) -> FoodxResult<Rfq> {
        let uow = self.factory.unit_of_work();
        let brief = load_brief(&uow, brief_id).await?;
        self.ensure_rfq(&uow, &brief, user, Utc::now()).await
    }

    /// The RFQ's project, created when it does not exist yet.
    pub async fn create_project_from_rfq(&self, rfq_id: Uuid, user: &str) -> FoodxResult<Project> {
        let uow = self.factory.unit_of_work();
        let rfq = uow
            .rfqs()
            .get_by_id(rfq_id)
            .await?
            .ok_or_else(|| FoodxError::not_found(format!("RFQ {}", rfq_id)))?;
        self.ensure_project(&uow, &rfq, user, Utc::now()).await
    }

    pub async fn workflow_for_brief(&self, brief_id: Uuid) -> FoodxResult<Option<WorkflowView>> {
        let uow = self.factory.unit_of_work();
        let Some(product_brief) = uow.product_briefs().get_by_id(brief_id).await? else {
            return Ok(None);
        };
        let rfq = uow.rfqs().by_brief(brief_id).await?;
        let project = match &rfq {
            Some(rfq) => uow.projects().by_rfq(rfq.id).await?,
            None => None,
        };
        Ok(Some(WorkflowView {
            product_brief,
            rfq,
            project,
        }))
    }

    /// Records of an earlier request with the same correlation id. A brief whose workflow
    /// never finished gets it completed here.
    async fn replay(&self, correlation_id: &str, user: &str) -> FoodxResult<Option<WorkflowOutcome>> {
        let uow = self.factory.unit_of_work();
        let Some(brief) = uow.product_briefs().by_correlation_id(correlation_id).await? else {
            return Ok(None);
        };
        drop(uow);

        let view = self.workflow_for_brief(brief.id).await?;
        let outcome = match view {
            Some(WorkflowView {
                product_brief,
                rfq: Some(rfq),
                project: Some(project),
            }) => WorkflowOutcome {
                product_brief,
                rfq,
                project,
                replayed: true,
            },
            _ => {
                warn!(brief_id = %brief.id, correlation_id, "Replayed brief had an incomplete workflow");
                WorkflowOutcome {
                    replayed: true,
                    ..self.process_complete_workflow(brief.id, user).await?
                }
            }
        };
        info!(brief_id = %outcome.product_brief.id, correlation_id, "Replayed product brief creation");
        Ok(Some(outcome))
    }

    async fn run_workflow(
        &self,
        uow: &F::UnitOfWork,
        mut brief: ProductBrief,
        user: &str,
        now: DateTime<Utc>,
    ) -> FoodxResult<(ProductBrief, Rfq, Project)> {
        let rfq = self.ensure_rfq(uow, &brief, user, now).await?;
        let project = self.ensure_project(uow, &rfq, user, now).await?;

        brief.complete_workflow(now);
        let brief = uow.product_briefs().update(brief).await?;
        Ok((brief, rfq, project))
    }

    async fn ensure_rfq(
        &self,
        uow: &F::UnitOfWork,
        brief: &ProductBrief,
        user: &str,
        now: DateTime<Utc>,
    ) -> FoodxResult<Rfq> {
        let rfqs = uow.rfqs();
        if let Some(existing) = rfqs.by_brief(brief.id).await? {
            info!(brief_id = %brief.id, rfq_number = %existing.rfq_number, "RFQ already exists for product brief");
            return Ok(existing);
        }

        let last = rfqs.last_sequence(&year_prefix(RFQ_PREFIX, now.year())).await?;
        let number = next_number(RFQ_PREFIX, now.year(), last);
        let rfq = rfqs.add(derive_rfq(brief, number, user, now, &self.settings)).await?;
        info!(brief_id = %brief.id, rfq_number = %rfq.rfq_number, "Created RFQ for product brief");
        Ok(rfq)
    }

    async fn ensure_project(
        &self,
        uow: &F::UnitOfWork,
        rfq: &Rfq,
        user: &str,
        now: DateTime<Utc>,
    ) -> FoodxResult<Project> {
        let projects = uow.projects();
        if let Some(existing) = projects.by_rfq(rfq.id).await? {
            info!(rfq_id = %rfq.id, project_number = %existing.project_number, "Project already exists for RFQ");
            return Ok(existing);
        }

        let last = projects
            .last_sequence(&year_prefix(PROJECT_PREFIX, now.year()))
            .await?;
        let number = next_number(PROJECT_PREFIX, now.year(), last);
        let project = projects
            .add(derive_project(rfq, number, user, now, &self.settings))
            .await?;
        info!(rfq_id = %rfq.id, project_number = %project.project_number, "Created project for RFQ");
        Ok(project)
    }
}

async fn load_brief<U: UnitOfWork>(uow: &U, brief_id: Uuid) -> FoodxResult<ProductBrief> {
    uow.product_briefs()
        .get_by_id(brief_id)
        .await?
        .ok_or_else(|| FoodxError::not_found(format!("ProductBrief {}", brief_id)))
}
