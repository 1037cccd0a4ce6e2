//! Product brief service and its caching decorator.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use foodx_database::{get_json, set_json, CacheService, ProductBriefQueries, Repository, UnitOfWork, UnitOfWorkFactory};
use foodx_models::{
    product_categories, sourcing_countries, BriefStatus, NewProductBrief, ProductBrief, ProductBriefUpdate,
};
use foodx_utils::{validate_model, FoodxResult};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::workflow::{AutomaticWorkflowService, WorkflowOutcome};

#[async_trait]
pub trait ProductBriefService: Send + Sync {
    /// Every brief, newest first.
    async fn list(&self) -> FoodxResult<Vec<ProductBrief>>;

    async fn get(&self, id: Uuid) -> FoodxResult<Option<ProductBrief>>;

    /// Creates the brief and runs the RFQ/project workflow for it.
    async fn create(
        &self,
        input: NewProductBrief,
        user: &str,
        correlation_id: Option<String>,
    ) -> FoodxResult<WorkflowOutcome>;

    /// Re-runs the workflow for an existing brief.
    async fn process_workflow(&self, id: Uuid, user: &str) -> FoodxResult<WorkflowOutcome>;

    async fn update(&self, id: Uuid, update: ProductBriefUpdate, user: &str) -> FoodxResult<Option<ProductBrief>>;

    /// Deletes the brief together with its RFQ and projects.
    async fn delete(&self, id: Uuid) -> FoodxResult<bool>;

    async fn by_status(&self, status: BriefStatus) -> FoodxResult<Vec<ProductBrief>>;

    async fn by_user(&self, user: &str) -> FoodxResult<Vec<ProductBrief>>;

    async fn categories(&self) -> FoodxResult<Vec<String>>;

    async fn countries(&self) -> FoodxResult<Vec<String>>;
}

/// Store-backed brief service.
pub struct DefaultProductBriefService<F: UnitOfWorkFactory> {
    factory: F,
    workflow: Arc<AutomaticWorkflowService<F>>,
}

impl<F: UnitOfWorkFactory> DefaultProductBriefService<F> {
    pub fn new(factory: F, workflow: Arc<AutomaticWorkflowService<F>>) -> Self {
        Self { factory, workflow }
    }
}

#[async_trait]
impl<F: UnitOfWorkFactory> ProductBriefService for DefaultProductBriefService<F> {
    async fn list(&self) -> FoodxResult<Vec<ProductBrief>> {
        Ok(self.factory.unit_of_work().product_briefs().newest_first().await?)
    }

    async fn get(&self, id: Uuid) -> FoodxResult<Option<ProductBrief>> {
        Ok(self.factory.unit_of_work().product_briefs().get_by_id(id).await?)
    }

    async fn create(
        &self,
        input: NewProductBrief,
        user: &str,
        correlation_id: Option<String>,
    ) -> FoodxResult<WorkflowOutcome> {
        self.workflow.create_product_brief(input, user, correlation_id).await
    }

    async fn process_workflow(&self, id: Uuid, user: &str) -> FoodxResult<WorkflowOutcome> {
        self.workflow.process_complete_workflow(id, user).await
    }

    async fn update(&self, id: Uuid, update: ProductBriefUpdate, user: &str) -> FoodxResult<Option<ProductBrief>> {
        validate_model(&update)?;
        let briefs = self.factory.unit_of_work().product_briefs();
        let Some(mut brief) = briefs.get_by_id(id).await? else {
            return Ok(None);
        };

        brief.apply_update(update, user, Utc::now());
        let brief = briefs.update(brief).await?;
        info!(brief_id = %id, status = %brief.status, "Updated product brief");
        Ok(Some(brief))
    }

    async fn delete(&self, id: Uuid) -> FoodxResult<bool> {
        let deleted = self.factory.unit_of_work().product_briefs().delete(id).await?;
        if deleted {
            info!(brief_id = %id, "Deleted product brief with its RFQ and projects");
        }
        Ok(deleted)
    }

    async fn by_status(&self, status: BriefStatus) -> FoodxResult<Vec<ProductBrief>> {
        Ok(self.factory.unit_of_work().product_briefs().by_status(status).await?)
    }

    async fn by_user(&self, user: &str) -> FoodxResult<Vec<ProductBrief>> {
        Ok(self.factory.unit_of_work().product_briefs().by_user(user).await?)
    }

    async fn categories(&self) -> FoodxResult<Vec<String>> {
        Ok(product_categories())
    }

    async fn countries(&self) -> FoodxResult<Vec<String>> {
        Ok(sourcing_countries())
    }
}

const BRIEF_TTL: Duration = Duration::from_secs(5 * 60);
const ALL_BRIEFS_TTL: Duration = Duration::from_secs(60);
const FILTERED_TTL: Duration = Duration::from_secs(2 * 60);
const LOOKUP_TTL: Duration = Duration::from_secs(60 * 60);

const ALL_BRIEFS_KEY: &str = "productbriefs_all";
const CATEGORIES_KEY: &str = "productbrief_categories";
const COUNTRIES_KEY: &str = "productbrief_countries";

fn brief_key(id: Uuid) -> String {
    format!("productbrief_{}", id)
}

fn user_key(user: &str) -> String {
    format!("productbriefs_user_{}", user)
}

fn status_key(status: BriefStatus) -> String {
    format!("productbriefs_status_{}", status.as_str())
}

/// Read-through cache in front of another brief service.
///
/// Writes drop every key whose contents they may have changed. A failing cache never fails
/// the request; the inner service answers instead.
pub struct CachedProductBriefService {
    inner: Arc<dyn ProductBriefService>,
    cache: Arc<dyn CacheService>,
}

impl CachedProductBriefService {
    pub fn new(inner: Arc<dyn ProductBriefService>, cache: Arc<dyn CacheService>) -> Self {
        Self { inner, cache }
    }

    async fn cached<T, Fut>(&self, key: &str, ttl: Duration, load: impl FnOnce() -> Fut) -> FoodxResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        Fut: Future<Output = FoodxResult<T>> + Send,
    {
        match get_json::<T>(self.cache.as_ref(), key).await {
            Ok(Some(hit)) => {
                debug!(key, "Cache hit");
                return Ok(hit);
            }
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "Cache read failed"),
        }

        let value = load().await?;
        if let Err(e) = set_json(self.cache.as_ref(), key, &value, Some(ttl)).await {
            warn!(key, error = %e, "Cache write failed");
        }
        Ok(value)
    }

    async fn invalidate(&self, keys: impl IntoIterator<Item = String>) {
        for key in keys {
            if let Err(e) = self.cache.remove(&key).await {
                warn!(key = %key, error = %e, "Cache invalidation failed");
            }
        }
    }

    /// Keys touched by any change to `brief`.
    fn keys_for(brief: &ProductBrief) -> Vec<String> {
        let mut keys = vec![brief_key(brief.id), ALL_BRIEFS_KEY.to_string(), user_key(&brief.created_by)];
        keys.extend(BriefStatus::ALL.into_iter().map(status_key));
        keys
    }
}

#[async_trait]
impl ProductBriefService for CachedProductBriefService {
    async fn list(&self) -> FoodxResult<Vec<ProductBrief>> {
        self.cached(ALL_BRIEFS_KEY, ALL_BRIEFS_TTL, || self.inner.list()).await
    }

    async fn get(&self, id: Uuid) -> FoodxResult<Option<ProductBrief>> {
        let key = brief_key(id);
        match get_json::<ProductBrief>(self.cache.as_ref(), &key).await {
            Ok(Some(hit)) => return Ok(Some(hit)),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed"),
        }

        let brief = self.inner.get(id).await?;
        if let Some(brief) = &brief {
            if let Err(e) = set_json(self.cache.as_ref(), &key, brief, Some(BRIEF_TTL)).await {
                warn!(key = %key, error = %e, "Cache write failed");
            }
        }
        Ok(brief)
    }

    async fn create(
        &self,
        input: NewProductBrief,
        user: &str,
        correlation_id: Option<String>,
    ) -> FoodxResult<WorkflowOutcome> {
        let outcome = self.inner.create(input, user, correlation_id).await?;
        if !outcome.replayed {
            self.invalidate(Self::keys_for(&outcome.product_brief)).await;
        }
        Ok(outcome)
    }

    async fn process_workflow(&self, id: Uuid, user: &str) -> FoodxResult<WorkflowOutcome> {
        let outcome = self.inner.process_workflow(id, user).await?;
        self.invalidate(Self::keys_for(&outcome.product_brief)).await;
        Ok(outcome)
    }

    async fn update(&self, id: Uuid, update: ProductBriefUpdate, user: &str) -> FoodxResult<Option<ProductBrief>> {
        let updated = self.inner.update(id, update, user).await?;
        if let Some(brief) = &updated {
            self.invalidate(Self::keys_for(brief)).await;
        }
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> FoodxResult<bool> {
        let existing = self.inner.get(id).await?;
        let deleted = self.inner.delete(id).await?;
        match existing {
            Some(brief) => self.invalidate(Self::keys_for(&brief)).await,
            None => self.invalidate([brief_key(id), ALL_BRIEFS_KEY.to_string()]).await,
        }
        Ok(deleted)
    }

    async fn by_status(&self, status: BriefStatus) -> FoodxResult<Vec<ProductBrief>> {
        self.cached(&status_key(status), FILTERED_TTL, || self.inner.by_status(status))
            .await
    }

    async fn by_user(&self, user: &str) -> FoodxResult<Vec<ProductBrief>> {
        self.cached(&user_key(user), FILTERED_TTL, || self.inner.by_user(user)).await
    }

    async fn categories(&self) -> FoodxResult<Vec<String>> {
        self.cached(CATEGORIES_KEY, LOOKUP_TTL, || self.inner.categories()).await
    }

    async fn countries(&self) -> FoodxResult<Vec<String>> {
        self.cached(COUNTRIES_KEY, LOOKUP_TTL, || self.inner.countries()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodx_database::MemoryCache;

    #[test]
    fn test_cache_keys() {
        let id = Uuid::nil();
        assert_eq!(brief_key(id), format!("productbrief_{}", Uuid::nil()));
        assert_eq!(user_key("buyer-1"), "productbriefs_user_buyer-1");
        assert_eq!(status_key(BriefStatus::Active), "productbriefs_status_Active");
    }

    #[test]
    fn test_changes_invalidate_every_status_list() {
        let brief = ProductBrief::new(NewProductBrief::named("Dates", "Snacks"), "buyer-9", None, Utc::now());
        let keys = CachedProductBriefService::keys_for(&brief);
        assert!(keys.contains(&brief_key(brief.id)));
        assert!(keys.contains(&"productbriefs_user_buyer-9".to_string()));
        for status in BriefStatus::ALL {
            assert!(keys.contains(&status_key(status)));
        }
    }

    #[tokio::test]
    async fn test_lookups_are_served_from_cache() {
        struct Lookups;

        #[async_trait]
        impl ProductBriefService for Lookups {
            async fn list(&self) -> FoodxResult<Vec<ProductBrief>> {
                Ok(Vec::new())
            }
            async fn get(&self, _id: Uuid) -> FoodxResult<Option<ProductBrief>> {
                Ok(None)
            }
            async fn create(&self, _: NewProductBrief, _: &str, _: Option<String>) -> FoodxResult<WorkflowOutcome> {
                Err(foodx_utils::FoodxError::internal("not used"))
            }
            async fn process_workflow(&self, _: Uuid, _: &str) -> FoodxResult<WorkflowOutcome> {
                Err(foodx_utils::FoodxError::internal("not used"))
            }
            async fn update(&self, _: Uuid, _: ProductBriefUpdate, _: &str) -> FoodxResult<Option<ProductBrief>> {
                Ok(None)
            }
            async fn delete(&self, _: Uuid) -> FoodxResult<bool> {
                Ok(false)
            }
            async fn by_status(&self, _: BriefStatus) -> FoodxResult<Vec<ProductBrief>> {
                Ok(Vec::new())
            }
            async fn by_user(&self, _: &str) -> FoodxResult<Vec<ProductBrief>> {
                Ok(Vec::new())
            }
            async fn categories(&self) -> FoodxResult<Vec<String>> {
                Ok(vec!["Grains & Pasta".into()])
            }
            async fn countries(&self) -> FoodxResult<Vec<String>> {
                Ok(vec!["Peru".into()])
            }
        }

        let cache = Arc::new(MemoryCache::new());
        let service = CachedProductBriefService::new(Arc::new(Lookups), cache.clone());

        assert_eq!(service.categories().await.unwrap(), vec!["Grains & Pasta"]);
        let stored: Option<Vec<String>> = get_json(cache.as_ref(), CATEGORIES_KEY).await.unwrap();
        assert_eq!(stored, Some(vec!["Grains & Pasta".to_string()]));

        set_json(cache.as_ref(), COUNTRIES_KEY, &vec!["Chile"], None).await.unwrap();
        assert_eq!(service.countries().await.unwrap(), vec!["Chile"]);
    }
}
