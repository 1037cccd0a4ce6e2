//! Generic repository contract.

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::RepositoryResult;
use crate::predicate::Predicate;
use crate::query::{normalize_paging, page_offset, Page, Query};

/// Uniform CRUD and query access for one entity type.
///
/// Result ordering is unspecified unless the caller passes a `Query` with `order_by`.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<E>>;

    /// Inserts a new row. Fails with `UniqueViolation`/`ForeignKeyViolation` on constraint errors.
    async fn add(&self, entity: E) -> RepositoryResult<E>;

    /// Replaces every column of an existing row. Fails with `NotFound` when the id is unknown.
    async fn update(&self, entity: E) -> RepositoryResult<E>;

    /// Removes a row, applying the delete action of referencing tables.
    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: Uuid) -> RepositoryResult<bool>;

    async fn count(&self, predicate: Option<Predicate>) -> RepositoryResult<i64>;

    /// The raw escape hatch.
    async fn query(&self, query: Query) -> RepositoryResult<Vec<E>>;

    async fn get_all(&self) -> RepositoryResult<Vec<E>> {
        self.query(Query::new()).await
    }

    async fn find(&self, predicate: Predicate) -> RepositoryResult<Vec<E>> {
        self.query(Query::new().filter(predicate)).await
    }

    async fn first(&self, predicate: Predicate) -> RepositoryResult<Option<E>> {
        let mut rows = self.query(Query::new().filter(predicate).limit(1)).await?;
        Ok(rows.pop())
    }

    async fn any(&self, predicate: Predicate) -> RepositoryResult<bool> {
        Ok(self.count(Some(predicate)).await? > 0)
    }

    async fn add_range(&self, entities: Vec<E>) -> RepositoryResult<Vec<E>> {
        let mut added = Vec::with_capacity(entities.len());
        for entity in entities {
            added.push(self.add(entity).await?);
        }
        Ok(added)
    }

    /// Pages through `query` (1-based `page`); its own limit and offset are replaced.
    async fn page(&self, query: Query, page: i64, page_size: i64) -> RepositoryResult<Page<E>> {
        let (page, page_size) = normalize_paging(page, page_size);
        let total = self.count(Some(query.filter.clone())).await?;
        let items = self
            .query(query.limit(page_size).offset(page_offset(page, page_size)))
            .await?;
        Ok(Page::new(items, total, page, page_size))
    }
}
