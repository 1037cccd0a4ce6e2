//! Catalog queries over the product repository.

use std::collections::BTreeMap;

use async_trait::async_trait;
use foodx_models::{CategoryCount, Product};
use uuid::Uuid;

use crate::error::RepositoryResult;
use crate::predicate::{field, Predicate};
use crate::query::Query;
use crate::repository::Repository;

#[async_trait]
pub trait ProductQueries: Repository<Product> {
    /// True when no other product uses `sku`. `exclude_id` skips the product being edited.
    async fn is_sku_unique(&self, sku: &str, exclude_id: Option<Uuid>) -> RepositoryResult<bool> {
        let mut predicate = field("sku").eq(sku.trim());
        if let Some(id) = exclude_id {
            predicate = predicate.and(field("id").ne(id));
        }
        Ok(!self.any(predicate).await?)
    }

    async fn by_sku(&self, sku: &str) -> RepositoryResult<Option<Product>> {
        self.first(field("sku").eq(sku.trim())).await
    }

    /// Active products of a category, by name.
    async fn by_category(&self, category: &str) -> RepositoryResult<Vec<Product>> {
        self.query(
            Query::new()
                .filter(field("category").eq(category))
                .filter(field("is_active").eq(true))
                .order_by_asc("name"),
        )
        .await
    }

    async fn by_supplier(&self, supplier_id: Uuid) -> RepositoryResult<Vec<Product>> {
        self.query(
            Query::new()
                .filter(field("supplier_id").eq(supplier_id))
                .order_by_asc("name"),
        )
        .await
    }

    async fn active(&self) -> RepositoryResult<Vec<Product>> {
        self.query(active_products()).await
    }

    /// Case-insensitive search over name, description, category and SKU.
    /// A blank term returns every active product.
    async fn search(&self, term: &str) -> RepositoryResult<Vec<Product>> {
        self.query(search_query(term)).await
    }

    async fn price_range(&self, min: f64, max: f64) -> RepositoryResult<Vec<Product>> {
        self.query(
            active_products()
                .filter(field("price").between(min, max))
                .order_by_asc("price"),
        )
        .await
    }

    async fn organic(&self) -> RepositoryResult<Vec<Product>> {
        self.query(active_products().filter(field("is_organic").eq(true)))
            .await
    }

    async fn by_origin(&self, country: &str) -> RepositoryResult<Vec<Product>> {
        self.query(active_products().filter(field("country_of_origin").eq(country)))
            .await
    }

    /// Number of active products per category, sorted by category name.
    async fn count_by_category(&self) -> RepositoryResult<Vec<CategoryCount>> {
        let products = self.find(field("is_active").eq(true)).await?;
        let counts = products.iter().fold(BTreeMap::new(), |mut acc, product| {
            let category = product
                .category
                .clone()
                .unwrap_or_else(|| "Uncategorized".to_string());
            *acc.entry(category).or_insert(0i64) += 1;
            acc
        });
        Ok(counts
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect())
    }
}

impl<R: Repository<Product> + ?Sized> ProductQueries for R {}

fn active_products() -> Query {
    Query::new()
        .filter(field("is_active").eq(true))
        .order_by_asc("name")
}

/// Query used by catalog search; paging callers add their own window.
pub fn search_query(term: &str) -> Query {
    let term = term.trim();
    if term.is_empty() {
        return active_products();
    }
    let matches_term = Predicate::Or(vec![
        field("name").contains(term),
        field("description").contains(term),
        field("category").contains(term),
        field("sku").contains(term),
    ]);
    active_products().filter(matches_term)
}
