//! Store queries: filter, ordering and window.

use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, RepositoryResult};
use crate::predicate::Predicate;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// The repository escape hatch: any filter plus ordering, limit and offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Predicate,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: Predicate::True,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition; repeated calls are combined with AND.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        let current = std::mem::replace(&mut self.filter, Predicate::True);
        self.filter = current.and(predicate);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn order_by_asc(self, field: impl Into<String>) -> Self {
        self.order_by(field, SortDirection::Asc)
    }

    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        self.order_by(field, SortDirection::Desc)
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit.max(0));
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset.max(0));
        self
    }

    pub fn validate_fields(&self, table: &str, columns: &[&str]) -> RepositoryResult<()> {
        self.filter.validate_fields(table, columns)?;
        match self.order_by.iter().find(|o| !columns.contains(&o.field.as_str())) {
            Some(unknown) => Err(RepositoryError::unknown_field(table, &unknown.field)),
            None => Ok(()),
        }
    }

    /// Builds the SELECT statement for `table`. Fields must already be validated.
    pub fn to_select_sql(&self, table: &str, columns: &[&str]) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM {} WHERE {}",
            columns.join(", "),
            table,
            self.filter.to_sql(&mut params)
        );

        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|o| match o.direction {
                    SortDirection::Asc => format!("{} ASC", o.field),
                    SortDirection::Desc => format!("{} DESC", o.field),
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        (sql, params)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

/// Normalizes 1-based paging input to `(page, page_size)`.
pub fn normalize_paging(page: i64, page_size: i64) -> (i64, i64) {
    (page.max(1), page_size.clamp(1, 500))
}

/// Rows skipped before a normalized `page`; saturates instead of overflowing.
pub fn page_offset(page: i64, page_size: i64) -> i64 {
    (page - 1).saturating_mul(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::field;

    #[test]
    fn test_page_offset_saturates() {
        assert_eq!(page_offset(1, 25), 0);
        assert_eq!(page_offset(3, 25), 50);
        let (page, size) = normalize_paging(i64::MAX, 50);
        assert_eq!(page_offset(page, size), i64::MAX);
    }

    #[test]
    fn test_select_sql() {
        let query = Query::new()
            .filter(field("is_active").eq(true))
            .filter(field("category").eq("Grains"))
            .order_by_asc("name")
            .limit(20)
            .offset(40);
        let (sql, params) = query.to_select_sql("products", &["id", "name"]);

        assert_eq!(
            sql,
            "SELECT id, name FROM products WHERE (is_active = $1 AND category = $2) ORDER BY name ASC LIMIT 20 OFFSET 40"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_unknown_order_field() {
        let query = Query::new().order_by_desc("secret");
        assert!(query.validate_fields("products", &["id", "name"]).is_err());
    }

    #[test]
    fn test_page_math() {
        let page: Page<u8> = Page::new(vec![], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        assert_eq!(normalize_paging(0, 0), (1, 1));
    }
}
