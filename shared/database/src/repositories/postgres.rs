//! PostgreSQL unit of work.
//!
//! Repositories of one unit of work share a session. While a transaction is open every
//! statement runs on it; otherwise statements go straight to the pool.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgQueryResult, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::{RepositoryError, RepositoryResult};
use crate::predicate::Predicate;
use crate::query::Query;
use crate::repository::Repository;
use crate::unit_of_work::{RepositoryCache, UnitOfWork, UnitOfWorkFactory};
use crate::value::Value;

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Factory for Postgres-backed units of work.
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl UnitOfWorkFactory for PgDatabase {
    type UnitOfWork = PgUnitOfWork;

    fn unit_of_work(&self) -> PgUnitOfWork {
        PgUnitOfWork::new(self.pool.clone())
    }
}

struct PgSession {
    pool: PgPool,
    transaction: Mutex<Option<Transaction<'static, Postgres>>>,
    pending_changes: AtomicU64,
}

impl PgSession {
    async fn fetch_all(&self, sql: &str, params: Vec<Value>) -> Result<Vec<PgRow>, sqlx::Error> {
        let mut transaction = self.transaction.lock().await;
        let query = bind_values(sqlx::query(sql), params);
        match transaction.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        }
    }

    async fn fetch_optional(&self, sql: &str, params: Vec<Value>) -> Result<Option<PgRow>, sqlx::Error> {
        let mut transaction = self.transaction.lock().await;
        let query = bind_values(sqlx::query(sql), params);
        match transaction.as_mut() {
            Some(tx) => query.fetch_optional(&mut **tx).await,
            None => query.fetch_optional(&self.pool).await,
        }
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<PgQueryResult, sqlx::Error> {
        let mut transaction = self.transaction.lock().await;
        let query = bind_values(sqlx::query(sql), params);
        let result = match transaction.as_mut() {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        }?;
        self.pending_changes
            .fetch_add(result.rows_affected(), Ordering::SeqCst);
        Ok(result)
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        if let Ok(transaction) = self.transaction.try_lock() {
            if transaction.is_some() {
                // sqlx rolls the transaction back when it is dropped
                tracing::warn!("Unit of work dropped with an open transaction; rolling back");
            }
        }
    }
}

fn bind_values(mut query: PgQuery<'_>, params: Vec<Value>) -> PgQuery<'_> {
    for value in params {
        query = match value {
            Value::Bool(v) => query.bind(v),
            Value::Int(v) => query.bind(v),
            Value::Float(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::Uuid(v) => query.bind(v),
            Value::Timestamp(v) => query.bind(v),
            Value::Bytes(v) => query.bind(v),
            Value::Json(v) => query.bind(v),
        };
    }
    query
}

pub struct PgUnitOfWork {
    session: Arc<PgSession>,
    repositories: RepositoryCache,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self {
            session: Arc::new(PgSession {
                pool,
                transaction: Mutex::new(None),
                pending_changes: AtomicU64::new(0),
            }),
            repositories: RepositoryCache::default(),
        }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Repo<E: Entity> = PgRepository<E>;

    fn repository<E: Entity>(&self) -> Arc<PgRepository<E>> {
        self.repositories
            .get_or_create(|| PgRepository::new(self.session.clone()))
    }

    async fn begin_transaction(&self) -> RepositoryResult<()> {
        let mut transaction = self.session.transaction.lock().await;
        if transaction.is_some() {
            tracing::warn!("Attempted to begin a transaction while one is already active");
            return Err(RepositoryError::TransactionAlreadyActive);
        }
        let tx = self.session.pool.begin().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to begin transaction");
            RepositoryError::Database(e)
        })?;
        *transaction = Some(tx);
        tracing::debug!("Transaction started");
        Ok(())
    }

    async fn commit(&self) -> RepositoryResult<()> {
        let tx = self
            .session
            .transaction
            .lock()
            .await
            .take()
            .ok_or(RepositoryError::NoActiveTransaction)?;

        tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to commit transaction");
            RepositoryError::from_sqlx("transaction", e)
        })?;
        tracing::debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> RepositoryResult<()> {
        let tx = self
            .session
            .transaction
            .lock()
            .await
            .take()
            .ok_or(RepositoryError::NoActiveTransaction)?;

        tx.rollback().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to roll back transaction");
            RepositoryError::Database(e)
        })?;
        tracing::debug!("Transaction rolled back");
        Ok(())
    }

    async fn save_changes(&self) -> RepositoryResult<u64> {
        Ok(self.session.pending_changes.swap(0, Ordering::SeqCst))
    }

    async fn in_transaction(&self) -> bool {
        self.session.transaction.lock().await.is_some()
    }
}

/// Generic Postgres repository for one entity type.
pub struct PgRepository<E: Entity> {
    session: Arc<PgSession>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> PgRepository<E> {
    fn new(session: Arc<PgSession>) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    fn decode(rows: Vec<PgRow>) -> RepositoryResult<Vec<E>> {
        rows.iter()
            .map(|row| E::from_row(row).map_err(RepositoryError::Database))
            .collect()
    }

    fn fail(&self, action: &str, error: sqlx::Error) -> RepositoryError {
        let error = RepositoryError::from_sqlx(E::TABLE, error);
        tracing::error!(table = E::TABLE, error = %error, "Failed to {}", action);
        error
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for PgRepository<E> {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<E>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            E::COLUMNS.join(", "),
            E::TABLE
        );
        let row = self
            .session
            .fetch_optional(&sql, vec![id.into()])
            .await
            .map_err(|e| self.fail("fetch by id", e))?;

        row.map(|r| E::from_row(&r).map_err(RepositoryError::Database))
            .transpose()
    }

    async fn add(&self, entity: E) -> RepositoryResult<E> {
        let placeholders: Vec<String> = (1..=E::COLUMNS.len()).map(|i| format!("${}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            E::TABLE,
            E::COLUMNS.join(", "),
            placeholders.join(", ")
        );
        self.session
            .execute(&sql, entity.values())
            .await
            .map_err(|e| self.fail("insert", e))?;
        Ok(entity)
    }

    async fn update(&self, entity: E) -> RepositoryResult<E> {
        let assignments: Vec<String> = E::COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, column)| format!("{} = ${}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = $1",
            E::TABLE,
            assignments.join(", ")
        );
        let result = self
            .session
            .execute(&sql, entity.values())
            .await
            .map_err(|e| self.fail("update", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(E::TABLE, entity.id()));
        }
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
        let result = self
            .session
            .execute(&sql, vec![id.into()])
            .await
            .map_err(|e| self.fail("delete", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, predicate: Option<Predicate>) -> RepositoryResult<i64> {
        let predicate = predicate.unwrap_or(Predicate::True);
        predicate.validate_fields(E::TABLE, E::COLUMNS)?;

        let mut params = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            E::TABLE,
            predicate.to_sql(&mut params)
        );
        let row = self
            .session
            .fetch_optional(&sql, params)
            .await
            .map_err(|e| self.fail("count", e))?;

        match row {
            Some(row) => row.try_get::<i64, _>(0).map_err(RepositoryError::Database),
            None => Ok(0),
        }
    }

    async fn any(&self, predicate: Predicate) -> RepositoryResult<bool> {
        predicate.validate_fields(E::TABLE, E::COLUMNS)?;

        let mut params = Vec::new();
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE {})",
            E::TABLE,
            predicate.to_sql(&mut params)
        );
        let row = self
            .session
            .fetch_optional(&sql, params)
            .await
            .map_err(|e| self.fail("check existence", e))?;

        match row {
            Some(row) => row.try_get::<bool, _>(0).map_err(RepositoryError::Database),
            None => Ok(false),
        }
    }

    async fn query(&self, query: Query) -> RepositoryResult<Vec<E>> {
        query.validate_fields(E::TABLE, E::COLUMNS)?;

        let (sql, params) = query.to_select_sql(E::TABLE, E::COLUMNS);
        let rows = self
            .session
            .fetch_all(&sql, params)
            .await
            .map_err(|e| self.fail("query", e))?;
        Self::decode(rows)
    }
}
