//! In-memory unit of work.
//!
//! Used by tests and local runs without Postgres. It enforces the same constraints as the
//! migrated schema: unique columns, foreign keys and their delete actions. A transaction
//! holds the store lock from begin to commit or rollback, so transactions are serialized
//! and nothing they write is visible to other units of work before commit.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::entities::SCHEMA;
use crate::entity::{Entity, OnDelete};
use crate::error::{RepositoryError, RepositoryResult};
use crate::predicate::Predicate;
use crate::query::{Query, SortDirection};
use crate::repository::Repository;
use crate::unit_of_work::{RepositoryCache, UnitOfWork, UnitOfWorkFactory};
use crate::value::Value;

type Row = serde_json::Value;

#[derive(Debug, Clone, Default)]
struct Tables {
    tables: HashMap<&'static str, BTreeMap<Uuid, Row>>,
}

impl Tables {
    fn table(&self, name: &str) -> Option<&BTreeMap<Uuid, Row>> {
        self.tables.get(name)
    }

    fn rows<E: Entity>(&self) -> RepositoryResult<Vec<E>> {
        match self.table(E::TABLE) {
            Some(rows) => rows
                .values()
                .map(|row| serde_json::from_value(row.clone()).map_err(RepositoryError::from))
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    fn get<E: Entity>(&self, id: Uuid) -> RepositoryResult<Option<E>> {
        self.table(E::TABLE)
            .and_then(|rows| rows.get(&id))
            .map(|row| serde_json::from_value(row.clone()).map_err(RepositoryError::from))
            .transpose()
    }

    fn contains(&self, table: &str, id: Uuid) -> bool {
        self.table(table).map(|rows| rows.contains_key(&id)).unwrap_or(false)
    }

    fn check_constraints<E: Entity>(&self, entity: &E) -> RepositoryResult<()> {
        for column in E::UNIQUE {
            let Some(value) = entity.field(column).filter(|v| !v.is_null()) else {
                continue;
            };
            let duplicate = self
                .rows::<E>()?
                .iter()
                .any(|other| other.id() != entity.id() && other.field(column).as_ref() == Some(&value));
            if duplicate {
                return Err(RepositoryError::UniqueViolation {
                    table: E::TABLE.to_string(),
                    constraint: format!("{}_{}_key", E::TABLE, column),
                });
            }
        }

        for fk in E::FOREIGN_KEYS {
            if let Some(Value::Uuid(Some(parent_id))) = entity.field(fk.column) {
                if !self.contains(fk.references, parent_id) {
                    return Err(RepositoryError::ForeignKeyViolation {
                        table: E::TABLE.to_string(),
                        constraint: format!("{}_{}_fkey", E::TABLE, fk.column),
                    });
                }
            }
        }
        Ok(())
    }

    fn insert<E: Entity>(&mut self, entity: &E) -> RepositoryResult<()> {
        if self.contains(E::TABLE, entity.id()) {
            return Err(RepositoryError::UniqueViolation {
                table: E::TABLE.to_string(),
                constraint: format!("{}_pkey", E::TABLE),
            });
        }
        self.check_constraints(entity)?;
        let row = serde_json::to_value(entity)?;
        self.tables.entry(E::TABLE).or_default().insert(entity.id(), row);
        Ok(())
    }

    fn update<E: Entity>(&mut self, entity: &E) -> RepositoryResult<()> {
        if !self.contains(E::TABLE, entity.id()) {
            return Err(RepositoryError::not_found(E::TABLE, entity.id()));
        }
        self.check_constraints(entity)?;
        let row = serde_json::to_value(entity)?;
        self.tables.entry(E::TABLE).or_default().insert(entity.id(), row);
        Ok(())
    }

    /// Deletes a row and applies the delete action of every referencing table.
    /// Nothing changes when a restricting reference exists.
    fn delete(&mut self, table: &'static str, id: Uuid) -> RepositoryResult<bool> {
        if !self.contains(table, id) {
            return Ok(false);
        }
        let snapshot = self.clone();
        match self.delete_cascading(table, id) {
            Ok(()) => Ok(true),
            Err(e) => {
                *self = snapshot;
                Err(e)
            }
        }
    }

    fn delete_cascading(&mut self, table: &'static str, id: Uuid) -> RepositoryResult<()> {
        let parent = id.to_string();

        for schema in SCHEMA {
            for fk in schema.foreign_keys.iter().filter(|fk| fk.references == table) {
                let children: Vec<Uuid> = self
                    .table(schema.table)
                    .map(|rows| {
                        rows.iter()
                            .filter(|(_, row)| row.get(fk.column).and_then(|v| v.as_str()) == Some(parent.as_str()))
                            .map(|(child_id, _)| *child_id)
                            .collect()
                    })
                    .unwrap_or_default();

                if children.is_empty() {
                    continue;
                }

                match fk.on_delete {
                    OnDelete::Restrict => {
                        return Err(RepositoryError::ForeignKeyViolation {
                            table: schema.table.to_string(),
                            constraint: format!("{}_{}_fkey", schema.table, fk.column),
                        });
                    }
                    OnDelete::SetNull => {
                        if let Some(rows) = self.tables.get_mut(schema.table) {
                            for child_id in &children {
                                if let Some(row) = rows.get_mut(child_id) {
                                    row[fk.column] = serde_json::Value::Null;
                                }
                            }
                        }
                    }
                    OnDelete::Cascade => {
                        for child_id in children {
                            self.delete_cascading(schema.table, child_id)?;
                        }
                    }
                }
            }
        }

        if let Some(rows) = self.tables.get_mut(table) {
            rows.remove(&id);
        }
        Ok(())
    }
}

/// Shared in-memory store; clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    store: Arc<Mutex<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnitOfWorkFactory for InMemoryDatabase {
    type UnitOfWork = InMemoryUnitOfWork;

    fn unit_of_work(&self) -> InMemoryUnitOfWork {
        InMemoryUnitOfWork {
            session: Arc::new(MemorySession {
                store: self.store.clone(),
                transaction: Mutex::new(None),
                pending_changes: AtomicU64::new(0),
            }),
            repositories: RepositoryCache::default(),
        }
    }
}

struct ActiveTransaction {
    tables: OwnedMutexGuard<Tables>,
    snapshot: Tables,
}

struct MemorySession {
    store: Arc<Mutex<Tables>>,
    transaction: Mutex<Option<ActiveTransaction>>,
    pending_changes: AtomicU64,
}

impl MemorySession {
    async fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let mut transaction = self.transaction.lock().await;
        if let Some(active) = transaction.as_mut() {
            return f(&active.tables);
        }
        drop(transaction);
        let tables = self.store.lock().await;
        f(&tables)
    }

    async fn write<R>(&self, f: impl FnOnce(&mut Tables) -> RepositoryResult<R>) -> RepositoryResult<R> {
        let mut transaction = self.transaction.lock().await;
        let result = match transaction.as_mut() {
            Some(active) => f(&mut active.tables),
            None => {
                let mut tables = self.store.lock().await;
                f(&mut tables)
            }
        };
        drop(transaction);
        if result.is_ok() {
            self.pending_changes.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Ok(mut transaction) = self.transaction.try_lock() {
            if let Some(mut active) = transaction.take() {
                tracing::warn!("Unit of work dropped with an open transaction; rolling back");
                *active.tables = std::mem::take(&mut active.snapshot);
            }
        }
    }
}

pub struct InMemoryUnitOfWork {
    session: Arc<MemorySession>,
    repositories: RepositoryCache,
}

impl InMemoryUnitOfWork {
    /// Number of repositories created so far.
    pub fn cached_repositories(&self) -> usize {
        self.repositories.len()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    type Repo<E: Entity> = InMemoryRepository<E>;

    fn repository<E: Entity>(&self) -> Arc<InMemoryRepository<E>> {
        self.repositories.get_or_create(|| InMemoryRepository {
            session: self.session.clone(),
            _entity: PhantomData,
        })
    }

    async fn begin_transaction(&self) -> RepositoryResult<()> {
        let mut transaction = self.session.transaction.lock().await;
        if transaction.is_some() {
            tracing::warn!("Attempted to begin a transaction while one is already active");
            return Err(RepositoryError::TransactionAlreadyActive);
        }
        let tables = self.session.store.clone().lock_owned().await;
        let snapshot = (*tables).clone();
        *transaction = Some(ActiveTransaction { tables, snapshot });
        Ok(())
    }

    async fn commit(&self) -> RepositoryResult<()> {
        self.session
            .transaction
            .lock()
            .await
            .take()
            .map(drop)
            .ok_or(RepositoryError::NoActiveTransaction)
    }

    async fn rollback(&self) -> RepositoryResult<()> {
        let mut active = self
            .session
            .transaction
            .lock()
            .await
            .take()
            .ok_or(RepositoryError::NoActiveTransaction)?;
        *active.tables = std::mem::take(&mut active.snapshot);
        Ok(())
    }

    async fn save_changes(&self) -> RepositoryResult<u64> {
        Ok(self.session.pending_changes.swap(0, Ordering::SeqCst))
    }

    async fn in_transaction(&self) -> bool {
        self.session.transaction.lock().await.is_some()
    }
}

pub struct InMemoryRepository<E: Entity> {
    session: Arc<MemorySession>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> InMemoryRepository<E> {
    fn log_failure(action: &str, error: &RepositoryError) {
        tracing::error!(table = E::TABLE, error = %error, "Failed to {}", action);
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<E>> {
        self.session.read(|tables| tables.get::<E>(id)).await
    }

    async fn add(&self, entity: E) -> RepositoryResult<E> {
        self.session
            .write(|tables| tables.insert(&entity))
            .await
            .inspect_err(|e| Self::log_failure("insert", e))?;
        Ok(entity)
    }

    async fn update(&self, entity: E) -> RepositoryResult<E> {
        self.session
            .write(|tables| tables.update(&entity))
            .await
            .inspect_err(|e| Self::log_failure("update", e))?;
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        self.session
            .write(|tables| tables.delete(E::TABLE, id))
            .await
            .inspect_err(|e| Self::log_failure("delete", e))
    }

    async fn count(&self, predicate: Option<Predicate>) -> RepositoryResult<i64> {
        let predicate = predicate.unwrap_or(Predicate::True);
        predicate.validate_fields(E::TABLE, E::COLUMNS)?;

        let rows = self.session.read(|tables| tables.rows::<E>()).await?;
        Ok(rows
            .iter()
            .filter(|row| predicate.matches(&|f: &str| row.field(f)))
            .count() as i64)
    }

    async fn query(&self, query: Query) -> RepositoryResult<Vec<E>> {
        query.validate_fields(E::TABLE, E::COLUMNS)?;

        let rows = self.session.read(|tables| tables.rows::<E>()).await?;
        let mut matching: Vec<E> = rows
            .into_iter()
            .filter(|row| query.filter.matches(&|f: &str| row.field(f)))
            .collect();

        if !query.order_by.is_empty() {
            matching.sort_by(|a, b| {
                for order in &query.order_by {
                    let (left, right) = (a.field(&order.field), b.field(&order.field));
                    let (Some(left), Some(right)) = (left, right) else {
                        continue;
                    };
                    let ordering = match order.direction {
                        SortDirection::Asc => left.sort_order(&right),
                        // Postgres puts nulls first for DESC
                        SortDirection::Desc => right.sort_order(&left),
                    };
                    if ordering != std::cmp::Ordering::Equal {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }
}
