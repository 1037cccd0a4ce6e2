//! Transaction scope over a set of repositories.
//!
//! A unit of work hands out one repository per entity type, created on first use and cached
//! for its lifetime. All repositories of a unit of work share its transaction.
//!
//! Transaction policy:
//! - `begin_transaction` while a transaction is active fails with `TransactionAlreadyActive`
//! - `commit` and `rollback` without an active transaction fail with `NoActiveTransaction`
//! - a failed commit leaves nothing applied
//! - dropping a unit of work with an open transaction rolls it back
//! - outside a transaction every repository call commits on its own

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use foodx_models::{
    Buyer, Email, EmailAttachment, EmailThread, Order, OrderItem, Product, ProductBrief, Project,
    Rfq, Supplier,
};

use crate::entity::Entity;
use crate::error::RepositoryResult;
use crate::repository::Repository;

#[async_trait]
pub trait UnitOfWork: Send + Sync + 'static {
    type Repo<E: Entity>: Repository<E> + 'static;

    fn repository<E: Entity>(&self) -> Arc<Self::Repo<E>>;

    async fn begin_transaction(&self) -> RepositoryResult<()>;

    async fn commit(&self) -> RepositoryResult<()>;

    async fn rollback(&self) -> RepositoryResult<()>;

    /// Reports and resets the number of rows written since the previous call.
    async fn save_changes(&self) -> RepositoryResult<u64>;

    async fn in_transaction(&self) -> bool;

    fn product_briefs(&self) -> Arc<Self::Repo<ProductBrief>> {
        self.repository()
    }

    fn rfqs(&self) -> Arc<Self::Repo<Rfq>> {
        self.repository()
    }

    fn projects(&self) -> Arc<Self::Repo<Project>> {
        self.repository()
    }

    fn products(&self) -> Arc<Self::Repo<Product>> {
        self.repository()
    }

    fn suppliers(&self) -> Arc<Self::Repo<Supplier>> {
        self.repository()
    }

    fn buyers(&self) -> Arc<Self::Repo<Buyer>> {
        self.repository()
    }

    fn orders(&self) -> Arc<Self::Repo<Order>> {
        self.repository()
    }

    fn order_items(&self) -> Arc<Self::Repo<OrderItem>> {
        self.repository()
    }

    fn emails(&self) -> Arc<Self::Repo<Email>> {
        self.repository()
    }

    fn email_threads(&self) -> Arc<Self::Repo<EmailThread>> {
        self.repository()
    }

    fn email_attachments(&self) -> Arc<Self::Repo<EmailAttachment>> {
        self.repository()
    }
}

/// Creates request-scoped units of work.
pub trait UnitOfWorkFactory: Clone + Send + Sync + 'static {
    type UnitOfWork: UnitOfWork;

    fn unit_of_work(&self) -> Self::UnitOfWork;
}

/// Lazily populated map from repository type to its shared instance.
#[derive(Default)]
pub struct RepositoryCache {
    repositories: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl RepositoryCache {
    pub fn get_or_create<R: Any + Send + Sync>(&self, create: impl FnOnce() -> R) -> Arc<R> {
        let mut repositories = match self.repositories.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(existing) = repositories.get(&TypeId::of::<R>()) {
            if let Ok(repository) = existing.clone().downcast::<R>() {
                return repository;
            }
        }

        let repository = Arc::new(create());
        repositories.insert(TypeId::of::<R>(), repository.clone() as Arc<dyn Any + Send + Sync>);
        repository
    }

    pub fn len(&self) -> usize {
        match self.repositories.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
