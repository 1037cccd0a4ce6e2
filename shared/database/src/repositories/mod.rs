//! Repository backends and per-entity query extensions.
//!
//! `postgres` and `memory` implement the generic `Repository`/`UnitOfWork` contract. The
//! remaining modules add domain lookups as extension traits over any `Repository`, so they
//! work unchanged on both backends.

pub mod email;
pub mod memory;
pub mod postgres;
pub mod product;
pub mod workflow;

pub use email::{
    normalize_subject, EmailAttachmentQueries, EmailQueries, EmailThreadQueries, InboxFilter,
};
pub use memory::{InMemoryDatabase, InMemoryRepository, InMemoryUnitOfWork};
pub use postgres::{PgDatabase, PgRepository, PgUnitOfWork};
pub use product::{search_query, ProductQueries};
pub use workflow::{ProductBriefQueries, ProjectQueries, RfqQueries};
