//! `Entity` implementations for the domain models.
//!
//! Each module maps one model to its table: column list, constraints and a private
//! `FromRow` struct used to decode Postgres rows.

mod product_brief;
mod rfq;
mod project;
mod product;
mod party;
mod order;
mod email;

use foodx_models::{
    Buyer, Email, EmailAttachment, EmailThread, Order, OrderItem, Product, ProductBrief, Project,
    Rfq, Supplier,
};

use crate::entity::TableSchema;

/// Every mapped table, parents before children.
pub const SCHEMA: &[TableSchema] = &[
    TableSchema::of::<ProductBrief>(),
    TableSchema::of::<Rfq>(),
    TableSchema::of::<Project>(),
    TableSchema::of::<Supplier>(),
    TableSchema::of::<Buyer>(),
    TableSchema::of::<Product>(),
    TableSchema::of::<Order>(),
    TableSchema::of::<OrderItem>(),
    TableSchema::of::<EmailThread>(),
    TableSchema::of::<Email>(),
    TableSchema::of::<EmailAttachment>(),
];
